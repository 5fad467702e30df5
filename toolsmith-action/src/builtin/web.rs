use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::quote;
use crate::action::{Action, ActionContext};
use crate::error::ActionError;

static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static SCRIPTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("valid regex")
});
static ANCHORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>(.*?)</a\s*>"#)
        .expect("valid regex")
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static ENTITIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("valid regex")
});
static DRIVE_IVD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"window\['_DRIVE_ivd'\]\s*=\s*'((?:[^'\\]|\\.)*)'"#).expect("valid regex")
});
static DOWNLOAD_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<form[^>]*\bid="download-form"[^>]*\baction="([^"]+)"[^>]*>(.*?)</form>"#)
        .expect("valid regex")
});
static HIDDEN_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<input[^>]*\btype="hidden"[^>]*\bname="([^"]+)"[^>]*\bvalue="([^"]*)""#)
        .expect("valid regex")
});
static CONFIRM_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="(/uc\?export=download[^"]+)""#).expect("valid regex")
});

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Fetch a URL and return the content.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Browse {
    /// Why this action is taken.
    #[serde(default)]
    pub reasoning: String,
    /// The URL to open.
    pub url: String,
}

/// A fetched page rendered as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BrowseObservation {
    /// HTTP status of the response.
    pub status_code: u16,
    /// Page text, with links rendered as `[text](href)`.
    pub content: String,
}

impl Action for Browse {
    const KIND: &'static str = "browse";
    const SIDE_EFFECT: bool = false;
    type Observation = BrowseObservation;

    fn reasoning(&self) -> &str {
        &self.reasoning
    }

    fn bash(&self) -> String {
        format!("wget {}", quote(&self.url))
    }

    async fn execute(&self, _ctx: &ActionContext) -> Result<BrowseObservation, ActionError> {
        tracing::info!(url = %self.url, "browsing");
        let response = reqwest::get(&self.url)
            .await
            .map_err(|e| ActionError::failed(e.to_string()))?;
        let status_code = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ActionError::failed(e.to_string()))?;
        Ok(BrowseObservation {
            status_code,
            content: html_to_text(&body),
        })
    }
}

/// Flatten HTML into whitespace-joined text.
///
/// Comments, scripts and styles are dropped; anchors with an `href` become
/// markdown links. Every remaining text run is trimmed and the non-empty
/// runs are joined by a single space.
pub fn html_to_text(html: &str) -> String {
    let html = COMMENTS.replace_all(html, "");
    let html = SCRIPTS.replace_all(&html, "");
    let html = ANCHORS.replace_all(&html, |caps: &Captures<'_>| {
        let href = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        let text = TAGS.replace_all(&caps[3], " ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        format!("\n[{text}]({href})\n")
    });
    let text = TAGS.replace_all(&html, "\n");
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(decode_entities)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode named and numeric character references. Unknown references are
/// kept as written.
fn decode_entities(s: &str) -> String {
    ENTITIES
        .replace_all(s, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "nbsp" => Some(' '),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse))
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// A file in a Google Drive folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GoogleDriveFile {
    /// Path of the file relative to the listed folder.
    pub name: String,
    /// Download URL of the file.
    pub url: String,
}

/// List the files in a Google Drive folder.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GoogleDriveListFolder {
    /// Why this action is taken.
    #[serde(default)]
    pub reasoning: String,
    /// The URL of the Google Drive folder.
    pub url: String,
}

/// Every file below a Google Drive folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ListGoogleDriveFolderObservation {
    /// Files in depth-first order; subfolder files are prefixed with
    /// `<folder>/`.
    pub content: Vec<GoogleDriveFile>,
}

impl Action for GoogleDriveListFolder {
    const KIND: &'static str = "google_drive_list_folder";
    const SIDE_EFFECT: bool = false;
    type Observation = ListGoogleDriveFolderObservation;

    fn reasoning(&self) -> &str {
        &self.reasoning
    }

    fn bash(&self) -> String {
        format!("uvx gdown --folder --skip-download {}", quote(&self.url))
    }

    async fn execute(
        &self,
        _ctx: &ActionContext,
    ) -> Result<ListGoogleDriveFolderObservation, ActionError> {
        tracing::info!(url = %self.url, "listing google drive folder");
        let url = parse_url(&self.url)?;
        let origin = url.origin().ascii_serialization();
        let root = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ActionError::failed(format!("Not a Google Drive folder URL: {}", self.url)))?;

        let client = reqwest::Client::new();
        let mut visited = HashSet::from([root.to_string()]);
        let mut pending = folder_entries(&client, &origin, root, "").await?;
        pending.reverse();
        let mut files = Vec::new();
        while let Some(entry) = pending.pop() {
            if entry.mime_type != FOLDER_MIME_TYPE {
                files.push(GoogleDriveFile {
                    url: format!("{origin}/uc?id={}", entry.id),
                    name: entry.name,
                });
            } else if visited.insert(entry.id.clone()) {
                let prefix = format!("{}/", entry.name);
                let mut children = folder_entries(&client, &origin, &entry.id, &prefix).await?;
                children.reverse();
                pending.extend(children);
            }
        }
        Ok(ListGoogleDriveFolderObservation { content: files })
    }
}

/// Path a file was saved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileDownloadObservation {
    /// Always empty.
    pub content: Option<String>,
    /// Absolute path of the downloaded file.
    pub path: String,
}

/// Download a file from Google Drive. Note that this action does not work with folders.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GoogleDriveDownloadFile {
    /// Why this action is taken.
    #[serde(default)]
    pub reasoning: String,
    /// The URL of the Google Drive file to download.
    pub url: String,
    /// The path to save the downloaded file.
    pub output_path: String,
}

impl Action for GoogleDriveDownloadFile {
    const KIND: &'static str = "google_drive_download_file";
    const SIDE_EFFECT: bool = true;
    type Observation = FileDownloadObservation;

    fn reasoning(&self) -> &str {
        &self.reasoning
    }

    fn bash(&self) -> String {
        format!(
            "uvx gdown --fuzzy {} -O {}",
            quote(&self.url),
            quote(&self.output_path)
        )
    }

    async fn execute(&self, _ctx: &ActionContext) -> Result<FileDownloadObservation, ActionError> {
        tracing::info!(url = %self.url, path = %self.output_path, "downloading google drive file");
        let url = parse_url(&self.url)?;
        let origin = url.origin().ascii_serialization();
        let id = file_id(&url).ok_or_else(|| self.retrieval_error("no file id in URL"))?;

        let client = reqwest::Client::new();
        let mut response = client
            .get(format!("{origin}/uc"))
            .query(&[("id", id.as_str()), ("export", "download")])
            .send()
            .await
            .map_err(|e| self.retrieval_error(&e.to_string()))?;

        if is_html(&response) {
            let page = response
                .text()
                .await
                .map_err(|e| self.retrieval_error(&e.to_string()))?;
            let confirmed = confirmation_url(&page, &origin)
                .ok_or_else(|| self.retrieval_error("Cannot retrieve the public link of the file."))?;
            tracing::debug!(url = %confirmed, "following download confirmation");
            response = client
                .get(confirmed)
                .send()
                .await
                .map_err(|e| self.retrieval_error(&e.to_string()))?;
            if is_html(&response) {
                return Err(self.retrieval_error("Cannot retrieve the public link of the file."));
            }
        }
        let response = response
            .error_for_status()
            .map_err(|e| self.retrieval_error(&e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.retrieval_error(&e.to_string()))?;

        let output = Path::new(&self.output_path);
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, &bytes).await?;
        let path = tokio::fs::canonicalize(output).await?;
        Ok(FileDownloadObservation {
            content: None,
            path: path.to_string_lossy().into_owned(),
        })
    }
}

impl GoogleDriveDownloadFile {
    fn retrieval_error(&self, detail: &str) -> ActionError {
        ActionError::failed(format!(
            "Failed to retrieve file URL: {}. NOTE: It may be the case that you are trying to download a folder instead of a file. \
             Perhaps you should use the `google_drive_list_folder` action to list the files in the folder \
             (which will help you identify if this is the case) and then use the `google_drive_download_file` action \
             to download the files individually. Full error message: {detail}",
            self.url
        ))
    }
}

struct DriveEntry {
    id: String,
    name: String,
    mime_type: String,
}

fn parse_url(url: &str) -> Result<Url, ActionError> {
    Url::parse(url).map_err(|e| ActionError::failed(format!("Invalid URL {url}: {e}")))
}

/// Children of folder `id`, read from the listing embedded in the folder page.
async fn folder_entries(
    client: &reqwest::Client,
    origin: &str,
    id: &str,
    prefix: &str,
) -> Result<Vec<DriveEntry>, ActionError> {
    let failed = || ActionError::failed("Failed to retrieve folder contents");
    let response = client
        .get(format!("{origin}/drive/folders/{id}"))
        .query(&[("hl", "en")])
        .send()
        .await
        .map_err(|e| ActionError::failed(format!("Failed to retrieve folder contents: {e}")))?;
    if !response.status().is_success() {
        tracing::debug!(id, status = %response.status(), "folder page not available");
        return Err(failed());
    }
    let page = response
        .text()
        .await
        .map_err(|e| ActionError::failed(format!("Failed to retrieve folder contents: {e}")))?;

    let encoded = DRIVE_IVD
        .captures(&page)
        .and_then(|caps| caps.get(1))
        .ok_or_else(failed)?;
    let decoded = unescape_js(encoded.as_str()).ok_or_else(failed)?;
    let listing: serde_json::Value = serde_json::from_str(&decoded).map_err(|_| failed())?;

    let Some(children) = listing.get(0).and_then(serde_json::Value::as_array) else {
        return Ok(Vec::new());
    };
    children
        .iter()
        .map(|child| {
            let field = |i: usize| child.get(i).and_then(serde_json::Value::as_str);
            match (field(0), field(2), field(3)) {
                (Some(id), Some(name), Some(mime_type)) => Ok(DriveEntry {
                    id: id.to_string(),
                    name: format!("{prefix}{name}"),
                    mime_type: mime_type.to_string(),
                }),
                _ => Err(failed()),
            }
        })
        .collect()
}

/// File id from `/file/d/<id>/...` or an `id=` query parameter.
fn file_id(url: &Url) -> Option<String> {
    if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "id") {
        return Some(id.into_owned());
    }
    let segments: Vec<&str> = url.path_segments()?.collect();
    segments
        .windows(2)
        .find(|pair| pair[0] == "d")
        .map(|pair| pair[1].to_string())
        .filter(|id| !id.is_empty())
}

fn is_html(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"))
}

/// Download URL behind Drive's "can't scan this file for viruses" page.
fn confirmation_url(page: &str, origin: &str) -> Option<String> {
    if let Some(form) = DOWNLOAD_FORM.captures(page) {
        let mut url = Url::parse(&decode_entities(&form[1])).ok()?;
        {
            let mut query = url.query_pairs_mut();
            for input in HIDDEN_INPUT.captures_iter(&form[2]) {
                query.append_pair(&input[1], &decode_entities(&input[2]));
            }
        }
        return Some(url.into());
    }
    CONFIRM_HREF
        .captures(page)
        .map(|caps| format!("{origin}{}", decode_entities(&caps[1])))
}

/// Undo JavaScript string-literal escaping.
fn unescape_js(s: &str) -> Option<String> {
    fn hex(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<u32> {
        let text: String = chars.by_ref().take(digits).collect();
        if text.len() != digits {
            return None;
        }
        u32::from_str_radix(&text, 16).ok()
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let decoded = match chars.next()? {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' => '\0',
            'x' => char::from_u32(hex(&mut chars, 2)?)?,
            'u' => {
                let unit = hex(&mut chars, 4)?;
                if (0xD800..0xDC00).contains(&unit) {
                    if chars.next()? != '\\' || chars.next()? != 'u' {
                        return None;
                    }
                    let low = hex(&mut chars, 4)?;
                    char::from_u32(0x10000 + ((unit - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF))?
                } else {
                    char::from_u32(unit)?
                }
            }
            other => other,
        };
        out.push(decoded);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_become_markdown() {
        let html = r#"<p>See <a href="https://example.com/docs"> the <b>docs</b> </a> now.</p>"#;
        assert_eq!(
            html_to_text(html),
            "See [the docs](https://example.com/docs) now."
        );
    }

    #[test]
    fn scripts_styles_and_comments_are_dropped() {
        let html = "<html><head><style>body { color: red }</style>\
                    <script>alert('x')</script></head>\
                    <body><!-- hidden --><h1>Title</h1><div>Body &amp; soul</div></body></html>";
        assert_eq!(html_to_text(html), "Title Body & soul");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(html_to_text("  just text \n\n more  "), "just text more");
    }

    #[test]
    fn numeric_references_are_decoded() {
        assert_eq!(
            html_to_text("<p>It&#x27;s &#8217;quoted&#8217; &amp;lt; &bogus;</p>"),
            "It's \u{2019}quoted\u{2019} &lt; &bogus;"
        );
    }

    #[test]
    fn js_escapes_are_undone() {
        assert_eq!(
            unescape_js(r"\x5b\x22a\/b\x22,\u00e9\ud83d\ude00\]").as_deref(),
            Some("[\"a/b\",\u{e9}\u{1F600}]")
        );
        assert_eq!(unescape_js(r"\x5"), None);
    }

    #[test]
    fn file_id_from_share_and_query_links() {
        let share = Url::parse("https://drive.google.com/file/d/1NEV/view?usp=share_link").unwrap();
        assert_eq!(file_id(&share).as_deref(), Some("1NEV"));
        let query = Url::parse("https://drive.google.com/open?id=abc").unwrap();
        assert_eq!(file_id(&query).as_deref(), Some("abc"));
        let folder = Url::parse("https://drive.google.com/drive/folders/xyz").unwrap();
        assert_eq!(file_id(&folder), None);
    }

    #[test]
    fn confirmation_form_carries_hidden_fields() {
        let page = r#"<form id="download-form" action="https://drive.usercontent.google.com/download" method="get">
            <input type="hidden" name="id" value="abc"><input type="hidden" name="confirm" value="t"></form>"#;
        assert_eq!(
            confirmation_url(page, "https://drive.google.com").as_deref(),
            Some("https://drive.usercontent.google.com/download?id=abc&confirm=t")
        );
        let legacy = r#"<a href="/uc?export=download&amp;confirm=xyz&amp;id=abc">Download</a>"#;
        assert_eq!(
            confirmation_url(legacy, "https://drive.google.com").as_deref(),
            Some("https://drive.google.com/uc?export=download&confirm=xyz&id=abc")
        );
    }

    #[test]
    fn bash_uses_wget() {
        let action = Browse {
            reasoning: String::new(),
            url: "https://example.com/a b".into(),
        };
        let bash = Action::bash(&action);
        assert!(bash.starts_with("wget "));
        assert_ne!(bash, "wget https://example.com/a b");
    }
}
