use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::quote;
use crate::action::{Action, ActionContext};
use crate::error::ActionError;

/// Directory names never descended into by a recursive listing.
pub const IGNORED_DIRECTORIES: &[&str] = &[
    ".git",
    ".ipynb_checkpoints",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".vscode",
    ".idea",
    ".venv",
    "venv",
    "node_modules",
    "site-packages",
];

/// Write content to a file given a path.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WriteFile {
    /// Why this action is taken.
    #[serde(default)]
    pub reasoning: String,
    /// The path of the file to write to. Use absolute paths. If the file does not exist, it will be created (including parent directories if necessary).
    pub path: String,
    /// The content to write to the file.
    pub content: String,
    /// A one-sentence description of the content written to the file.
    #[serde(default)]
    pub description: String,
}

/// Observation for writing content to a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileWriteObservation {
    /// Always empty.
    pub content: Option<String>,
    /// The path of the file written to.
    pub filename: String,
}

impl Action for WriteFile {
    const KIND: &'static str = "write_file";
    const SIDE_EFFECT: bool = true;
    type Observation = FileWriteObservation;

    fn reasoning(&self) -> &str {
        &self.reasoning
    }

    fn bash(&self) -> String {
        format!("echo {} > {}", quote(&self.content), quote(&self.path))
    }

    async fn execute(&self, _ctx: &ActionContext) -> Result<FileWriteObservation, ActionError> {
        let path = Path::new(&self.path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.content).await?;
        tracing::debug!(path = %self.path, bytes = self.content.len(), "wrote file");
        Ok(FileWriteObservation {
            content: None,
            filename: self.path.clone(),
        })
    }
}

/// Read content from a file given a path.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ReadFile {
    /// Why this action is taken.
    #[serde(default)]
    pub reasoning: String,
    /// The path of the file to read from.
    pub path: String,
}

/// Observation for reading content from a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileReadObservation {
    /// The content of the file.
    pub content: String,
}

impl Action for ReadFile {
    const KIND: &'static str = "read_file";
    const SIDE_EFFECT: bool = false;
    type Observation = FileReadObservation;

    fn reasoning(&self) -> &str {
        &self.reasoning
    }

    fn bash(&self) -> String {
        format!("cat {}", quote(&self.path))
    }

    fn may_truncate(&self) -> bool {
        !matches!(extension(&self.path), Some("md" | "py" | "ipynb"))
    }

    async fn execute(&self, _ctx: &ActionContext) -> Result<FileReadObservation, ActionError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ActionError::failed(format!(
                    "File not found: {}. Perhaps I should list the contents of the parent directory using the '{}' action.",
                    self.path,
                    ListDirectory::KIND
                )));
            }
            Err(e) if e.kind() == ErrorKind::IsADirectory => {
                return Err(ActionError::failed(format!(
                    "File is a directory: {}. Perhaps I should list the contents of the directory instead using the '{}' action.",
                    self.path,
                    ListDirectory::KIND
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let not_text = || {
            ActionError::failed(format!(
                "File is not a text file and thus cannot be read: {}.",
                self.path
            ))
        };
        let text = String::from_utf8(bytes).map_err(|_| not_text())?;
        let content = if extension(&self.path) == Some("ipynb") {
            strip_notebook(&text).map_err(|_| not_text())?
        } else {
            text
        };
        Ok(FileReadObservation { content })
    }
}

fn extension(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(|e| e.to_str())
}

/// Clear outputs, execution counts and metadata from a notebook.
fn strip_notebook(source: &str) -> Result<String, serde_json::Error> {
    let mut notebook: Value = serde_json::from_str(source)?;
    if let Some(cells) = notebook.get_mut("cells").and_then(Value::as_array_mut) {
        for cell in cells {
            let Some(cell) = cell.as_object_mut() else {
                continue;
            };
            cell.insert("metadata".into(), Value::Object(Default::default()));
            if cell.get("cell_type").and_then(Value::as_str) == Some("code") {
                cell.insert("outputs".into(), Value::Array(Vec::new()));
                cell.insert("execution_count".into(), Value::Null);
            }
        }
    }
    if let Some(nb) = notebook.as_object_mut() {
        nb.insert("metadata".into(), Value::Object(Default::default()));
    }
    serde_json::to_string_pretty(&notebook)
}

/// Get the contents of the directory at the given path.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListDirectory {
    /// Why this action is taken.
    #[serde(default)]
    pub reasoning: String,
    /// The path of the directory to list.
    pub path: String,
    /// Whether to list the contents recursively. Only recurse if absolutely necessary to avoid listing too many files.
    #[serde(default)]
    pub recursive: bool,
}

/// Observation for listing the contents of a directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ListDirectoryObservation {
    /// The contents of the directory.
    pub content: Vec<String>,
}

impl Action for ListDirectory {
    const KIND: &'static str = "list_directory";
    const SIDE_EFFECT: bool = false;
    type Observation = ListDirectoryObservation;

    fn reasoning(&self) -> &str {
        &self.reasoning
    }

    fn bash(&self) -> String {
        if self.recursive {
            format!("ls -R {}", quote(&self.path))
        } else {
            format!("ls {}", quote(&self.path))
        }
    }

    async fn execute(&self, ctx: &ActionContext) -> Result<ListDirectoryObservation, ActionError> {
        let path = PathBuf::from(&self.path);
        let display = self.path.clone();
        let recursive = self.recursive;
        let allowed = [ctx.workspace_dir.clone(), ctx.mount_dir.clone()];
        let listing = tokio::task::spawn_blocking(move || list(&path, &display, recursive, &allowed))
            .await
            .map_err(|e| ActionError::failed(format!("Listing task failed: {e}")))??;
        Ok(ListDirectoryObservation { content: listing })
    }
}

fn list(
    path: &Path,
    display: &str,
    recursive: bool,
    allowed: &[PathBuf],
) -> Result<Vec<String>, ActionError> {
    if recursive {
        let absolute = std::path::absolute(path)?;
        let resolved = std::fs::canonicalize(&absolute).unwrap_or(absolute);
        let permitted = allowed.iter().any(|dir| {
            let dir = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.clone());
            resolved.starts_with(dir)
        });
        if !permitted {
            let dirs: Vec<String> = allowed.iter().map(|d| d.display().to_string()).collect();
            return Err(ActionError::failed(format!(
                "Recursive listing of directories is only allowed in certain directories: {}.",
                dirs.join(", ")
            )));
        }
    }
    let root = std::fs::canonicalize(path).map_err(|e| listing_error(e, display))?;
    let mut out = Vec::new();
    walk(&root, display, recursive, &mut out)?;
    Ok(out)
}

fn walk(dir: &Path, display: &str, recursive: bool, out: &mut Vec<String>) -> Result<(), ActionError> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| listing_error(e, display))? {
        let entry = entry.map_err(|e| listing_error(e, display))?;
        let path = entry.path();
        if path.is_dir() {
            let symlink = entry.file_type().map(|t| t.is_symlink()).unwrap_or(false);
            dirs.push((path, symlink));
        } else {
            files.push(path);
        }
    }
    files.sort();
    dirs.sort();

    out.extend(files.iter().map(|f| f.display().to_string()));
    out.extend(dirs.iter().map(|(d, _)| format!("{}/", d.display())));
    if recursive {
        for (d, symlink) in &dirs {
            let ignored = d
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| IGNORED_DIRECTORIES.contains(&n));
            if !ignored && !symlink {
                walk(d, display, true, out)?;
            }
        }
    }
    Ok(())
}

fn listing_error(e: std::io::Error, display: &str) -> ActionError {
    match e.kind() {
        ErrorKind::NotFound => ActionError::failed(format!("Directory not found: {display}")),
        ErrorKind::NotADirectory => ActionError::failed(format!(
            "Not a directory: {display}. Perhaps I should read the file instead using the '{}' action.",
            ReadFile::KIND
        )),
        ErrorKind::PermissionDenied => ActionError::failed(format!("Permission denied: {e}.")),
        _ => ActionError::Io(e),
    }
}
