//! `${env:NAME}` placeholder substitution.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Variables substituted when no allow-list is given.
pub const DEFAULT_ALLOWED_ENV_VARS: &[&str] = &["HF_TOKEN"];

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{env:([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex")
});

/// The default allow-list as a set.
pub fn default_allowed() -> HashSet<String> {
    DEFAULT_ALLOWED_ENV_VARS.iter().map(|s| s.to_string()).collect()
}

/// Replace each `${env:NAME}` in `s` with `env[NAME]`.
///
/// A placeholder is replaced only when `NAME` is both present in `env` and on
/// the `allowed` list; otherwise it is left verbatim and a warning is logged.
pub fn substitute_env_vars(
    s: &str,
    env: &HashMap<String, String>,
    allowed: &HashSet<String>,
) -> String {
    PLACEHOLDER
        .replace_all(s, |caps: &Captures<'_>| {
            let var = &caps[1];
            let Some(value) = env.get(var) else {
                tracing::warn!(var, "unable to substitute environment variable: not found in environment");
                return caps[0].to_string();
            };
            if !allowed.contains(var) {
                tracing::warn!(
                    var,
                    allowed = ?allowed,
                    "unable to substitute environment variable: not in allow-list"
                );
                return caps[0].to_string();
            }
            value.clone()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn allow(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn present_and_allowed_is_replaced() {
        let env = env(&[("HOME", "/home/u")]);
        assert_eq!(
            substitute_env_vars("${env:HOME}/docs", &env, &allow(&["HOME"])),
            "/home/u/docs"
        );
    }

    #[test]
    fn several_placeholders() {
        let env = env(&[("USER", "me"), ("HOME", "/h"), ("FOO", "a"), ("BAR", "b")]);
        let all = allow(&["USER", "HOME", "FOO", "BAR"]);
        assert_eq!(substitute_env_vars("${env:USER}:${env:HOME}", &env, &all), "me:/h");
        assert_eq!(substitute_env_vars("${env:FOO}${env:BAR}", &env, &all), "ab");
    }

    #[test]
    fn absent_is_left_verbatim() {
        assert_eq!(
            substitute_env_vars("${env:NONEXISTENT}", &HashMap::new(), &allow(&["NONEXISTENT"])),
            "${env:NONEXISTENT}"
        );
    }

    #[test]
    fn disallowed_is_left_verbatim() {
        let env = env(&[("SECRET", "s3cr3t")]);
        assert_eq!(
            substitute_env_vars("key=${env:SECRET}", &env, &default_allowed()),
            "key=${env:SECRET}"
        );
    }

    #[test]
    fn empty_value_is_substituted() {
        let env = env(&[("EMPTY", "")]);
        assert_eq!(
            substitute_env_vars("prefix${env:EMPTY}suffix", &env, &allow(&["EMPTY"])),
            "prefixsuffix"
        );
    }

    #[test]
    fn malformed_placeholders_are_ignored() {
        let env = env(&[("HF_TOKEN", "t")]);
        let allowed = default_allowed();
        assert_eq!(substitute_env_vars("${HF_TOKEN}", &env, &allowed), "${HF_TOKEN}");
        assert_eq!(substitute_env_vars("${env:1BAD}", &env, &allowed), "${env:1BAD}");
    }
}
