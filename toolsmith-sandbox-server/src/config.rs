//! Server configuration.

use std::path::PathBuf;

use crate::assets::RUNNER_FILE;

/// Directories and interpreter used by the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Workspace root and working directory for commands.
    pub workspace_dir: PathBuf,
    /// Mounted input data.
    pub mount_dir: PathBuf,
    /// Holds the runner assets; appended to `PATH` for function runs.
    pub toolmaker_dir: PathBuf,
    /// Interpreter that executes the runner.
    pub interpreter: String,
    /// Runner script passed to the interpreter.
    pub runner_path: PathBuf,
    /// Mirror command output to stdout.
    pub mirror: bool,
}

impl ServerConfig {
    /// Config with the runner installed under `toolmaker_dir`.
    pub fn new(
        workspace_dir: impl Into<PathBuf>,
        mount_dir: impl Into<PathBuf>,
        toolmaker_dir: impl Into<PathBuf>,
    ) -> Self {
        let toolmaker_dir = toolmaker_dir.into();
        Self {
            workspace_dir: workspace_dir.into(),
            mount_dir: mount_dir.into(),
            runner_path: toolmaker_dir.join(RUNNER_FILE),
            toolmaker_dir,
            interpreter: "python".into(),
            mirror: true,
        }
    }

    /// Use a different interpreter.
    pub fn interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Use a different runner script.
    pub fn runner_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.runner_path = path.into();
        self
    }

    /// Enable or disable output mirroring.
    pub fn mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Directory holding `function.py`, `info.json` and `output.json`.
    pub fn function_dir(&self) -> PathBuf {
        self.toolmaker_dir.join("toolmaker_function")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("/workspace", "/mount", "/toolmaker")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_container_layout() {
        let config = ServerConfig::default();
        assert_eq!(config.runner_path, PathBuf::from("/toolmaker/toolmaker_function_runner.py"));
        assert_eq!(config.function_dir(), PathBuf::from("/toolmaker/toolmaker_function"));
        assert_eq!(config.interpreter, "python");
        assert!(config.mirror);
    }
}
