//! Python helpers shipped inside the binary.

use std::path::Path;

/// File name of the function runner.
pub const RUNNER_FILE: &str = "toolmaker_function_runner.py";

/// File name of the subprocess helper module.
pub const SUBPROCESS_UTILS_FILE: &str = "subprocess_utils.py";

/// Runner invoked as `<python> toolmaker_function_runner.py <info.json>`.
pub const RUNNER_SCRIPT: &str = include_str!("../assets/toolmaker_function_runner.py");

/// `run_and_stream_command`, importable by generated functions.
pub const SUBPROCESS_UTILS: &str = include_str!("../assets/subprocess_utils.py");

/// Write both assets into `dir`, creating it if needed.
pub async fn install_assets(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    for (name, contents) in [(RUNNER_FILE, RUNNER_SCRIPT), (SUBPROCESS_UTILS_FILE, SUBPROCESS_UTILS)] {
        let path = dir.join(name);
        tokio::fs::write(&path, contents).await?;
        tracing::debug!(path = %path.display(), "installed asset");
    }
    Ok(())
}
