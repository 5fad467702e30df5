//! Actions available in every sandbox.

mod bash;
mod io;
mod web;

pub use bash::{BashCommandOutput, EnvironmentVariable, RunBashCommand};
pub use io::{
    FileReadObservation, FileWriteObservation, IGNORED_DIRECTORIES, ListDirectory,
    ListDirectoryObservation, ReadFile, WriteFile,
};
pub use web::{
    Browse, BrowseObservation, FileDownloadObservation, GoogleDriveDownloadFile, GoogleDriveFile,
    GoogleDriveListFolder, ListGoogleDriveFolderObservation, html_to_text,
};

use crate::registry::ActionRegistry;

/// Register every built-in action.
pub fn register_all(registry: &mut ActionRegistry) {
    registry
        .register::<RunBashCommand>()
        .register::<WriteFile>()
        .register::<ReadFile>()
        .register::<ListDirectory>()
        .register::<Browse>()
        .register::<GoogleDriveListFolder>()
        .register::<GoogleDriveDownloadFile>();
}

/// Shell-quote `s`, falling back to the raw text for strings `sh` cannot
/// represent (embedded NUL).
pub(crate) fn quote(s: &str) -> String {
    match shlex::try_quote(s) {
        Ok(quoted) => quoted.into_owned(),
        Err(_) => s.to_string(),
    }
}
