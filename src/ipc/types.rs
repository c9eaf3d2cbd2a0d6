use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

/// One stdin line: `{id, method, params}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Daemon-wide mutable state: the selected workspace directory and the
/// database handle opened inside it.
#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}

impl AppState {
    pub fn workspace_display(&self) -> Option<String> {
        self.workspace
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
    }
}
