// Session state (in-memory)
//
// NOTE: This is NOT persisted; it holds runtime-only context for one wizard instance. The
// password is never retained here, only the non-secret parts of the last successful connect.

use serde::Serialize;

/// Non-secret connection parameters remembered after a successful connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionDetails {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub schema: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionState {
    is_connected: bool,
    selected_collection: Option<String>,
    connection_details: Option<ConnectionDetails>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn selected_collection(&self) -> Option<&str> {
        self.selected_collection.as_deref()
    }

    pub fn connection_details(&self) -> Option<&ConnectionDetails> {
        self.connection_details.as_ref()
    }

    pub(crate) fn mark_connected(&mut self, details: ConnectionDetails) {
        self.is_connected = true;
        self.connection_details = Some(details);
    }

    pub(crate) fn select_collection(&mut self, name: impl Into<String>) {
        self.selected_collection = Some(name.into());
    }

    /// Drops the selected collection. Connection status is left as last known.
    pub(crate) fn clear_selection(&mut self) {
        self.selected_collection = None;
    }
}
