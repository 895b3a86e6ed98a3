// API request models
// Bodies sent to the analytics backend (`/api/connect`, `/api/analytics`).

use serde::Serialize;
use std::fmt;

use super::session::ConnectionDetails;
use crate::error::WizardResult;
use crate::utils::validation;

/// Raw connect form input, exactly as typed by the user.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectForm {
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub schema: String,
}

impl ConnectForm {
    /// Form with the port pre-filled, as shown when the wizard opens.
    pub fn with_default_port(port: u16) -> Self {
        Self {
            port: port.to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> WizardResult<ConnectionParams> {
        validation::validate_connect_form(self)
    }
}

impl fmt::Debug for ConnectForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectForm")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("schema", &self.schema)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub schema: String,
}

impl ConnectionParams {
    pub fn details(&self) -> ConnectionDetails {
        ConnectionDetails {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            schema: self.schema.clone(),
        }
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("schema", &self.schema)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsRequest<'a> {
    pub table: &'a str,
}
