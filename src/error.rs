use thiserror::Error;

use crate::bridge::BridgeError;

pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Ledger API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl AgentError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        AgentError::Validation(msg.into())
    }

    pub fn invalid_address<T: Into<String>>(msg: T) -> Self {
        AgentError::InvalidAddress(msg.into())
    }

    pub fn signing<T: Into<String>>(msg: T) -> Self {
        AgentError::Signing(msg.into())
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        AgentError::Timeout(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        AgentError::Config(msg.into())
    }

    pub fn api<T: Into<String>>(status: u16, msg: T) -> Self {
        AgentError::Api {
            status,
            message: msg.into(),
        }
    }

    /// Programming errors against the bridge lifecycle, as opposed to
    /// failures reported by the ledger or the transport.
    pub fn is_misuse(&self) -> bool {
        matches!(self, AgentError::Bridge(e) if e.is_misuse())
    }

    pub fn is_network(&self) -> bool {
        matches!(
            self,
            AgentError::Network(_) | AgentError::Api { .. } | AgentError::Timeout(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AgentError::Validation(_) | AgentError::InvalidAddress(_))
    }
}
