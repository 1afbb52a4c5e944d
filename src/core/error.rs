use thiserror::Error;

#[derive(Error, Debug)]
pub enum FiregenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("GRPC error: {0}")]
    Grpc(#[from] tonic::Status),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP export rejected with status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Sink already shut down")]
    SinkClosed,
}

/// Result type alias for firegen operations
pub type Result<T> = std::result::Result<T, FiregenError>;

impl FiregenError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new setup error
    pub fn setup<S: Into<String>>(msg: S) -> Self {
        Self::Setup(msg.into())
    }

    /// Creates a new invalid endpoint error
    pub fn invalid_endpoint<S: Into<String>>(msg: S) -> Self {
        Self::InvalidEndpoint(msg.into())
    }

    /// Returns true if the error means the export deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Grpc(status) => status.code() == tonic::Code::DeadlineExceeded,
            Self::Http(err) => err.is_timeout(),
            _ => false,
        }
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Yaml(_) => "config",
            Self::InvalidEndpoint(_) | Self::Setup(_) => "setup",
            Self::Transport(_) | Self::Grpc(_) | Self::Http(_) | Self::HttpStatus { .. } => {
                "network"
            },
            Self::SinkClosed => "sink",
        }
    }
}
