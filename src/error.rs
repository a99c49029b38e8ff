//! Error types for program evaluation

use thiserror::Error;

/// Result type alias for evaluation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Web Algebra evaluation
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (TLS material, API keys)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed program: unknown operator, missing argument, unbound variable
    #[error("Program error: {0}")]
    Program(String),

    /// An argument evaluated to the wrong category of value
    #[error("Type error: {0}")]
    Type(String),

    /// Failed to parse or serialize RDF or SPARQL results
    #[error("Codec error: {0}")]
    Codec(String),

    /// Transport failure, TLS failure, or non-2xx HTTP status after retries
    #[error("Network error: {0}")]
    Network(String),

    /// Well-formed but unsuccessful response from a remote server
    #[error("Remote error: {0}")]
    Remote(String),

    /// Operator-specific invariant breach
    #[error("Operation error: {0}")]
    Operation(String),
}

impl Error {
    /// Stable name of the error kind, used by the CLI and the MCP adapter.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "ConfigError",
            Error::Program(_) => "ProgramError",
            Error::Type(_) => "TypeError",
            Error::Codec(_) => "CodecError",
            Error::Network(_) => "NetworkError",
            Error::Remote(_) => "RemoteError",
            Error::Operation(_) => "OperationError",
        }
    }
}

impl From<oxrdf::IriParseError> for Error {
    fn from(err: oxrdf::IriParseError) -> Self {
        Error::Type(format!("invalid IRI: {}", err))
    }
}

impl From<oxrdfio::RdfParseError> for Error {
    fn from(err: oxrdfio::RdfParseError) -> Self {
        Error::Codec(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Codec(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Network(err.to_string())
    }
}
