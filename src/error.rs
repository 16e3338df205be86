// macsio_etl/src/error.rs
// Defines custom error types for the macsio_etl crate.

use thiserror::Error;

/// Why a single input record could not be reshaped.
#[derive(Debug, Clone, PartialEq, Eq, Error,)]
pub enum TransformError {
    #[error("missing required field `{0}`")]
    MissingField(String,),
    #[error("malformed timestamp {value:?}: {reason}")]
    Parse { value: String, reason: String, },
}

#[derive(Debug, Error,)]
pub enum EtlError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(String,),
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String,),
    #[error("Database specific error: {0}")]
    DatabaseError(String,),
    #[error("Failed to write batch: {0}")]
    SinkError(String,),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error,),
    #[error("Record {record} rejected: {source}")]
    RejectedRecord {
        record: String,
        #[source]
        source: TransformError,
    },
    #[error("Other error: {0}")]
    Other(String,),
}

impl EtlError {
    pub fn is_transient(&self,) -> bool {
        match self {
            EtlError::ConnectionError(_,) => true,
            EtlError::DatabaseError(msg,) | EtlError::SinkError(msg,) => {
                let m = msg.to_lowercase();
                m.contains("timeout",)
                    || m.contains("timed out",)
                    || m.contains("connection",)
                    || m.contains("server selection",)
                    || m.contains("service unavailable",)
            },
            _ => false,
        }
    }
}

pub type Result<T,> = std::result::Result<T, EtlError,>;
