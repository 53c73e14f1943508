use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DumpChunkError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[cfg_attr(not(feature = "mysql"), allow(dead_code))]
    #[error("Could not connect to database: {0}")]
    Connection(String),
    #[cfg_attr(not(feature = "mysql"), allow(dead_code))]
    #[error("Could not determine {subject} automatically: {message}")]
    Schema {
        subject: &'static str,
        message: String,
    },
    #[cfg_attr(feature = "mysql", allow(dead_code))]
    #[error("Introspection is needed but this build has no MySQL driver")]
    DriverUnavailable,
}

impl DumpChunkError {
    pub fn invalid(message: impl Into<String>) -> Self {
        DumpChunkError::InvalidArgument(message.into())
    }

    #[cfg_attr(not(feature = "mysql"), allow(dead_code))]
    pub fn connection(message: impl Into<String>) -> Self {
        DumpChunkError::Connection(message.into())
    }

    #[cfg_attr(not(feature = "mysql"), allow(dead_code))]
    pub fn schema(subject: &'static str, message: impl Into<String>) -> Self {
        DumpChunkError::Schema {
            subject,
            message: message.into(),
        }
    }

    /// Flag hint shown to the user when introspection failed.
    pub fn remedy(&self) -> Option<&'static str> {
        match self {
            DumpChunkError::Schema { subject, .. } if *subject == PRIMARY_KEY_SUBJECT => {
                Some("pass the column explicitly with --db-primary-key")
            }
            DumpChunkError::Schema { .. } => Some("pass the value explicitly with --db-max-id"),
            DumpChunkError::Connection(_) | DumpChunkError::DriverUnavailable => {
                Some("pass both --db-primary-key and --db-max-id to skip introspection")
            }
            DumpChunkError::InvalidArgument(_) => None,
        }
    }
}

pub const PRIMARY_KEY_SUBJECT: &str = "primary key";
#[cfg_attr(not(feature = "mysql"), allow(dead_code))]
pub const MAX_ID_SUBJECT: &str = "max id";

pub type DumpChunkResult<T> = Result<T, DumpChunkError>;
