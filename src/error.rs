//! error types
//!
//! one variant per failure stage of a request: guards, encoding, transport,
//! body read, http status, decoding, and graphql-level errors.

use crate::graphql::GraphQlError;

/// library result type
pub type Result<T> = std::result::Result<T, Error>;

/// boxed error returned by transport implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// error type for client operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("graphql: request cancelled")]
    Cancelled,

    #[error("graphql: cannot send files without multipart form mode")]
    MultipartRequired,

    #[error("config error: {0}")]
    Config(String),

    #[error("graphql: {context}: {source}")]
    Encode {
        /// encoding step that failed
        context: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("{0}")]
    Transport(#[source] BoxError),

    #[error("graphql: reading body: {0}")]
    BodyRead(#[source] reqwest::Error),

    #[error("graphql: server returned a non-200 status code: {status}")]
    Status {
        /// http status code
        status: u16,
        /// raw response body
        body: String,
        /// graphql errors, if the body still parsed as a response envelope
        errors: Vec<GraphQlError>,
    },

    #[error("graphql: decoding response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("{}", first_message(.errors))]
    GraphQl {
        /// every error the server reported, first one is the headline
        errors: Vec<GraphQlError>,
        /// partial data sent alongside the errors
        data: Option<serde_json::Value>,
    },
}

fn first_message(errors: &[GraphQlError]) -> String {
    errors
        .first()
        .map(|err| err.to_string())
        .unwrap_or_else(|| "graphql: unknown error".to_string())
}

impl Error {
    pub(crate) fn encode<E>(context: &'static str, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Encode {
            context,
            source: source.into(),
        }
    }

    /// http status if the server answered with a non-200 code
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// graphql errors carried by this error, in server order
    pub fn graphql_errors(&self) -> &[GraphQlError] {
        match self {
            Error::GraphQl { errors, .. } | Error::Status { errors, .. } => errors,
            _ => &[],
        }
    }

    /// the graphql error surfaced as this call's failure
    pub fn first_graphql_error(&self) -> Option<&GraphQlError> {
        match self {
            Error::GraphQl { errors, .. } => errors.first(),
            _ => None,
        }
    }

    /// true if the call was cancelled before or during execution
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
