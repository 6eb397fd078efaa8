use bchwatch_primitives::ParseError;
use thiserror::Error;

/// Errors a node client call can surface.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport failure.
    #[error("transport: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON shape.
    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error (code {code}): {message}")]
    Rpc { code: i64, message: String },

    /// The envelope carried neither a result nor an error.
    #[error("response carried no result")]
    MissingResult,

    /// A hash or address field in the response failed to decode.
    #[error("bad field in response: {0}")]
    Decode(#[from] ParseError),

    /// A prefetch worker task could not be joined.
    #[error("prefetch worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type ClientResult<T> = Result<T, ClientError>;
