//! Error types shared across the store, codec and watchdog layers.

/// Failures of the extra-data codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
  #[error("malformed extra data: {0}")]
  Decode(#[source] serde_json::Error),

  #[error("extra data could not be encoded: {0}")]
  Encode(#[source] serde_json::Error),

  #[error("extra data must be a string-keyed mapping")]
  NotAMapping,

  #[error("extra data nests deeper than {max} levels")]
  TooDeep { max: usize },
}

/// Failures reported by a mail transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
  #[error("invalid address {address:?}: {reason}")]
  Address { address: String, reason: String },

  #[error("message could not be built: {0}")]
  Build(String),

  #[error("delivery failed: {0}")]
  Delivery(String),
}

/// Top-level error for devlog operations.
#[derive(Debug, thiserror::Error)]
pub enum DevlogError {
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[from] sqlx::Error),

  #[error(transparent)]
  Codec(#[from] CodecError),

  #[error(transparent)]
  Transport(#[from] TransportError),

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = DevlogError> = std::result::Result<T, E>;
