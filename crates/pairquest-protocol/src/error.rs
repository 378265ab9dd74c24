/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an outbound frame failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes are not a well-formed frame: bad JSON, unknown action
    /// type, missing field or a field of the wrong type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but a value in it is not acceptable, such as a
    /// room id with characters outside the allowed alphabet.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
