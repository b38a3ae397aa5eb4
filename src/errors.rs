use thiserror::Error;

/// Enumerates errors returned by the storage substrate.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Represents an I/O error from the backing store.
    #[error("storage I/O error")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Represents a failure to encode a value before persisting it.
    #[error("storage encoding error")]
    Encoding { source: serde_json::Error },
}

/// Enumerates errors returned by the availability query.
#[derive(Debug, Error)]
pub enum AvailabilityError {
    /// Represents a failed request to the availability endpoint.
    #[error("availability request failed")]
    Request { source: reqwest::Error },

    /// Represents a response body that could not be parsed.
    #[error("malformed availability response")]
    MalformedResponse { source: serde_json::Error },
}
