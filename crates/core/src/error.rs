//! Unified error types for precache.
//!
//! Every variant renders with a stable upper-snake prefix so log lines and
//! proxy error bodies can be matched on without parsing prose.

use tokio_rusqlite::rusqlite;

/// Unified error types for the interception layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A manifest asset could not be fetched during install.
    ///
    /// Fatal to the version being installed only.
    #[error("MANIFEST_FETCH_FAILED: {url}: {reason}")]
    ManifestFetch { url: String, reason: String },

    /// The network transport failed (refused connection, DNS, timeout, body read).
    #[error("NETWORK_UNAVAILABLE: {0}")]
    NetworkUnavailable(String),

    /// The network transport could not be set up (TLS backend, bad client settings).
    #[error("TRANSPORT_INIT_FAILED: {0}")]
    TransportInit(String),

    /// A write into a cache generation failed.
    #[error("CACHE_WRITE_FAILED: {0}")]
    CacheWrite(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be encoded or decoded.
    #[error("CACHE_ERROR: serialization failed: {0}")]
    Serialization(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Invalid request (bad method, unparsable header).
    #[error("INVALID_REQUEST: {0}")]
    InvalidRequest(String),

    /// A lifecycle step was invoked from a phase that does not allow it.
    #[error("INVALID_TRANSITION: {0}")]
    InvalidTransition(String),

    /// No version has been installed yet.
    #[error("NO_ACTIVE_VERSION")]
    NoActiveVersion,

    /// Showing a notification or acting on a window failed.
    #[error("NOTIFICATION_FAILED: {0}")]
    Notification(String),

    /// A click or close named a notification that is not (or no longer) shown.
    #[error("UNKNOWN_NOTIFICATION: {0}")]
    UnknownNotification(u64),
}

impl Error {
    /// Whether the error came from the network transport.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::NetworkUnavailable(_))
    }

    /// The stable code that prefixes the display string.
    pub fn code(&self) -> &'static str {
        match self {
            Error::ManifestFetch { .. } => "MANIFEST_FETCH_FAILED",
            Error::NetworkUnavailable(_) => "NETWORK_UNAVAILABLE",
            Error::TransportInit(_) => "TRANSPORT_INIT_FAILED",
            Error::CacheWrite(_) => "CACHE_WRITE_FAILED",
            Error::Database(_) | Error::MigrationFailed(_) | Error::Serialization(_) => "CACHE_ERROR",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::InvalidRequest(_) => "INVALID_REQUEST",
            Error::InvalidTransition(_) => "INVALID_TRANSITION",
            Error::NoActiveVersion => "NO_ACTIVE_VERSION",
            Error::Notification(_) => "NOTIFICATION_FAILED",
            Error::UnknownNotification(_) => "UNKNOWN_NOTIFICATION",
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ManifestFetch { url: "http://origin/app.js".into(), reason: "status 404".into() };
        assert!(err.to_string().starts_with("MANIFEST_FETCH_FAILED"));
        assert!(err.to_string().contains("/app.js"));
    }

    #[test]
    fn test_code_matches_display_prefix() {
        let errors = [
            Error::NetworkUnavailable("refused".into()),
            Error::MigrationFailed("bad sql".into()),
            Error::TransportInit("no TLS backend".into()),
            Error::InvalidTransition("activate from installing".into()),
            Error::NoActiveVersion,
            Error::UnknownNotification(4),
        ];
        for err in errors {
            assert!(err.to_string().starts_with(err.code()), "{err}");
        }
    }

    #[test]
    fn test_is_network() {
        assert!(Error::NetworkUnavailable("refused".into()).is_network());
        assert!(!Error::CacheWrite("disk full".into()).is_network());
        assert!(!Error::TransportInit("no TLS backend".into()).is_network());
    }

    #[test]
    fn test_rusqlite_conversion() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(err.to_string().starts_with("CACHE_ERROR"));
    }
}
