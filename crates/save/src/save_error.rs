// ---------------------------------------------------------------------------
// SaveError: typed errors for save/load operations
// ---------------------------------------------------------------------------

use std::fmt;

/// Errors that can occur during save/load operations.
#[derive(Debug)]
pub enum SaveError {
    /// I/O error (file not found, permission denied, disk full, etc.)
    Io(std::io::Error),
    /// JSON encoding or decoding failed (corrupt or invalid save data).
    Json(String),
    /// The save's version field does not match this build. A mismatch is a
    /// hard failure; no migration or guessing is attempted.
    VersionMismatch { expected: u32, found: u32 },
    /// The version field is missing or not an integer.
    MissingVersion,
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "I/O error: {e}"),
            SaveError::Json(msg) => write!(f, "JSON error: {msg}"),
            SaveError::VersionMismatch { expected, found } => write!(
                f,
                "Version mismatch: save is v{found}, but this build expects v{expected}"
            ),
            SaveError::MissingVersion => write!(f, "Save file has no version field"),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<serde_json::Error> for SaveError {
    fn from(e: serde_json::Error) -> Self {
        SaveError::Json(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_version_mismatch() {
        let err = SaveError::VersionMismatch {
            expected: 1,
            found: 9,
        };
        let msg = format!("{err}");
        assert!(msg.contains("v9"), "got: {msg}");
        assert!(msg.contains("v1"), "got: {msg}");
    }

    #[test]
    fn test_from_io_preserves_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SaveError = io_err.into();
        assert!(matches!(err, SaveError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_json_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: SaveError = parse_err.into();
        assert!(matches!(err, SaveError::Json(_)));
    }
}
