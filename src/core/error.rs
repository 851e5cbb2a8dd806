//! Error types for mesh voxelization

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    /// The mesh has no usable triangles, or its buffers are malformed
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A spatial index was requested over zero triangles
    #[error("spatial index built over an empty triangle buffer")]
    EmptyIndex,

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The classification worker pool could not be created
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::InvalidConfiguration("cell_size must be > 0".into());
        assert_eq!(err.to_string(), "invalid configuration: cell_size must be > 0");
        assert_eq!(
            Error::EmptyIndex.to_string(),
            "spatial index built over an empty triangle buffer"
        );
    }

    #[test]
    fn test_io_conversion() {
        fn open_missing() -> crate::core::Result<String> {
            Ok(std::fs::read_to_string("/definitely/not/here.json")?)
        }
        assert!(matches!(open_missing(), Err(Error::Io(_))));
    }
}
