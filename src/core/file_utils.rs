//! File reading utilities for the resolution pipeline.

use std::path::Path;

use tracing::warn;

use crate::core::errors::{MundlerError, Result};

/// Safe source-file reading with UTF-8 fallback handling.
pub struct FileReader;

impl FileReader {
    /// Read a source file to string, converting invalid UTF-8 lossily rather
    /// than failing the whole bundle's resolution over one odd byte.
    pub async fn read_to_string(path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MundlerError::io(format!("Failed to read file {}", path.display()), e))?;

        match String::from_utf8(bytes) {
            Ok(content) => Ok(content),
            Err(e) => {
                warn!(
                    "File {} contains invalid UTF-8, using lossy conversion",
                    path.display()
                );
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_valid_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("app.js");
        fs::write(&file_path, "require('chai');").unwrap();

        let content = FileReader::read_to_string(&file_path).await.unwrap();
        assert_eq!(content, "require('chai');");
    }

    #[tokio::test]
    async fn converts_invalid_utf8_lossily() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("odd.js");
        fs::write(&file_path, b"require('fs');\x80").unwrap();

        let content = FileReader::read_to_string(&file_path).await.unwrap();
        assert!(content.starts_with("require('fs');"));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = FileReader::read_to_string(Path::new("/no/such/file.js"))
            .await
            .unwrap_err();
        assert!(matches!(err, MundlerError::Io { .. }));
    }
}
