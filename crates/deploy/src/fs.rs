//! File system utils.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Extension of persisted ABI artifacts.
pub const ABI_EXTENSION: &str = "abi";

pub struct FsHandler;

impl FsHandler {
    /// Where the ABI of `unit_name` is persisted.
    ///
    /// The unit identifier looks like `contracts/token.sol:Token`; everything from the last
    /// `.` of the file name on is replaced, giving `contracts/token.abi`. Units compiled from
    /// the same source file therefore share one artifact path.
    pub fn abi_artifact_path(unit_name: &str) -> PathBuf {
        Path::new(unit_name).with_extension(ABI_EXTENSION)
    }

    /// Write the ABI JSON of `unit_name` next to its source.
    pub fn write_abi_artifact(unit_name: &str, abi: &str) -> Result<PathBuf> {
        let path = Self::abi_artifact_path(unit_name);
        std::fs::write(&path, abi).map_err(|e| Error::io(&path, e))?;
        tracing::debug!(path = %path.display(), "ABI artifact written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_artifact_path_replaces_unit_suffix() {
        assert_eq!(
            FsHandler::abi_artifact_path("example/storage.sol:Storage"),
            PathBuf::from("example/storage.abi")
        );
        assert_eq!(
            FsHandler::abi_artifact_path("Storage"),
            PathBuf::from("Storage.abi")
        );
        assert_eq!(
            FsHandler::abi_artifact_path("v1.2/token.sol:Token"),
            PathBuf::from("v1.2/token.abi")
        );
    }

    #[test]
    fn test_write_abi_artifact() {
        let tmp = TempDir::new("ethkit-fs").unwrap();
        let unit = format!("{}/storage.sol:Storage", tmp.path().display());

        let path = FsHandler::write_abi_artifact(&unit, "[]").unwrap();

        assert_eq!(path, tmp.path().join("storage.abi"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "[]");
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let tmp = TempDir::new("ethkit-fs").unwrap();
        let unit = format!("{}/missing/storage.sol:Storage", tmp.path().display());
        assert!(matches!(
            FsHandler::write_abi_artifact(&unit, "[]"),
            Err(Error::Io { .. })
        ));
    }
}
