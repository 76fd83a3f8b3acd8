//! Shared key generation and validation for storage backends.

use crate::traits::{StorageError, StorageResult};

/// Build the storage key for a folder hint and filename.
///
/// All backends use this format for consistency. Rejects components that
/// could escape the sink root.
pub fn generate_storage_key(folder: &str, filename: &str) -> StorageResult<String> {
    let key = if folder.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", folder.trim_end_matches('/'), filename)
    };
    validate_key(&key)?;
    Ok(key)
}

/// Reject traversal sequences and absolute keys.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty()
        || storage_key.starts_with('/')
        || storage_key.split('/').any(|part| part == ".." || part.is_empty())
    {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid components: {}",
            storage_key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_joins_folder_and_filename() {
        assert_eq!(
            generate_storage_key("thumbnails", "a.png").unwrap(),
            "thumbnails/a.png"
        );
        assert_eq!(
            generate_storage_key("thumbnails/", "a.png").unwrap(),
            "thumbnails/a.png"
        );
        assert_eq!(generate_storage_key("", "a.png").unwrap(), "a.png");
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(generate_storage_key("..", "a.png").is_err());
        assert!(generate_storage_key("thumbnails", "../a.png").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("").is_err());
    }
}
