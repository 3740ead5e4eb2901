//! Resolves the 256-bit vault encryption key: from configuration, or
//! generated on first use and persisted with owner-only permissions
//! alongside the vault directory (§4.B, §6 on-disk layout).

use std::path::{Path, PathBuf};

use rand::RngCore;
use ytd_core::CoreError;

const KEY_FILE_NAME: &str = ".encryption_key";

fn key_file_path(cookies_dir: &Path) -> PathBuf {
    cookies_dir.join(KEY_FILE_NAME)
}

fn decode_hex_key(hex_str: &str) -> Result<[u8; 32], CoreError> {
    let bytes = hex::decode(hex_str.trim())
        .map_err(|_| CoreError::Internal("encryption key is not valid hex".into()))?;
    bytes
        .try_into()
        .map_err(|_| CoreError::Internal("encryption key must be 32 bytes".into()))
}

/// Load the configured key, or the previously generated on-disk key, or
/// generate and persist a fresh one.
pub async fn resolve(
    cookies_dir: &Path,
    configured: Option<&str>,
) -> Result<[u8; 32], CoreError> {
    if let Some(hex_key) = configured {
        return decode_hex_key(hex_key);
    }

    let path = key_file_path(cookies_dir);
    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => decode_hex_key(&contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => generate_and_persist(&path).await,
        Err(e) => Err(CoreError::Internal(format!(
            "failed to read encryption key: {e}"
        ))),
    }
}

async fn generate_and_persist(path: &Path) -> Result<[u8; 32], CoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CoreError::Internal(format!("failed to create vault directory: {e}")))?;
    }

    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    let hex_key = hex::encode(key);

    tokio::fs::write(path, &hex_key)
        .await
        .map_err(|e| CoreError::Internal(format!("failed to persist encryption key: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| CoreError::Internal(format!("failed to restrict key permissions: {e}")))?;
    }

    Ok(key)
}
