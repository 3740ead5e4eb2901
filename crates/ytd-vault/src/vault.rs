//! File-backed implementation of [`CredentialVaultPort`] (§4.B).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;
use ytd_core::{CoreError, CredentialId, CredentialMetadata, CredentialVaultPort};

use crate::cookie_jar;
use crate::crypto;
use crate::key;

fn blob_path(cookies_dir: &Path, id: CredentialId) -> PathBuf {
    cookies_dir.join(format!("{id}.enc"))
}

fn meta_path(cookies_dir: &Path, id: CredentialId) -> PathBuf {
    cookies_dir.join(format!("{id}.meta.json"))
}

pub struct FileVault {
    cookies_dir: PathBuf,
    key: [u8; 32],
}

impl FileVault {
    /// Resolves the vault's encryption key (from configuration or generated
    /// on first use) and ensures `cookies_dir` exists.
    pub async fn new(
        cookies_dir: impl Into<PathBuf>,
        configured_key: Option<&str>,
    ) -> Result<Self, CoreError> {
        let cookies_dir = cookies_dir.into();
        tokio::fs::create_dir_all(&cookies_dir)
            .await
            .map_err(|e| CoreError::Internal(format!("failed to create vault directory: {e}")))?;
        let key = key::resolve(&cookies_dir, configured_key).await?;
        Ok(Self { cookies_dir, key })
    }

    async fn load_metadata(&self, id: CredentialId) -> Result<CredentialMetadata, CoreError> {
        let path = meta_path(&self.cookies_dir, id);
        let raw = tokio::fs::read(&path)
            .await
            .map_err(|_| CoreError::NotFound(id.to_string()))?;
        serde_json::from_slice(&raw)
            .map_err(|e| CoreError::Internal(format!("corrupt credential metadata: {e}")))
    }
}

#[async_trait]
impl CredentialVaultPort for FileVault {
    async fn store(
        &self,
        display_name: String,
        source_browser: Option<String>,
        covered_domains: Vec<String>,
        cookie_jar: Vec<u8>,
    ) -> Result<CredentialMetadata, CoreError> {
        cookie_jar::validate(&cookie_jar)?;

        let meta = CredentialMetadata {
            id: CredentialId::new(),
            display_name,
            source_browser,
            covered_domains,
            created_at: chrono::Utc::now(),
        };

        let ciphertext_hex = crypto::encrypt(&self.key, &cookie_jar)?;
        tokio::fs::write(blob_path(&self.cookies_dir, meta.id), ciphertext_hex)
            .await
            .map_err(|e| CoreError::Internal(format!("failed to persist credential: {e}")))?;

        let meta_json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| CoreError::Internal(format!("failed to serialize metadata: {e}")))?;
        tokio::fs::write(meta_path(&self.cookies_dir, meta.id), meta_json)
            .await
            .map_err(|e| CoreError::Internal(format!("failed to persist metadata: {e}")))?;

        Ok(meta)
    }

    async fn issue_plaintext(&self, id: CredentialId) -> Result<PathBuf, CoreError> {
        let blob_path = blob_path(&self.cookies_dir, id);
        let ciphertext_hex = tokio::fs::read_to_string(&blob_path)
            .await
            .map_err(|_| CoreError::NotFound(id.to_string()))?;
        let plaintext = crypto::decrypt(&self.key, &ciphertext_hex)?;

        let tmp_dir = self.cookies_dir.join("tmp");
        tokio::fs::create_dir_all(&tmp_dir)
            .await
            .map_err(|e| CoreError::Internal(format!("failed to create temp directory: {e}")))?;
        let plaintext_path = tmp_dir.join(format!("{id}-{}.txt", uuid::Uuid::new_v4()));

        tokio::fs::write(&plaintext_path, &plaintext)
            .await
            .map_err(|e| CoreError::Internal(format!("failed to write plaintext credential: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&plaintext_path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| CoreError::Internal(format!("failed to restrict plaintext permissions: {e}")))?;
        }

        Ok(plaintext_path)
    }

    async fn release_plaintext(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to remove plaintext credential");
            }
        }
    }

    async fn metadata(&self, id: CredentialId) -> Result<CredentialMetadata, CoreError> {
        self.load_metadata(id).await
    }

    async fn list(&self) -> Result<Vec<CredentialMetadata>, CoreError> {
        let mut entries = tokio::fs::read_dir(&self.cookies_dir)
            .await
            .map_err(|e| CoreError::Internal(format!("failed to list vault directory: {e}")))?;

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CoreError::Internal(format!("failed to read vault entry: {e}")))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(id_str) = name.strip_suffix(".meta.json") else {
                continue;
            };
            if let Ok(id) = id_str.parse::<CredentialId>() {
                if let Ok(meta) = self.load_metadata(id).await {
                    records.push(meta);
                }
            }
        }
        records.sort_by_key(|m| m.created_at);
        Ok(records)
    }

    async fn delete(&self, id: CredentialId) -> Result<(), CoreError> {
        let blob = blob_path(&self.cookies_dir, id);
        let meta = meta_path(&self.cookies_dir, id);
        if tokio::fs::metadata(&meta).await.is_err() {
            return Err(CoreError::NotFound(id.to_string()));
        }
        let _ = tokio::fs::remove_file(&blob).await;
        tokio::fs::remove_file(&meta)
            .await
            .map_err(|e| CoreError::Internal(format!("failed to delete credential: {e}")))
    }
}
