//! Credential record types for the vault (§3.1, §4.B). The vault crate owns
//! encryption; this crate only describes the shapes that cross the port
//! boundary.

use serde::{Deserialize, Serialize};

use crate::ids::CredentialId;

/// Public metadata about a stored credential record. Never includes the
/// plaintext or encrypted blob — the sidecar JSON the vault persists
/// alongside each `<id>.enc` file (§6 on-disk layout).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CredentialMetadata {
    pub id: CredentialId,
    pub display_name: String,
    pub source_browser: Option<String>,
    pub covered_domains: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_serializes_without_blob_fields() {
        let meta = CredentialMetadata {
            id: CredentialId::new(),
            display_name: "personal".into(),
            source_browser: Some("firefox".into()),
            covered_domains: vec!["example.test".into()],
            created_at: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("blob"));
        assert!(!json.contains("ciphertext"));
    }
}
