//! Object storage coordinates and presigned transfer URLs.
//!
//! Files never pass through this service. Clients upload and download
//! against presigned URLs minted here, and the backend only tracks the
//! object key. Keys are tenant-prefixed so bucket listings partition by
//! account.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use uuid::Uuid;

use docuvault_core::{DocumentId, DomainError, DomainResult, TenantId};

/// Upload ceiling enforced at request validation time, 100 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// A signed, time-limited URL the client performs the transfer against.
#[derive(Debug, Clone, Serialize)]
pub struct PresignedRequest {
    pub url: String,
    pub method: &'static str,
    pub headers: Vec<(String, String)>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> DomainResult<PresignedRequest>;

    async fn presign_download(&self, key: &str, ttl: Duration) -> DomainResult<PresignedRequest>;

    /// Moves an object to a new key. A missing source is tolerated so
    /// archive flows stay idempotent.
    async fn rename(&self, from: &str, to: &str) -> DomainResult<()>;

    /// Idempotent; deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> DomainResult<()>;
}

/// Builds the canonical storage key for a document revision:
/// `tenants/{tenant}/documents/{yyyy}/{mm}/{document_id}/{filename}`.
///
/// Only the final path segment of the client-supplied filename survives.
pub fn object_key(
    tenant: TenantId,
    document_id: DocumentId,
    filename: &str,
    now: DateTime<Utc>,
) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    let name = if name.is_empty() { "unnamed" } else { name };
    format!(
        "tenants/{}/documents/{:04}/{:02}/{}/{}",
        tenant,
        now.year(),
        now.month(),
        document_id,
        name
    )
}

/// Key an archived object moves to. Swaps the `documents/` segment for
/// `archive/` in place, keeping the tenant prefix.
pub fn archive_key_for(key: &str) -> String {
    if key.contains("/documents/") {
        key.replacen("/documents/", "/archive/", 1)
    } else {
        format!("archive/{key}")
    }
}

/// Bucket stand-in for tests and single-node deployments. Tracks object
/// keys and sizes, and mints `memory://` URLs with a random signature.
pub struct InMemoryObjectStore {
    bucket: String,
    objects: RwLock<HashMap<String, u64>>,
}

impl InMemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Registers an object as uploaded, as the bucket would after the
    /// client completes a presigned PUT.
    pub fn put(&self, key: &str, size: u64) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(key.to_string(), size);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .read()
            .map(|objects| objects.contains_key(key))
            .unwrap_or(false)
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    fn signed_url(&self, key: &str, expires_at: DateTime<Utc>) -> String {
        format!(
            "memory://{}/{}?expires={}&sig={}",
            self.bucket,
            key,
            expires_at.timestamp(),
            Uuid::now_v7().simple()
        )
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> DomainResult<PresignedRequest> {
        if key.is_empty() {
            return Err(DomainError::validation("object key must not be empty"));
        }
        let expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
        Ok(PresignedRequest {
            url: self.signed_url(key, expires_at),
            method: "PUT",
            headers: vec![("content-type".to_string(), content_type.to_string())],
            expires_at,
        })
    }

    async fn presign_download(&self, key: &str, ttl: Duration) -> DomainResult<PresignedRequest> {
        if key.is_empty() {
            return Err(DomainError::validation("object key must not be empty"));
        }
        // Signing is offline; whether the object exists is the bucket's
        // answer at fetch time, same as a real presigner.
        let expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
        Ok(PresignedRequest {
            url: self.signed_url(key, expires_at),
            method: "GET",
            headers: vec![],
            expires_at,
        })
    }

    async fn rename(&self, from: &str, to: &str) -> DomainResult<()> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| DomainError::conflict("object store lock poisoned"))?;
        if let Some(size) = objects.remove(from) {
            objects.insert(to.to_string(), size);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> DomainResult<()> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| DomainError::conflict("object store lock poisoned"))?;
        objects.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tenant() -> TenantId {
        TenantId::new()
    }

    #[test]
    fn keys_partition_by_tenant_and_month() {
        let tenant = tenant();
        let document_id = DocumentId::new();
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();

        let key = object_key(tenant, document_id, "q1-report.pdf", now);

        assert_eq!(
            key,
            format!("tenants/{tenant}/documents/2024/03/{document_id}/q1-report.pdf")
        );
    }

    #[test]
    fn filenames_lose_any_path_prefix() {
        let tenant = tenant();
        let document_id = DocumentId::new();
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();

        let unix = object_key(tenant, document_id, "../../etc/passwd", now);
        let windows = object_key(tenant, document_id, "C:\\temp\\report.pdf", now);

        assert!(unix.ends_with("/passwd"));
        assert!(!unix.contains(".."));
        assert!(windows.ends_with("/report.pdf"));
    }

    #[test]
    fn archive_key_swaps_the_documents_segment() {
        let key = "tenants/t1/documents/2024/03/d1/report.pdf";
        assert_eq!(
            archive_key_for(key),
            "tenants/t1/archive/2024/03/d1/report.pdf"
        );
        assert_eq!(archive_key_for("loose-object"), "archive/loose-object");
    }

    #[tokio::test]
    async fn presigned_upload_carries_the_content_type() {
        let store = InMemoryObjectStore::new("docs");

        let request = store
            .presign_upload("tenants/t1/documents/a.pdf", "application/pdf", Duration::from_secs(900))
            .await
            .unwrap();

        assert_eq!(request.method, "PUT");
        assert!(request.url.contains("tenants/t1/documents/a.pdf"));
        assert!(request
            .headers
            .iter()
            .any(|(name, value)| name == "content-type" && value == "application/pdf"));
    }

    #[tokio::test]
    async fn presigned_download_signs_without_a_lookup() {
        let store = InMemoryObjectStore::new("docs");

        let empty = store.presign_download("", Duration::from_secs(60)).await;
        assert!(matches!(empty.unwrap_err(), DomainError::Validation(_)));

        let request = store
            .presign_download("tenants/t1/documents/a.pdf", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(request.method, "GET");
        assert!(request.headers.is_empty());
    }

    #[tokio::test]
    async fn rename_moves_the_object_and_tolerates_a_missing_source() {
        let store = InMemoryObjectStore::new("docs");
        store.put("old", 7);

        store.rename("old", "new").await.unwrap();
        assert!(!store.contains("old"));
        assert!(store.contains("new"));

        store.rename("ghost", "somewhere").await.unwrap();
        assert!(!store.contains("somewhere"));
    }
}
