use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docuvault_core::{DocumentId, DomainError, DomainResult, FolderId, TenantId, TenantScoped, UserId};

/// Coarse document classification used for listing filters and icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Word,
    Excel,
    Pdf,
    Image,
    Csv,
    Text,
    Generic,
}

impl FileType {
    /// Derive the type from the file extension, falling back to MIME hints.
    ///
    /// Deterministic: the same (extension, mime) pair always classifies the
    /// same way. Unknown combinations land on `Generic`.
    pub fn derive(extension: &str, mime_type: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        let mime = mime_type.to_ascii_lowercase();

        if matches!(ext.as_str(), "doc" | "docx") || mime.contains("word") {
            FileType::Word
        } else if matches!(ext.as_str(), "xls" | "xlsx")
            || mime.contains("excel")
            || mime.contains("spreadsheet")
        {
            FileType::Excel
        } else if ext == "pdf" || mime.contains("pdf") {
            FileType::Pdf
        } else if matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg")
            || mime.contains("image")
        {
            FileType::Image
        } else if ext == "csv" || mime.contains("csv") {
            FileType::Csv
        } else if matches!(ext.as_str(), "txt" | "md") || mime.contains("text") {
            FileType::Text
        } else {
            FileType::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Word => "word",
            FileType::Excel => "excel",
            FileType::Pdf => "pdf",
            FileType::Image => "image",
            FileType::Csv => "csv",
            FileType::Text => "text",
            FileType::Generic => "generic",
        }
    }
}

impl core::fmt::Display for FileType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque object-storage coordinates. This core stores and returns them;
/// it never inspects the bytes they point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRef {
    pub bucket: String,
    pub key: String,
    pub version: Option<String>,
}

/// Document metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub tenant_id: TenantId,
    pub folder_id: Option<FolderId>,
    pub original_name: String,
    pub nickname: Option<String>,
    pub description: String,
    pub file_type: FileType,
    pub mime_type: String,
    pub file_size: u64,
    pub file_extension: String,
    pub storage: StorageRef,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        original_name: &str,
        folder_id: Option<FolderId>,
        mime_type: &str,
        file_size: u64,
        storage: StorageRef,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let original_name = original_name.trim();
        if original_name.is_empty() {
            return Err(DomainError::validation("document name cannot be empty"));
        }
        if original_name.len() > 255 {
            return Err(DomainError::validation("document name too long"));
        }

        let file_extension = extension_of(original_name);
        let file_type = FileType::derive(&file_extension, mime_type);

        Ok(Self {
            id: DocumentId::new(),
            // Stamped by the scoped store on insert.
            tenant_id: TenantId::nil(),
            folder_id,
            original_name: original_name.to_string(),
            nickname: None,
            description: String::new(),
            file_type,
            mime_type: mime_type.to_string(),
            file_size,
            file_extension,
            storage,
            is_archived: false,
            archived_at: None,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Nickname when set, otherwise the original name without its extension.
    pub fn display_name(&self) -> &str {
        if let Some(nickname) = &self.nickname {
            if !nickname.is_empty() {
                return nickname;
            }
        }
        match self.original_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.original_name,
        }
    }

    pub fn archive(&mut self, archived_key: String, now: DateTime<Utc>) {
        self.is_archived = true;
        self.archived_at = Some(now);
        self.storage.key = archived_key;
        self.updated_at = now;
    }

    /// Blank nicknames clear the field rather than masking the original
    /// name with an empty string.
    pub fn set_nickname(&mut self, nickname: Option<String>, now: DateTime<Utc>) {
        self.nickname = nickname.filter(|n| !n.trim().is_empty());
        self.updated_at = now;
    }

    pub fn set_description(&mut self, description: String, now: DateTime<Utc>) {
        self.description = description;
        self.updated_at = now;
    }

    pub fn move_to(&mut self, folder_id: Option<FolderId>, now: DateTime<Utc>) {
        self.folder_id = folder_id;
        self.updated_at = now;
    }

    /// Case-insensitive substring match over name and nickname, optionally
    /// the description as well.
    pub fn matches_search(&self, query: &str, include_description: bool) -> bool {
        let q = query.to_lowercase();
        if q.is_empty() {
            return true;
        }
        if self.original_name.to_lowercase().contains(&q) {
            return true;
        }
        if let Some(nickname) = &self.nickname {
            if nickname.to_lowercase().contains(&q) {
                return true;
            }
        }
        include_description && self.description.to_lowercase().contains(&q)
    }
}

impl TenantScoped for Document {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = tenant_id;
    }
}

fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, mime: &str) -> Document {
        Document::new(
            name,
            None,
            mime,
            1024,
            StorageRef {
                bucket: "docs".into(),
                key: format!("k/{name}"),
                version: None,
            },
            Some(UserId::new()),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn file_type_prefers_the_extension() {
        assert_eq!(FileType::derive("docx", "application/octet-stream"), FileType::Word);
        assert_eq!(FileType::derive("xlsx", ""), FileType::Excel);
        assert_eq!(FileType::derive("pdf", ""), FileType::Pdf);
        assert_eq!(FileType::derive("png", ""), FileType::Image);
        assert_eq!(FileType::derive("csv", ""), FileType::Csv);
        assert_eq!(FileType::derive("md", ""), FileType::Text);
        assert_eq!(FileType::derive("bin", "application/octet-stream"), FileType::Generic);
    }

    #[test]
    fn file_type_falls_back_to_mime() {
        assert_eq!(
            FileType::derive("", "application/vnd.ms-excel spreadsheet"),
            FileType::Excel
        );
        assert_eq!(FileType::derive("", "image/webp"), FileType::Image);
        assert_eq!(FileType::derive("", "text/plain"), FileType::Text);
    }

    #[test]
    fn derivation_happens_at_construction() {
        assert_eq!(doc("q1.pdf", "application/pdf").file_type, FileType::Pdf);
        assert_eq!(doc("raw", "").file_type, FileType::Generic);
    }

    #[test]
    fn display_name_prefers_nickname_then_stem() {
        let mut d = doc("report-final.pdf", "application/pdf");
        assert_eq!(d.display_name(), "report-final");

        d.nickname = Some("Q1 Report".into());
        assert_eq!(d.display_name(), "Q1 Report");

        let plain = doc("README", "");
        assert_eq!(plain.display_name(), "README");
    }

    #[test]
    fn hidden_style_names_keep_their_full_name() {
        // ".env" has no stem before the dot; show it whole.
        let d = doc(".env", "");
        assert_eq!(d.display_name(), ".env");
        assert_eq!(d.file_extension, "");
    }

    #[test]
    fn archive_sets_flag_timestamp_and_key() {
        let mut d = doc("q1.pdf", "application/pdf");
        let now = Utc::now();
        d.archive("archive/q1.pdf".into(), now);
        assert!(d.is_archived);
        assert_eq!(d.archived_at, Some(now));
        assert_eq!(d.storage.key, "archive/q1.pdf");
    }

    #[test]
    fn search_matches_name_nickname_and_optionally_description() {
        let mut d = doc("Quarterly-Report.pdf", "application/pdf");
        d.nickname = Some("Q1 numbers".into());
        d.description = "board deck attachments".into();

        assert!(d.matches_search("quarterly", false));
        assert!(d.matches_search("numbers", false));
        assert!(!d.matches_search("board", false));
        assert!(d.matches_search("board", true));
        assert!(!d.matches_search("missing", true));
    }
}
