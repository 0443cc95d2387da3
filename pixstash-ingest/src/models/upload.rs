//! Upload boundary types

use serde::{Deserialize, Serialize};

use crate::models::AssetRecord;

/// One uploaded file as handed over by the request layer
#[derive(Debug, Clone)]
pub struct UploadItem {
    /// Original client-side filename
    pub file_name: String,
    /// Declared MIME type, if the client sent one
    pub content_type: Option<String>,
    /// Raw file content
    pub data: Vec<u8>,
}

impl UploadItem {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            data,
        }
    }

    /// Lower-cased extension of the original filename, including the dot
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
    }
}

/// Per-file upload outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
    pub message: String,
    pub original_name: String,
    /// The upload matched an existing asset
    #[serde(default)]
    pub duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetRecord>,
}

impl UploadResult {
    pub fn created(original_name: String, asset: AssetRecord) -> Self {
        Self {
            success: true,
            message: "uploaded".to_string(),
            original_name,
            duplicate: false,
            asset: Some(asset),
        }
    }

    pub fn existing(original_name: String, asset: AssetRecord) -> Self {
        Self {
            success: true,
            message: "image already exists".to_string(),
            original_name,
            duplicate: true,
            asset: Some(asset),
        }
    }

    pub fn failed(original_name: String, message: String) -> Self {
        Self {
            success: false,
            message,
            original_name,
            duplicate: false,
            asset: None,
        }
    }
}

/// Aggregate response for a multi-file upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub message: String,
    pub results: Vec<UploadResult>,
}

impl UploadSummary {
    pub fn from_results(results: Vec<UploadResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;

        let message = if succeeded > 0 {
            format!("uploaded {} image(s)", succeeded)
        } else {
            "all uploads failed".to_string()
        };

        Self {
            succeeded,
            failed,
            message,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_lowercased() {
        let item = UploadItem::new("Holiday.PNG", None, vec![]);
        assert_eq!(item.extension().as_deref(), Some(".png"));

        let item = UploadItem::new("no_extension", None, vec![]);
        assert_eq!(item.extension(), None);
    }

    #[test]
    fn test_summary_counts() {
        let summary = UploadSummary::from_results(vec![
            UploadResult::failed("a.png".to_string(), "decode failed".to_string()),
            UploadResult::failed("b.png".to_string(), "decode failed".to_string()),
        ]);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.message, "all uploads failed");
    }
}
