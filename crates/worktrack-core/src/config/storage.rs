use serde::{Deserialize, Serialize};

use crate::error::{Result, WorktrackError};
use crate::schema::Upload;

/// Object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the filesystem object store.
    #[serde(default = "default_root_dir")]
    pub root_dir: String,

    /// Rules for profile pictures.
    #[serde(default = "UploadRules::avatars")]
    pub avatars: UploadRules,

    /// Rules for task and report attachments.
    #[serde(default = "UploadRules::attachments")]
    pub attachments: UploadRules,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            avatars: UploadRules::avatars(),
            attachments: UploadRules::attachments(),
        }
    }
}

fn default_root_dir() -> String {
    "./uploads".to_string()
}

/// Size and extension limits for one category of upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRules {
    pub max_bytes: u64,
    /// Lower-case extensions without the dot.
    pub allowed_extensions: Vec<String>,
}

impl UploadRules {
    pub fn avatars() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            allowed_extensions: ["jpg", "jpeg", "png", "gif"].map(String::from).to_vec(),
        }
    }

    pub fn attachments() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            allowed_extensions: [
                "pdf", "doc", "docx", "xls", "xlsx", "zip", "rar", "jpg", "jpeg", "png",
            ]
            .map(String::from)
            .to_vec(),
        }
    }

    /// Check an upload against these rules, attributing failures to `field`.
    pub fn check(&self, field: &str, upload: &Upload) -> Result<()> {
        if upload.is_empty() {
            return Err(WorktrackError::invalid(field, "file is empty"));
        }
        if upload.len() as u64 > self.max_bytes {
            return Err(WorktrackError::invalid(
                field,
                format!("file exceeds {} bytes", self.max_bytes),
            ));
        }

        let allowed = upload
            .extension()
            .map(|ext| self.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
            .unwrap_or(false);
        if !allowed {
            return Err(WorktrackError::invalid(
                field,
                format!(
                    "'{}' is not one of: {}",
                    upload.file_name,
                    self.allowed_extensions.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_rules() {
        let rules = UploadRules::attachments();
        assert!(rules.check("attachment", &Upload::new("spec.DOCX", vec![1])).is_ok());
        assert!(rules.check("attachment", &Upload::new("run.exe", vec![1])).is_err());
        assert!(rules.check("attachment", &Upload::new("noext", vec![1])).is_err());
    }

    #[test]
    fn test_size_limit() {
        let rules = UploadRules {
            max_bytes: 4,
            allowed_extensions: vec!["png".into()],
        };
        assert!(rules.check("avatar", &Upload::new("a.png", vec![0; 4])).is_ok());
        let err = rules.check("avatar", &Upload::new("a.png", vec![0; 5])).unwrap_err();
        assert!(err.to_string().contains("avatar:"));
    }

    #[test]
    fn test_empty_file_rejected() {
        assert!(UploadRules::avatars()
            .check("avatar", &Upload::new("a.png", vec![]))
            .is_err());
    }
}
