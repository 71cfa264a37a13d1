//! 头像文件存储
//! 文件写入 {web_root}/images/profiles，数据库中保存 web 相对路径

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::config::StorageConfig;

/// web 相对目录
pub const PROFILE_PHOTO_DIR: &str = "/images/profiles";

pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stored path: {0}")]
    InvalidPath(String),
}

/// 待保存的上传文件
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// 校验类型与大小，返回面向用户的错误信息
    pub fn check(&self, max_bytes: usize) -> Option<String> {
        if self.bytes.is_empty() {
            return Some("Please select a photo to upload.".to_string());
        }
        if self.bytes.len() > max_bytes {
            return Some(format!(
                "Photo must be smaller than {} MB.",
                max_bytes / 1024 / 1024
            ));
        }
        let allowed = self
            .content_type
            .as_deref()
            .map(|t| ALLOWED_CONTENT_TYPES.contains(&t.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !allowed {
            return Some("Only JPEG, PNG, GIF and WebP images are allowed.".to_string());
        }
        None
    }
}

/// 文件名中只保留字母数字与 `.`、`-`、`_`，防止路径穿越
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "photo".to_string()
    } else {
        trimmed.to_string()
    }
}

pub struct StorageService {
    web_root: PathBuf,
    max_upload_bytes: usize,
}

impl StorageService {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            web_root: PathBuf::from(&config.web_root),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    fn profile_dir(&self) -> PathBuf {
        self.web_root.join(PROFILE_PHOTO_DIR.trim_start_matches('/'))
    }

    /// web 相对路径 -> 磁盘路径；只接受头像目录下的单层文件名
    fn resolve(&self, web_path: &str) -> Result<PathBuf, StorageError> {
        let name = web_path
            .strip_prefix(PROFILE_PHOTO_DIR)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|n| !n.is_empty() && !n.contains(['/', '\\']) && *n != "..")
            .ok_or_else(|| StorageError::InvalidPath(web_path.to_string()))?;
        Ok(self.profile_dir().join(name))
    }

    /// 保存头像，返回 `/images/profiles/{uuid}_{name}`
    pub async fn save_profile_photo(&self, upload: &Upload) -> Result<String, StorageError> {
        let dir = self.profile_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(&upload.file_name));
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &upload.bytes).await?;

        tracing::info!(path = %path.display(), size = upload.bytes.len(), "Profile photo saved");
        Ok(format!("{}/{}", PROFILE_PHOTO_DIR, file_name))
    }

    /// 删除旧头像；文件不存在时忽略
    pub async fn delete_profile_photo(&self, web_path: &str) -> Result<(), StorageError> {
        let path = self.resolve(web_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Profile photo deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn web_root(&self) -> &Path {
        &self.web_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(root: &Path) -> StorageService {
        StorageService::new(&StorageConfig {
            web_root: root.to_string_lossy().to_string(),
            max_upload_bytes: 1024 * 1024,
        })
    }

    fn upload(name: &str, content_type: &str, size: usize) -> Upload {
        Upload {
            file_name: name.to_string(),
            content_type: Some(content_type.to_string()),
            bytes: vec![7u8; size],
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("me photo.png"), "me_photo.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\x\\a.jpg"), "a.jpg");
        assert_eq!(sanitize_file_name(".."), "photo");
    }

    #[test]
    fn test_upload_check() {
        assert!(upload("a.png", "image/png", 10).check(1024).is_none());
        assert!(upload("a.PNG", "IMAGE/PNG", 10).check(1024).is_none());
        assert!(upload("a.pdf", "application/pdf", 10).check(1024).is_some());
        assert!(upload("a.png", "image/png", 2048).check(1024).is_some());
        assert!(upload("a.png", "image/png", 0).check(1024).is_some());
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let svc = storage(dir.path());

        let web_path = svc
            .save_profile_photo(&upload("face.png", "image/png", 16))
            .await
            .unwrap();
        assert!(web_path.starts_with("/images/profiles/"));
        assert!(web_path.ends_with("_face.png"));

        let disk = svc.resolve(&web_path).unwrap();
        assert!(disk.exists());

        svc.delete_profile_photo(&web_path).await.unwrap();
        assert!(!disk.exists());
        // 再次删除不报错
        svc.delete_profile_photo(&web_path).await.unwrap();
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let svc = storage(dir.path());
        assert!(svc.resolve("/images/profiles/../secret").is_err());
        assert!(svc.resolve("/etc/passwd").is_err());
    }
}
