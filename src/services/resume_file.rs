//! 简历临时文件
//!
//! 定制简历是文本时，为上传控件落一个临时文件；文件只属于一次申请，
//! 申请结束（无论结果）时删除。调用方给的现成文件只借用，不删除。

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AppError, AppResult, PlatformError};
use crate::models::ResumePayload;

/// 一次申请使用的简历文件
#[derive(Debug)]
pub struct ResumeFile {
    path: PathBuf,
    owned: bool,
}

impl ResumeFile {
    /// 准备可上传的简历文件
    ///
    /// # 参数
    /// - `payload`: 定制简历（文本或已有文件）
    /// - `dir`: 临时文件目录
    /// - `job_id`: 岗位 ID，用于文件名
    pub async fn materialize(payload: &ResumePayload, dir: &Path, job_id: &str) -> AppResult<Self> {
        match payload {
            ResumePayload::File { path } => {
                if tokio::fs::metadata(path).await.is_err() {
                    return Err(PlatformError::InvalidInput(format!(
                        "简历文件不存在: {}",
                        path.display()
                    ))
                    .into());
                }
                Ok(Self {
                    path: path.clone(),
                    owned: false,
                })
            }
            ResumePayload::Text(text) => {
                if text.trim().is_empty() {
                    return Err(PlatformError::InvalidInput("简历内容为空".to_string()).into());
                }
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| AppError::file_write_failed(dir.display().to_string(), e))?;

                let path = dir.join(format!(
                    "resume-{}-{}.txt",
                    sanitize(job_id),
                    uuid::Uuid::new_v4().simple()
                ));
                tokio::fs::write(&path, text)
                    .await
                    .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
                debug!("简历临时文件: {}", path.display());

                Ok(Self { path, owned: true })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 是否由本次申请创建（结束时删除）
    pub fn is_temporary(&self) -> bool {
        self.owned
    }

    /// 立即删除临时文件；可重复调用
    pub fn cleanup(&mut self) {
        if !self.owned {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("已删除简历临时文件: {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("删除简历临时文件失败 {}: {}", self.path.display(), e),
        }
        self.owned = false;
    }
}

impl Drop for ResumeFile {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn sanitize(job_id: &str) -> String {
    job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("resume-test-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_text_payload_removed_on_drop() {
        let dir = temp_dir();
        let payload = ResumePayload::Text("## SKILLS\n- rust".to_string());
        let file = ResumeFile::materialize(&payload, &dir, "linkedin:42").await.unwrap();
        let path = file.path().to_path_buf();

        assert!(file.is_temporary());
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("resume-linkedin_42-"));

        drop(file);
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_existing_file_is_borrowed() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let existing = dir.join("mine.pdf");
        std::fs::write(&existing, b"%PDF").unwrap();

        let payload = ResumePayload::File { path: existing.clone() };
        let mut file = ResumeFile::materialize(&payload, &dir, "x").await.unwrap();
        file.cleanup();
        drop(file);

        assert!(existing.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_missing_or_empty_payload_rejected() {
        let dir = temp_dir();
        let missing = ResumePayload::File {
            path: dir.join("nope.pdf"),
        };
        assert!(ResumeFile::materialize(&missing, &dir, "x").await.is_err());
        assert!(ResumeFile::materialize(&ResumePayload::Text("  ".into()), &dir, "x")
            .await
            .is_err());
    }
}
