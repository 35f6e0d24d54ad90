//! 岗位导出 - 业务能力层
//!
//! 抓取结果写成 `{jobs, metadata:{exportedAt, totalCount, source}}` 的 JSON 文档，
//! 也可以原样读回，供后续的筛选、定制、申请使用。

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::JobPosting;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub exported_at: DateTime<Utc>,
    pub total_count: usize,
    /// 数据来源（平台名或 "merged"）
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub jobs: Vec<JobPosting>,
    pub metadata: ExportMetadata,
}

/// 导出岗位列表，目标目录不存在时自动创建
///
/// # 返回
/// 写入的文档（含元数据）
pub async fn export_postings(
    postings: &[JobPosting],
    path: &Path,
    source: &str,
) -> AppResult<ExportDocument> {
    let document = ExportDocument {
        jobs: postings.to_vec(),
        metadata: ExportMetadata {
            exported_at: Utc::now(),
            total_count: postings.len(),
            source: source.to_string(),
        },
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
    }

    let json = serde_json::to_string_pretty(&document)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

    info!("💾 已导出 {} 个岗位到 {}", document.metadata.total_count, path.display());
    Ok(document)
}

/// 读回导出文件
pub async fn load_export(path: &Path) -> AppResult<ExportDocument> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
    Ok(serde_json::from_str(&content)?)
}

/// 默认导出文件名：`jobs-<source>-<时间戳>.json`
pub fn export_file_name(dir: impl AsRef<Path>, source: &str, at: DateTime<Utc>) -> PathBuf {
    dir.as_ref()
        .join(format!("jobs-{}-{}.json", source, at.format("%Y%m%d-%H%M%S")))
}
