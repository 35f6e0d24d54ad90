use crate::models::tailored::TailoredOutput;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从单个文件加载定制内容（支持 .json / .toml）
pub async fn load_tailored_output(file_path: &Path) -> Result<TailoredOutput> {
    let content = fs::read_to_string(file_path)
        .await
        .with_context(|| format!("无法读取定制内容文件: {}", file_path.display()))?;

    let output: TailoredOutput = match file_path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("无法解析JSON文件: {}", file_path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("无法解析TOML文件: {}", file_path.display()))?,
        _ => anyhow::bail!("不支持的文件格式: {}", file_path.display()),
    };

    output
        .validate()
        .with_context(|| format!("定制内容不合法: {}", file_path.display()))?;

    Ok(output)
}

/// 从文件夹中加载所有定制内容，不合法的文件记录警告后跳过
pub async fn load_all_tailored_outputs(folder_path: &str) -> Result<Vec<TailoredOutput>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("json") | Some("toml")
        ) {
            paths.push(path);
        }
    }
    // read_dir 顺序不固定
    paths.sort();

    let mut outputs = Vec::new();
    for path in paths {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );
        match load_tailored_output(&path).await {
            Ok(output) => outputs.push(output),
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(outputs)
}
