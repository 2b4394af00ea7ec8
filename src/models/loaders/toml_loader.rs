use crate::models::entry::TimesheetEntry;
use crate::models::profile::AutomationProfile;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 一个待导入的条目文件
#[derive(Debug, Clone, Deserialize)]
pub struct EntryFile {
    #[serde(default)]
    pub entries: Vec<TimesheetEntry>,
    #[serde(skip)]
    pub file_path: Option<String>,
}

/// 从 TOML 文件加载待导入的工时条目
pub async fn load_entry_file(toml_file_path: &Path) -> Result<EntryFile> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let mut file: EntryFile = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    file.file_path = Some(toml_file_path.to_string_lossy().to_string());

    Ok(file)
}

/// 从文件夹中加载所有 TOML 条目文件
///
/// 解析失败的文件只记录警告，不影响其他文件。
pub async fn load_all_entry_files(folder_path: &str) -> Result<Vec<EntryFile>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut paths = Vec::new();
    let mut dir = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(item) = dir.next_entry().await? {
        let path = item.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            paths.push(path);
        }
    }
    // 按文件名顺序导入，保证结果可复现
    paths.sort();

    let mut files = Vec::new();
    for path in paths {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_entry_file(&path).await {
            Ok(file) => {
                tracing::info!("成功加载 {} 条工时记录", file.entries.len());
                files.push(file);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(files)
}

/// 加载自动化配置；未指定路径时使用内置默认配置
pub async fn load_profile(path: Option<&Path>) -> Result<AutomationProfile> {
    let profile = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("无法读取自动化配置: {}", path.display()))?;
            toml::from_str::<AutomationProfile>(&content)
                .with_context(|| format!("无法解析自动化配置: {}", path.display()))?
        }
        None => AutomationProfile::default(),
    };

    profile.validate()?;
    Ok(profile)
}
