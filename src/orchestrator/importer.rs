//! 条目导入
//!
//! 每个 TOML 文件作为一个批次写入存储：重复记录跳过，
//! 任何一行校验失败或违反约束则整个文件都不写入。

use anyhow::Result;
use tracing::{info, warn};

use crate::models::load_all_entry_files;
use crate::store::Store;

/// 导入统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub files: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// 因约束冲突整体回滚的文件
    pub rejected_files: Vec<String>,
}

/// 导入文件夹中所有条目文件
pub async fn import_folder(store: &Store, folder: &str) -> Result<ImportSummary> {
    info!("\n📁 正在扫描待导入的条目文件: {}", folder);
    let files = load_all_entry_files(folder).await?;

    let mut summary = ImportSummary {
        files: files.len(),
        ..Default::default()
    };

    for file in files {
        let name = file.file_path.clone().unwrap_or_default();

        let mut invalid = 0;
        for (i, entry) in file.entries.iter().enumerate() {
            if let Err(msg) = entry.validate() {
                warn!("{} 第 {} 行无效: {}", name, i + 1, msg);
                invalid += 1;
            }
        }
        if invalid > 0 {
            warn!("⚠️ {} 有 {} 行无效，整个文件未导入", name, invalid);
            summary.rejected_files.push(name);
            continue;
        }

        let result = store.insert_entries(&file.entries)?;
        summary.duplicates += result.duplicates;
        if result.success {
            summary.inserted += result.inserted;
            info!(
                "✓ {}: 新增 {} 条，重复 {} 条",
                name, result.inserted, result.duplicates
            );
        } else {
            for err in &result.errors {
                warn!("{}: {}", name, err.message);
            }
            warn!("⚠️ {} 存在无效记录，整个文件未导入", name);
            summary.rejected_files.push(name);
        }
    }

    info!(
        "📥 导入完成: {} 个文件，新增 {} 条，重复 {} 条，拒绝 {} 个文件",
        summary.files,
        summary.inserted,
        summary.duplicates,
        summary.rejected_files.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_import_folder() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("import");
        fs::create_dir(&folder).unwrap();

        fs::write(
            folder.join("a.toml"),
            r#"
            [[entries]]
            date = "2025-08-01"
            time_in = "09:00"
            time_out = "10:00"
            project = "P"
            description = "T"

            [[entries]]
            date = "2025-08-01"
            time_in = "09:00"
            time_out = "10:30"
            project = "P"
            description = "T"
            "#,
        )
        .unwrap();
        fs::write(
            folder.join("b.toml"),
            r#"
            [[entries]]
            date = "2025-08-02"
            time_in = "09:00"
            time_out = "10:00"
            project = "P"
            description = "T"

            [[entries]]
            date = "2025-08-02"
            time_in = 541
            time_out = 600
            project = "P"
            description = "Other"
            "#,
        )
        .unwrap();

        let store = Store::open(dir.path().join("t.db")).unwrap();
        let summary = import_folder(&store, folder.to_str().unwrap()).await.unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.rejected_files.len(), 1);
        assert!(summary.rejected_files[0].ends_with("b.toml"));
        assert_eq!(store.load_pending().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_rows_reject_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("import");
        fs::create_dir(&folder).unwrap();

        fs::write(
            folder.join("bad.toml"),
            r#"
            [[entries]]
            date = "2025-08-03"
            time_in = "09:00"
            time_out = "10:00"
            project = "P"
            description = "T"

            [[entries]]
            date = "2025-8-1"
            time_in = "09:00"
            time_out = "10:00"
            project = ""
            description = "T"
            "#,
        )
        .unwrap();

        let store = Store::open(dir.path().join("t.db")).unwrap();
        let summary = import_folder(&store, folder.to_str().unwrap()).await.unwrap();

        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.rejected_files.len(), 1);
        assert!(store.load_pending().unwrap().is_empty());
    }
}
