//! 备份服务 - 业务能力层
//!
//! 每次运行在修改任何文档之前做一次快照：把当时存在的所有文档原样复制到
//! 源文件夹下的 `backup_<时间戳>` 子文件夹中。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// 一次快照的结果
#[derive(Debug, Clone, Default)]
pub struct BackupSnapshot {
    pub folder: PathBuf,
    pub copied: Vec<PathBuf>,
    /// 复制失败的文档及原因；这些文档本次不会被修改
    pub failures: HashMap<PathBuf, String>,
}

impl BackupSnapshot {
    pub fn failure_for(&self, document: &Path) -> Option<&str> {
        self.failures.get(document).map(String::as_str)
    }
}

/// 备份文件夹名：`backup_20240131_235959`
pub fn backup_folder_name(now: DateTime<Local>) -> String {
    format!("backup_{}", now.format("%Y%m%d_%H%M%S"))
}

/// 把 `documents` 复制到 `source` 下新建的备份文件夹
///
/// 只有备份文件夹本身无法创建时返回错误；单个文件复制失败记录在快照里。
pub async fn create_snapshot(source: &Path, documents: &[PathBuf]) -> AppResult<BackupSnapshot> {
    let folder = source.join(backup_folder_name(Local::now()));
    tokio::fs::create_dir_all(&folder)
        .await
        .map_err(|e| AppError::io(&folder, e))?;

    let mut snapshot = BackupSnapshot {
        folder,
        ..Default::default()
    };

    for document in documents {
        let Some(file_name) = document.file_name() else {
            continue;
        };
        let target = snapshot.folder.join(file_name);
        match tokio::fs::copy(document, &target).await {
            Ok(_) => snapshot.copied.push(target),
            Err(e) => {
                let error = AppError::io(document, e);
                warn!("⚠️ 备份失败: {}", error);
                snapshot.failures.insert(document.clone(), format!("备份失败: {}", error));
            }
        }
    }

    info!(
        "💾 已备份 {}/{} 个文档到: {}",
        snapshot.copied.len(),
        documents.len(),
        snapshot.folder.display()
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_backup_folder_name() {
        let now = Local.with_ymd_and_hms(2024, 1, 31, 23, 59, 58).unwrap();
        assert_eq!(backup_folder_name(now), "backup_20240131_235958");
    }

    #[tokio::test]
    async fn test_snapshot_copies_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.docx");
        let b = dir.path().join("b.docx");
        std::fs::write(&a, b"first").unwrap();
        std::fs::write(&b, b"second").unwrap();

        let snapshot = tokio_test::assert_ok!(create_snapshot(dir.path(), &[a.clone(), b.clone()]).await);

        assert!(snapshot.folder.starts_with(dir.path()));
        assert_eq!(snapshot.copied.len(), 2);
        assert!(snapshot.failures.is_empty());
        assert_eq!(std::fs::read(snapshot.folder.join("a.docx")).unwrap(), b"first");
        assert_eq!(std::fs::read(snapshot.folder.join("b.docx")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_missing_document_is_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ghost = dir.path().join("ghost.docx");

        let snapshot = create_snapshot(dir.path(), &[ghost.clone()]).await.unwrap();

        assert!(snapshot.copied.is_empty());
        assert!(snapshot.failure_for(&ghost).unwrap().contains("ghost.docx"));
    }
}
