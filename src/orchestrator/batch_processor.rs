//! 批量文档处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **扫描**：列出源文件夹中的 `.docx`（不递归，按文件名排序）
//! 2. **备份**：修改任何文档之前做一次快照
//! 3. **隔离**：逐个交给 `DocumentFlow`，单个文档的错误只写入它自己的记录
//! 4. **统计**：在两次文档处理之间累加 `BatchStatistics`
//! 5. **中断**：`CancellationToken` 被取消后不再开始新文档，进行中的文档不保存
//!
//! 严格串行：同一时刻只有一个文档句柄存在。

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError};
use crate::models::{BatchStatistics, ProcessingRecord};
use crate::services::backup;
use crate::utils::logging::{log_document_start, log_documents_found};
use crate::workflow::{DocumentCtx, DocumentFlow};

/// 待处理文档的扩展名
pub const DOCUMENT_EXTENSION: &str = "docx";
/// Word 打开文档时留下的锁文件前缀
const LOCK_FILE_PREFIX: &str = "~$";

/// 批量文档处理器
pub struct BatchProcessor {
    flow: DocumentFlow,
    enable_backup: bool,
    cancel: CancellationToken,
}

impl BatchProcessor {
    /// 按配置创建
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::with_flow(DocumentFlow::new(config)?, config.enable_backup))
    }

    /// 使用自定义流程创建
    pub fn with_flow(flow: DocumentFlow, enable_backup: bool) -> Self {
        Self {
            flow,
            enable_backup,
            cancel: CancellationToken::new(),
        }
    }

    /// 使用外部的取消令牌
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 取消令牌的副本，取消后批次在下一个检查点停止
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 处理整个文件夹
    ///
    /// 源文件夹不存在时直接返回 `NotFound`；之后的任何失败都只记录在对应文档上。
    pub async fn process_collection(
        &self,
        source: &Path,
        image_folder: &Path,
    ) -> AppResult<BatchStatistics> {
        let is_dir = tokio::fs::metadata(source)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(AppError::not_found(source));
        }

        let documents = list_documents(source).await?;
        log_documents_found(documents.len());

        let mut stats = BatchStatistics::default();

        // ========== 备份 ==========
        let mut snapshot = None;
        let mut backup_error = None;
        if self.enable_backup {
            match backup::create_snapshot(source, &documents).await {
                Ok(s) => {
                    stats.set_backup_location(s.folder.clone());
                    snapshot = Some(s);
                }
                Err(e) => {
                    error!("❌ 无法创建备份文件夹，本次不修改任何文档: {}", e);
                    backup_error = Some(format!("备份失败: {}", e));
                }
            }
        }

        // ========== 逐个处理 ==========
        let total = documents.len();
        for (i, path) in documents.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("⏹️ 收到中断信号，停止处理剩余 {} 个文档", total - i);
                stats.mark_interrupted();
                break;
            }

            let ctx = DocumentCtx::new(path, i + 1, total);
            let mut record = ProcessingRecord::new(ctx.filename.clone());
            log_document_start(&ctx);

            let skip_reason = backup_error.clone().or_else(|| {
                snapshot
                    .as_ref()
                    .and_then(|s| s.failure_for(&ctx.path))
                    .map(str::to_owned)
            });
            if let Some(reason) = skip_reason {
                error!("{} ❌ 未备份，跳过修改: {}", ctx, reason);
                record.push_error(reason);
                stats.fold(record);
                continue;
            }

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = self.flow.run(&ctx, image_folder, &mut record) => Some(result),
            };

            match outcome {
                None => {
                    warn!("{} ⏹️ 处理被中断，文档未保存", ctx);
                    record.push_error(AppError::Interrupted.to_string());
                    stats.fold(record);
                    stats.mark_interrupted();
                    break;
                }
                Some(Ok(())) => {
                    info!(
                        "{} ✅ 处理完成 (图片: {})",
                        ctx,
                        match (record.image_found, record.image_inserted) {
                            (true, true) => "已插入",
                            (true, false) => "找到但未插入",
                            _ => "无",
                        }
                    );
                }
                Some(Err(e)) => {
                    error!("{} ❌ 处理失败: {}", ctx, e);
                    record.push_error(e.to_string());
                }
            }
            stats.fold(record);
        }

        Ok(stats)
    }
}

/// 列出文件夹中的 `.docx` 文件（不递归，忽略 `~$` 锁文件，按文件名排序）
pub async fn list_documents(source: &Path) -> AppResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(source)
        .await
        .map_err(|e| AppError::io(source, e))?;

    let mut documents = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::io(source, e))?
    {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && is_document(&path) {
            documents.push(path);
        }
    }

    documents.sort();
    Ok(documents)
}

fn is_document(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(DOCUMENT_EXTENSION));
    let is_lock_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(LOCK_FILE_PREFIX));
    has_extension && !is_lock_file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_document() {
        assert!(is_document(Path::new("/a/钱学森.docx")));
        assert!(is_document(Path::new("/a/UPPER.DOCX")));
        assert!(!is_document(Path::new("/a/~$钱学森.docx")));
        assert!(!is_document(Path::new("/a/old.doc")));
        assert!(!is_document(Path::new("/a/notes.txt")));
    }

    #[tokio::test]
    async fn test_list_documents_is_flat_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.docx", "a.docx", "~$a.docx", "c.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("backup_20240101_000000")).unwrap();
        std::fs::write(dir.path().join("backup_20240101_000000").join("d.docx"), b"x").unwrap();

        let documents = list_documents(dir.path()).await.unwrap();
        let names: Vec<_> = documents
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.docx", "b.docx"]);
    }
}
