//! 错误报告服务 - 业务能力层
//!
//! 只负责"把失败记录写成报告文件"能力，不关心流程。

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::ProcessingRecord;

/// 错误报告写入服务
pub struct ReportWriter {
    report_path: PathBuf,
}

impl ReportWriter {
    /// 使用指定文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            report_path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.report_path
    }

    /// 写入报告；没有失败记录时不生成文件，返回 `None`
    pub async fn write(&self, failed: &[ProcessingRecord]) -> AppResult<Option<PathBuf>> {
        if failed.is_empty() {
            return Ok(None);
        }

        let content = render(failed, Local::now());
        debug!(
            "写入错误报告: {} | 失败文件数: {}",
            self.report_path.display(),
            failed.len()
        );

        if let Some(parent) = self.report_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::io(parent, e))?;
        }
        tokio::fs::write(&self.report_path, content)
            .await
            .map_err(|e| AppError::io(&self.report_path, e))?;

        Ok(Some(self.report_path.clone()))
    }
}

/// 报告正文：头部信息 + 每个失败文档一个编号条目
pub fn render(failed: &[ProcessingRecord], generated_at: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Word document batch processing error report");
    let _ = writeln!(out, "generated at: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "failed documents: {}", failed.len());
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out);

    for (i, record) in failed.iter().enumerate() {
        let _ = writeln!(out, "{}. filename: {}", i + 1, record.filename);
        if let Some(name) = &record.extracted_name {
            let _ = writeln!(out, "   extracted name: {}", name);
        }
        if !record.errors.is_empty() {
            let _ = writeln!(out, "   errors:");
            for error in &record.errors {
                let _ = writeln!(out, "     - {}", error);
            }
        }
        let _ = writeln!(out);
    }
    out
}
