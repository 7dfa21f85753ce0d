//! 文档处理上下文
//!
//! 封装"我正在处理第几个文档、是哪个文件"这一信息

use std::fmt::Display;
use std::path::PathBuf;

/// 文档处理上下文
#[derive(Debug, Clone)]
pub struct DocumentCtx {
    /// 文档路径
    pub path: PathBuf,

    /// 文件名（用于记录和报告）
    pub filename: String,

    /// 文档序号（从1开始，仅用于日志显示）
    pub index: usize,

    /// 本批次文档总数
    pub total: usize,
}

impl DocumentCtx {
    pub fn new(path: PathBuf, index: usize, total: usize) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            filename,
            index,
            total,
        }
    }
}

impl Display for DocumentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[文档 {}/{} {}]", self.index, self.total, self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefix() {
        let ctx = DocumentCtx::new(PathBuf::from("/data/docs/钱学森.docx"), 2, 5);
        assert_eq!(ctx.filename, "钱学森.docx");
        assert_eq!(ctx.to_string(), "[文档 2/5 钱学森.docx]");
    }
}
