//! 文档存储 - 基础设施层
//!
//! 只负责"打开 / 保存一个 .docx"能力，不认识姓名、图片和样式规则。

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{AppError, AppResult, DocumentError};
use crate::infrastructure::document::handle::DocumentHandle;
use crate::infrastructure::document::package::Package;

/// 文档存储
///
/// 职责：
/// - 把磁盘上的文件解析为可编辑的 `DocumentHandle`
/// - 把句柄原子地写回磁盘
pub trait DocumentStore: Send + Sync {
    /// 打开文档；文件不存在返回 `NotFound`，格式错误返回 `DocumentError::Parse`
    fn open(&self, path: &Path) -> AppResult<DocumentHandle>;

    /// 保存文档；失败时目标文件保持原样
    fn save(&self, handle: DocumentHandle, path: &Path) -> AppResult<()>;
}

/// 基于 zip + XML 的 .docx 存储
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxStore;

impl DocxStore {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore for DocxStore {
    fn open(&self, path: &Path) -> AppResult<DocumentHandle> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::not_found(path),
            _ => AppError::io(path, e),
        })?;

        let package = Package::from_bytes(&bytes).map_err(|e| DocumentError::parse(path, e))?;
        let handle =
            DocumentHandle::from_package(path, package).map_err(|e| DocumentError::parse(path, e))?;
        debug!("已打开文档: {} ({} 字节)", path.display(), bytes.len());
        Ok(handle)
    }

    fn save(&self, handle: DocumentHandle, path: &Path) -> AppResult<()> {
        let bytes = handle
            .into_package()
            .and_then(|package| package.to_bytes())
            .map_err(|e| DocumentError::save(path, e))?;

        // 先写同目录临时文件再改名，写到一半失败不会破坏原文件
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| DocumentError::save(path, e))?;
        temp.write_all(&bytes)
            .and_then(|_| temp.flush())
            .map_err(|e| DocumentError::save(path, e))?;
        // 临时文件默认只有属主可读写，改名前沿用原文件的权限
        if let Ok(metadata) = std::fs::metadata(path) {
            temp.as_file()
                .set_permissions(metadata.permissions())
                .map_err(|e| DocumentError::save(path, e))?;
        }
        temp.persist(path)
            .map_err(|e| DocumentError::save(path, e.error))?;

        debug!("已保存文档: {} ({} 字节)", path.display(), bytes.len());
        Ok(())
    }
}
