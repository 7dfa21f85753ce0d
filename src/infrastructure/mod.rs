//! 基础设施层（Infrastructure Layer）
//!
//! 持有文档存储能力，只暴露"打开 / 编辑 / 保存"，不认识任何业务规则。

pub mod document;

pub use document::{DocumentHandle, DocumentStore, DocxStore};
