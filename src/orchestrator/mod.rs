//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理整个文件夹)
//!     ↓
//! workflow::DocumentFlow (处理单个文档)
//!     ↓
//! services (能力层：样式 / 页码 / 姓名 / 图片 / 备份 / 报告)
//!     ↓
//! clients + infrastructure (HTTP 客户端、文档存储)
//! ```
//!
//! 编排层只做调度和统计，不做具体业务判断。

pub mod batch_processor;

pub use batch_processor::{list_documents, BatchProcessor};
