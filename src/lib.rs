//! # Word Batch
//!
//! Word 文档批量处理：统一字体与版式、插入动态页码、按首行姓名搜索并插入人物图片。
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/document` - .docx 的打开、编辑与原子保存
//! - `DocumentHandle` - 单个文档的独占可编辑视图
//!
//! ### ② 客户端层（Clients）
//! - `SearchProvider` / `BingSearchProvider` - 图片搜索
//! - `ImageDownloader` / `HttpImageDownloader` - 流式下载
//!
//! ### ③ 业务能力层（Services）
//! - `StyleNormalizer` - 字体、行距、页边距
//! - `PageNumberInjector` - 页脚 `PAGE` 域
//! - `extract_name` - 首行姓名提取
//! - `ImageResolver` / `ImageCompositor` - 图片搜索下载与插入
//! - `backup` / `ReportWriter` - 快照与错误报告
//!
//! ### ④ 流程层（Workflow）
//! - `DocumentCtx` - 上下文封装（序号 + 文件名）
//! - `DocumentFlow` - 流程编排（打开 → 样式 → 页码 → 姓名 → 图片 → 保存）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `BatchProcessor` - 扫描、备份、逐个处理、失败隔离、统计

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{DocumentHandle, DocumentStore, DocxStore};
pub use models::{BatchStatistics, ImageAsset, PersonName, ProcessingRecord, StyleProfile};
pub use orchestrator::BatchProcessor;
pub use services::ReportWriter;
pub use workflow::{DocumentCtx, DocumentFlow};
