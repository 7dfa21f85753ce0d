//! 业务能力层（Services）
//!
//! 每个服务只处理一个文档或一次请求，描述"我能做什么"，不关心流程顺序。

pub mod backup;
pub mod image_compositor;
pub mod image_resolver;
pub mod name_extractor;
pub mod page_number;
pub mod report_writer;
pub mod style_normalizer;

pub use backup::BackupSnapshot;
pub use image_compositor::ImageCompositor;
pub use image_resolver::ImageResolver;
pub use name_extractor::extract_name;
pub use page_number::PageNumberInjector;
pub use report_writer::ReportWriter;
pub use style_normalizer::StyleNormalizer;
