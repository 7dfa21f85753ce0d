//! Word 文档（.docx）读写
//!
//! - `package` - zip 包，按原样保存所有部件
//! - `xml` - 可编辑 XML 树
//! - `handle` - 单个文档的可编辑视图（正文、样式、页脚、关系）
//! - `store` - 打开与原子保存

pub mod handle;
pub mod package;
pub mod schema;
pub mod store;
pub mod units;
pub mod xml;

pub use handle::{paragraph_text, DocumentHandle, PageGeometry};
pub use package::Package;
pub use store::{DocumentStore, DocxStore};
pub use xml::{XmlElement, XmlNode};
