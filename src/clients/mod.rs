//! 客户端层：对外部 HTTP 服务的封装

pub mod download_client;
pub mod image_matcher;
pub mod search_client;

pub use download_client::{HttpImageDownloader, ImageDownloader};
pub use search_client::{BingSearchProvider, SearchProvider};
