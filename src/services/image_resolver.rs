//! 图片解析服务 - 业务能力层
//!
//! 姓名 → 搜索 → 下载 → 校验。网络和校验失败都只降级为"没有图片"，
//! 不会成为文档的错误。

use std::path::Path;

use tracing::{debug, info, warn};

use crate::clients::{BingSearchProvider, HttpImageDownloader, ImageDownloader, SearchProvider};
use crate::config::Config;
use crate::error::{ConfigError, ValidationError};
use crate::models::{ImageAsset, PersonName};

/// 保存图片时使用的扩展名
pub const IMAGE_EXTENSION: &str = "jpg";

/// 图片解析服务
pub struct ImageResolver {
    provider: Box<dyn SearchProvider>,
    downloader: Box<dyn ImageDownloader>,
    query_suffix: String,
    min_image_bytes: u64,
}

impl ImageResolver {
    pub fn new(
        provider: Box<dyn SearchProvider>,
        downloader: Box<dyn ImageDownloader>,
        query_suffix: impl Into<String>,
        min_image_bytes: u64,
    ) -> Self {
        Self {
            provider,
            downloader,
            query_suffix: query_suffix.into(),
            min_image_bytes,
        }
    }

    /// 使用必应搜索和 HTTP 下载器
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(
            Box::new(BingSearchProvider::new(config)?),
            Box::new(HttpImageDownloader::new(config)?),
            config.query_suffix.clone(),
            config.min_image_bytes,
        ))
    }

    /// 搜索关键词：姓名 + 限定词
    pub fn query_for(&self, name: &PersonName) -> String {
        let suffix = self.query_suffix.trim();
        if suffix.is_empty() {
            name.to_string()
        } else {
            format!("{} {}", name, suffix)
        }
    }

    /// 为姓名找到并下载一张图片
    pub async fn resolve(&self, name: &PersonName, image_dir: &Path) -> Option<ImageAsset> {
        let query = self.query_for(name);
        let url = match self.provider.search(&query).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                info!("🔍 未找到 {} 的图片", name);
                return None;
            }
            Err(e) => {
                warn!("⚠️ 图片搜索失败 ({}): {}", name, e);
                return None;
            }
        };
        debug!("找到图片地址: {}", url);

        let dest = image_dir.join(image_file_name(name));
        if let Err(e) = self.downloader.download(&url, &dest).await {
            warn!("⚠️ 图片下载失败 ({}): {}", name, e);
            return None;
        }

        match validate_download(&dest, self.min_image_bytes).await {
            Ok(size_bytes) => Some(ImageAsset {
                source_url: url,
                local_path: dest,
                size_bytes,
            }),
            Err(e) => {
                warn!("⚠️ {}", e);
                None
            }
        }
    }
}

/// 由姓名生成文件名：字母、数字、下划线、连字符和汉字保留，其余替换为下划线
pub fn image_file_name(name: &PersonName) -> String {
    let safe: String = name
        .as_str()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || ('\u{4e00}'..='\u{9fa5}').contains(&c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.{}", safe, IMAGE_EXTENSION)
}

/// 文件必须大于 `min_bytes`，否则删除并返回校验错误
pub async fn validate_download(path: &Path, min_bytes: u64) -> Result<u64, ValidationError> {
    let size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
    if size > min_bytes {
        return Ok(size);
    }

    let _ = tokio::fs::remove_file(path).await;
    Err(ValidationError::TooSmall {
        path: path.to_path_buf(),
        size,
        min: min_bytes,
    })
}
