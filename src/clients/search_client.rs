//! 图片搜索客户端
//!
//! 封装对外部图片搜索页面的请求；页面解析交给 `image_matcher`。

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use tracing::debug;

use crate::clients::image_matcher;
use crate::config::Config;
use crate::error::{ConfigError, NetworkError};

/// 图片搜索能力
///
/// 返回 `Ok(None)` 表示请求成功但页面中没有可用图片。
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Option<String>, NetworkError>;
}

/// 必应图片搜索
pub struct BingSearchProvider {
    client: Client,
    base_url: String,
}

impl BingSearchProvider {
    /// 按配置创建（浏览器请求头 + 搜索超时）
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .default_headers(browser_headers(&config.user_agent)?)
            .timeout(config.search_timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self::with_client(client, &config.search_base_url))
    }

    /// 使用自定义 HTTP 客户端创建
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self) -> String {
        format!("{}/images/search", self.base_url)
    }
}

#[async_trait]
impl SearchProvider for BingSearchProvider {
    async fn search(&self, query: &str) -> Result<Option<String>, NetworkError> {
        let url = self.search_url();
        debug!("图片搜索: {} | q={}", url, query);

        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("first", "1")])
            .send()
            .await
            .map_err(|source| NetworkError::RequestFailed {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::BadStatus {
                url,
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|source| NetworkError::RequestFailed {
                url: url.clone(),
                source,
            })?;
        debug!("搜索结果页长度: {} 字节", html.len());

        Ok(image_matcher::extract_image_url(&html))
    }
}

/// 模拟浏览器的请求头
pub fn browser_headers(user_agent: &str) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|e| ConfigError::InvalidHeader(format!("User-Agent: {}", e)))?,
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    Ok(headers)
}
