//! 图片下载客户端
//!
//! 把响应体按块流式写入磁盘；任何失败都会删除写了一半的文件。

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::config::Config;
use crate::error::{ConfigError, NetworkError};

/// 写盘缓冲大小
const CHUNK_BUFFER_BYTES: usize = 8192;

/// 图片下载能力，返回写入的字节数
#[async_trait]
pub trait ImageDownloader: Send + Sync {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, NetworkError>;
}

/// 基于 reqwest 的下载器
pub struct HttpImageDownloader {
    client: Client,
}

impl HttpImageDownloader {
    /// 按配置创建（User-Agent + 下载超时）
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.download_timeout())
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    USER_AGENT,
                    config
                        .user_agent
                        .parse()
                        .map_err(|e| ConfigError::InvalidHeader(format!("User-Agent: {}", e)))?,
                );
                headers
            })
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn stream_to_file(
        &self,
        mut response: reqwest::Response,
        url: &str,
        dest: &Path,
    ) -> Result<u64, NetworkError> {
        let write_failed = |source| NetworkError::WriteFailed {
            path: dest.to_path_buf(),
            source,
        };

        let file = File::create(dest).await.map_err(write_failed)?;
        let mut writer = BufWriter::with_capacity(CHUNK_BUFFER_BYTES, file);
        let mut written = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| NetworkError::RequestFailed {
                url: url.to_string(),
                source,
            })?
        {
            writer.write_all(&chunk).await.map_err(write_failed)?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(write_failed)?;

        Ok(written)
    }
}

#[async_trait]
impl ImageDownloader for HttpImageDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, NetworkError> {
        debug!("下载图片: {} -> {}", url, dest.display());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| NetworkError::RequestFailed {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        match self.stream_to_file(response, url, dest).await {
            Ok(written) => Ok(written),
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloader() -> HttpImageDownloader {
        HttpImageDownloader::with_client(Client::builder().no_proxy().build().unwrap())
    }

    #[tokio::test]
    async fn test_download_writes_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/photo.jpg")
            .with_status(200)
            .with_body(vec![0xABu8; 20_000])
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("photo.jpg");
        let written = downloader()
            .download(&format!("{}/photo.jpg", server.url()), &dest)
            .await
            .unwrap();

        assert_eq!(written, 20_000);
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 20_000);
    }

    #[tokio::test]
    async fn test_bad_status_leaves_no_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.jpg")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing.jpg");
        let err = downloader()
            .download(&format!("{}/missing.jpg", server.url()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, NetworkError::BadStatus { status: 404, .. }));
        assert!(!dest.exists());
    }
}
