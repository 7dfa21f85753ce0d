//! 集成测试共用的构造器和替身
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use word_batch::clients::{ImageDownloader, SearchProvider};
use word_batch::error::NetworkError;
use word_batch::infrastructure::document::package::{
    CONTENT_TYPES_PART, OFFICE_REL_NS, PACKAGE_RELS_PART, PACKAGE_REL_NS,
    REL_TYPE_OFFICE_DOCUMENT, WORDML_NS,
};
use word_batch::infrastructure::document::{Package, XmlElement};
use word_batch::services::ImageResolver;
use word_batch::{DocumentFlow, DocxStore, StyleProfile};

/// 每个字符串一个段落的最小 .docx
pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let mut body = XmlElement::new("w:body");
    for text in paragraphs {
        body.push(
            XmlElement::new("w:p").with_child(
                XmlElement::new("w:r").with_child(
                    XmlElement::new("w:t")
                        .with_attr("xml:space", "preserve")
                        .with_text(*text),
                ),
            ),
        );
    }
    body.push(
        XmlElement::new("w:sectPr")
            .with_child(
                XmlElement::new("w:pgSz")
                    .with_attr("w:w", "11906")
                    .with_attr("w:h", "16838"),
            )
            .with_child(
                XmlElement::new("w:pgMar")
                    .with_attr("w:top", "1440")
                    .with_attr("w:right", "1800")
                    .with_attr("w:bottom", "1440")
                    .with_attr("w:left", "1800")
                    .with_attr("w:header", "851")
                    .with_attr("w:footer", "992")
                    .with_attr("w:gutter", "0"),
            ),
    );

    let document = XmlElement::new("w:document")
        .with_attr("xmlns:w", WORDML_NS)
        .with_attr("xmlns:r", OFFICE_REL_NS)
        .with_child(body);

    let content_types = XmlElement::new("Types")
        .with_attr("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")
        .with_child(
            XmlElement::new("Default")
                .with_attr("Extension", "rels")
                .with_attr("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        )
        .with_child(
            XmlElement::new("Default")
                .with_attr("Extension", "xml")
                .with_attr("ContentType", "application/xml"),
        )
        .with_child(
            XmlElement::new("Override")
                .with_attr("PartName", "/word/document.xml")
                .with_attr(
                    "ContentType",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
                ),
        );

    let package_rels = XmlElement::new("Relationships")
        .with_attr("xmlns", PACKAGE_REL_NS)
        .with_child(
            XmlElement::new("Relationship")
                .with_attr("Id", "rId1")
                .with_attr("Type", REL_TYPE_OFFICE_DOCUMENT)
                .with_attr("Target", "word/document.xml"),
        );

    let mut package = Package::default();
    package.set_part(CONTENT_TYPES_PART, content_types.to_bytes().unwrap());
    package.set_part(PACKAGE_RELS_PART, package_rels.to_bytes().unwrap());
    package.set_part("word/document.xml", document.to_bytes().unwrap());
    package.to_bytes().unwrap()
}

/// 带噪点的 PNG，保证压缩后仍大于下载校验阈值
pub fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let mut seed: u32 = 0x2545_F491;
    let img = image::RgbImage::from_fn(width, height, |_, _| {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let [r, g, b, _] = seed.to_le_bytes();
        image::Rgb([r, g, b])
    });
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// 读取保存后的文档中的某个部件
pub fn read_part(path: &Path, part: &str) -> Option<String> {
    let package = Package::from_bytes(&std::fs::read(path).unwrap()).unwrap();
    package
        .part(part)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

/// 按姓名返回固定地址的搜索替身
#[derive(Default)]
pub struct FakeSearch {
    urls: HashMap<String, String>,
}

impl FakeSearch {
    pub fn with(mut self, name: &str, url: &str) -> Self {
        self.urls.insert(name.to_string(), url.to_string());
        self
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str) -> Result<Option<String>, NetworkError> {
        Ok(self
            .urls
            .iter()
            .find(|(name, _)| query.starts_with(name.as_str()))
            .map(|(_, url)| url.clone()))
    }
}

/// 搜索时取消令牌并一直挂起的替身，模拟处理途中按下 Ctrl-C
pub struct CancellingSearch {
    token: CancellationToken,
}

impl CancellingSearch {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl SearchProvider for CancellingSearch {
    async fn search(&self, _query: &str) -> Result<Option<String>, NetworkError> {
        self.token.cancel();
        std::future::pending().await
    }
}

/// 把固定字节写到目标路径的下载替身
pub struct FakeDownloader {
    bytes: Vec<u8>,
}

impl FakeDownloader {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl ImageDownloader for FakeDownloader {
    async fn download(&self, _url: &str, dest: &Path) -> Result<u64, NetworkError> {
        tokio::fs::write(dest, &self.bytes)
            .await
            .map_err(|source| NetworkError::WriteFailed {
                path: dest.to_path_buf(),
                source,
            })?;
        Ok(self.bytes.len() as u64)
    }
}

/// 使用替身的文档流程
pub fn fake_flow(search: impl SearchProvider + 'static, image_bytes: Vec<u8>) -> DocumentFlow {
    let resolver = ImageResolver::new(
        Box::new(search),
        Box::new(FakeDownloader::new(image_bytes)),
        "portrait photo",
        2048,
    );
    DocumentFlow::with_components(Box::new(DocxStore::new()), resolver, StyleProfile::default())
}
