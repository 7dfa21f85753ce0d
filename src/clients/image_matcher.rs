//! 搜索结果页的图片链接提取
//!
//! 结果页先解析为 DOM，三种匹配方式按优先级组成一条短路链，
//! 第一个给出可用绝对地址的匹配器胜出。对页面结构的依赖都集中在这里。

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

static RE_RASTER_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|webp)").expect("valid extension regex"));
static RE_MURL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""murl"\s*:\s*"([^"]+)""#).expect("valid murl regex"));

/// 图片链接匹配器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMatcher {
    /// 带有指定 class 的主图 `<img>`
    MarkerClass(&'static str),
    /// `src` 指向常见位图扩展名的 `<img>`
    RasterSource,
    /// `class="iusc"` 的 `<a>`，其 `m` 属性是带 `murl` 键的 JSON
    MetadataAnchor,
}

/// 默认匹配链
pub const DEFAULT_CHAIN: [ImageMatcher; 3] = [
    ImageMatcher::MarkerClass("mimg"),
    ImageMatcher::RasterSource,
    ImageMatcher::MetadataAnchor,
];

impl ImageMatcher {
    /// 匹配器对应的 CSS 选择器
    pub fn selector(&self) -> String {
        match self {
            ImageMatcher::MarkerClass(class) => format!("img.{}", class),
            ImageMatcher::RasterSource => "img[src]".to_string(),
            ImageMatcher::MetadataAnchor => "a.iusc[m]".to_string(),
        }
    }

    /// 在文档中找第一个可用的图片地址
    pub fn find(&self, document: &Html) -> Option<String> {
        let Ok(selector) = Selector::parse(&self.selector()) else {
            return None;
        };
        document
            .select(&selector)
            .filter_map(|element| self.candidate(element))
            .find_map(|url| normalize_url(&url))
    }

    fn candidate(&self, element: ElementRef<'_>) -> Option<String> {
        match self {
            ImageMatcher::MarkerClass(_) => image_source(element).map(str::to_owned),
            ImageMatcher::RasterSource => {
                let src = element.value().attr("src")?;
                if RE_RASTER_EXT.is_match(src) {
                    image_source(element).map(str::to_owned)
                } else {
                    None
                }
            }
            ImageMatcher::MetadataAnchor => element.value().attr("m").and_then(murl_from_metadata),
        }
    }
}

/// 依次尝试默认匹配链
pub fn extract_image_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    DEFAULT_CHAIN
        .iter()
        .find_map(|matcher| matcher.find(&document))
}

/// `src` 优先，没有时取懒加载的 `data-src`
fn image_source(element: ElementRef<'_>) -> Option<&str> {
    let attrs = element.value();
    attrs
        .attr("src")
        .filter(|s| !s.trim().is_empty())
        .or_else(|| attrs.attr("data-src"))
}

/// 只接受 http(s) 绝对地址；协议相对地址补成 https
pub fn normalize_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url.to_string())
    } else if url.starts_with("//") {
        Some(format!("https:{}", url))
    } else {
        None
    }
}

fn murl_from_metadata(metadata: &str) -> Option<String> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(metadata) {
        if let Some(Value::String(murl)) = map.get("murl") {
            return Some(murl.clone());
        }
    }
    RE_MURL
        .captures(metadata)
        .map(|caps| caps[1].replace("\\/", "/"))
}
