//! OOXML 包（zip）读写
//!
//! 按原始顺序保存所有部件的字节，只有被修改的部件会在保存前被替换。

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use crate::error::DocumentError;
use crate::infrastructure::document::xml::XmlElement;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";
pub const DEFAULT_MAIN_PART: &str = "word/document.xml";

pub const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const OFFICE_REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub const DRAWINGML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const PICTURE_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

pub const REL_TYPE_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_TYPE_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
pub const REL_TYPE_FOOTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
pub const REL_TYPE_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

pub const CT_STYLES: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
pub const CT_FOOTER: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";

/// 单个 zip 条目解压后的大小上限（防 zip 炸弹）
const MAX_PART_BYTES: u64 = 100 * 1024 * 1024;

/// 文档包
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    /// 从 zip 字节读取全部部件
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(DocumentError::package)?;
        let mut parts = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let entry = archive.by_index(i).map_err(DocumentError::package)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry
                .take(MAX_PART_BYTES)
                .read_to_end(&mut data)
                .map_err(DocumentError::package)?;
            if data.len() as u64 >= MAX_PART_BYTES {
                return Err(DocumentError::Package(format!(
                    "部件 {} 超过大小限制 ({} 字节)",
                    name, MAX_PART_BYTES
                )));
            }
            parts.push((name, data));
        }

        Ok(Self { parts })
    }

    /// 写出 zip 字节：图片原样存储，其他部件压缩
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in &self.parts {
            let method = if name.starts_with("word/media/") {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let options = SimpleFileOptions::default().compression_method(method);
            zip.start_file(name.as_str(), options)
                .map_err(DocumentError::package)?;
            zip.write_all(data).map_err(DocumentError::package)?;
        }

        let cursor = zip.finish().map_err(DocumentError::package)?;
        Ok(cursor.into_inner())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    pub fn require(&self, name: &str) -> Result<&[u8], DocumentError> {
        self.part(name)
            .ok_or_else(|| DocumentError::MissingPart(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    /// 替换已有部件，或追加新部件
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = data,
            None => self.parts.push((name.to_string(), data)),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    /// 通过包级关系找到主文档部件
    pub fn main_document_part(&self) -> Result<String, DocumentError> {
        let Some(bytes) = self.part(PACKAGE_RELS_PART) else {
            return Ok(DEFAULT_MAIN_PART.to_string());
        };
        let rels = XmlElement::parse(bytes)?;
        let target = rels
            .elements_named("Relationship")
            .find(|r| r.attr("Type") == Some(REL_TYPE_OFFICE_DOCUMENT))
            .and_then(|r| r.attr("Target"));
        Ok(match target {
            Some(target) => resolve_target("", target),
            None => DEFAULT_MAIN_PART.to_string(),
        })
    }
}

/// 部件对应的关系部件，例如 `word/document.xml` → `word/_rels/document.xml.rels`
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// 部件所在目录（不含结尾的 `/`）
pub fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// 把关系中的 Target 解析为包内部件名
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// 空的关系部件
pub fn empty_relationships() -> XmlElement {
    XmlElement::new("Relationships").with_attr("xmlns", PACKAGE_REL_NS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rels_part_for() {
        assert_eq!(rels_part_for("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(rels_part_for("document.xml"), "_rels/document.xml.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("word", "footer1.xml"), "word/footer1.xml");
        assert_eq!(resolve_target("word", "/word/media/a.png"), "word/media/a.png");
        assert_eq!(resolve_target("word", "../customXml/item1.xml"), "customXml/item1.xml");
        assert_eq!(resolve_target("", "word/document.xml"), "word/document.xml");
    }

    #[test]
    fn test_invalid_zip_is_package_error() {
        let err = Package::from_bytes(b"not a zip").unwrap_err();
        assert!(matches!(err, DocumentError::Package(_)));
    }

    #[test]
    fn test_parts_survive_zip_round_trip() {
        let mut package = Package::default();
        package.set_part("word/document.xml", b"<w:document/>".to_vec());
        package.set_part("word/media/image1.png", vec![7u8; 4096]);

        let reread = Package::from_bytes(&package.to_bytes().unwrap()).unwrap();
        assert_eq!(reread.part("word/document.xml"), Some(&b"<w:document/>"[..]));
        assert_eq!(reread.part("word/media/image1.png").map(<[u8]>::len), Some(4096));
        assert_eq!(reread.part_names().count(), 2);
    }
}
