//! 图片插入服务 - 业务能力层
//!
//! 在正文末尾追加：空行、图片标题、居中的内嵌图片、空行。
//! 图片宽度按版心宽度计算，任何失败只返回 `false`，不向上传播。

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, ImageReader};
use tracing::{debug, warn};

use crate::error::DocumentError;
use crate::infrastructure::document::package::{DRAWINGML_NS, OFFICE_REL_NS, PICTURE_NS, WP_NS};
use crate::infrastructure::document::units::{cm_to_emu, px_to_cm};
use crate::infrastructure::document::{DocumentHandle, XmlElement};
use crate::models::FontSpec;
use crate::services::style_normalizer::apply_font;

/// 图片上方的标题
pub const CAPTION_LABEL: &str = "Person image:";
/// 图片最大宽度占版心宽度的比例
pub const MAX_WIDTH_RATIO: f64 = 0.7;
/// 读不到图片尺寸时使用的宽度比例
pub const FALLBACK_WIDTH_RATIO: f64 = 0.5;
/// 图片最小宽度（厘米）
pub const MIN_WIDTH_CM: f64 = 5.0;
/// 图片没有声明 DPI 时的默认值
pub const DEFAULT_DPI: f64 = 96.0;

/// 图片的像素尺寸和分辨率
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageProbe {
    pub width_px: u32,
    pub height_px: u32,
    pub dpi: f64,
    pub format: ImageFormat,
}

impl ImageProbe {
    pub fn natural_width_cm(&self) -> f64 {
        px_to_cm(self.width_px, self.dpi)
    }
}

/// 图片插入服务
pub struct ImageCompositor {
    caption_font: FontSpec,
}

impl ImageCompositor {
    pub fn new(caption_font: FontSpec) -> Self {
        Self { caption_font }
    }

    /// 把本地图片追加到文档末尾，返回是否成功
    pub async fn insert_image(&self, doc: &mut DocumentHandle, image_path: &Path) -> bool {
        let bytes = match tokio::fs::read(image_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("⚠️ 无法读取图片 {}: {}", image_path.display(), e);
                return false;
            }
        };

        match self.embed(doc, bytes) {
            Ok(()) => true,
            Err(e) => {
                warn!("⚠️ 图片插入失败 {}: {}", image_path.display(), e);
                false
            }
        }
    }

    fn embed(&self, doc: &mut DocumentHandle, bytes: Vec<u8>) -> Result<(), DocumentError> {
        // 无法识别格式的内容（例如防盗链返回的网页）不能当作图片插入
        let format = image::guess_format(&bytes)
            .map_err(|e| DocumentError::UnsupportedImage(e.to_string()))?;
        let (extension, content_type) = media_type(format)
            .ok_or_else(|| DocumentError::UnsupportedImage(format!("{:?}", format)))?;

        let usable_cm = doc.page_geometry().usable_width_cm();
        let probe = probe_image(&bytes);
        let width_cm = target_width_cm(probe.map(|p| p.natural_width_cm()), usable_cm);
        let height_cm = match probe {
            Some(p) if p.width_px > 0 => width_cm * f64::from(p.height_px) / f64::from(p.width_px),
            _ => width_cm * 4.0 / 3.0,
        };
        debug!(
            "图片尺寸: {:.2}cm x {:.2}cm (版心 {:.2}cm, 原始 {:?})",
            width_cm,
            height_cm,
            usable_cm,
            probe.map(|p| (p.width_px, p.height_px, p.dpi))
        );

        // 段落引用的关系 ID 先预留，段落全部追加成功后才把图片写进包里
        let rid = doc.next_relationship_id();
        let drawing_id = doc.next_drawing_id();
        doc.append_all_to_body(vec![
            XmlElement::new("w:p"),
            self.caption_paragraph(),
            picture_paragraph(
                &rid,
                drawing_id,
                cm_to_emu(width_cm),
                cm_to_emu(height_cm),
                extension,
            ),
            XmlElement::new("w:p"),
        ])?;
        doc.ensure_namespace("wp", WP_NS);
        doc.ensure_namespace("r", OFFICE_REL_NS);
        doc.add_image_part(bytes, extension, content_type);
        Ok(())
    }

    fn caption_paragraph(&self) -> XmlElement {
        let mut rpr = XmlElement::new("w:rPr");
        apply_font(&mut rpr, &self.caption_font);
        XmlElement::new("w:p").with_child(
            XmlElement::new("w:r").with_child(rpr).with_child(
                XmlElement::new("w:t")
                    .with_attr("xml:space", "preserve")
                    .with_text(CAPTION_LABEL),
            ),
        )
    }
}

/// 图片宽度：超过版心 70% 缩到 70%，小于 5cm 放到 5cm，读不到尺寸用版心的 50%
pub fn target_width_cm(natural_width_cm: Option<f64>, usable_width_cm: f64) -> f64 {
    let Some(natural) = natural_width_cm else {
        return usable_width_cm * FALLBACK_WIDTH_RATIO;
    };
    let max_width = usable_width_cm * MAX_WIDTH_RATIO;
    if natural > max_width {
        max_width
    } else if natural < MIN_WIDTH_CM {
        MIN_WIDTH_CM
    } else {
        natural
    }
}

/// 读取图片的格式、像素尺寸和 DPI
pub fn probe_image(bytes: &[u8]) -> Option<ImageProbe> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format().ok()?;
    let format = reader.format()?;
    let (width_px, height_px) = reader.into_dimensions().ok()?;
    Some(ImageProbe {
        width_px,
        height_px,
        dpi: read_dpi(bytes).unwrap_or(DEFAULT_DPI),
        format,
    })
}

/// 从 JFIF APP0 段或 PNG pHYs 块读取水平 DPI
pub fn read_dpi(bytes: &[u8]) -> Option<f64> {
    let dpi = if bytes.starts_with(&[0xFF, 0xD8]) {
        jfif_dpi(bytes)?
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        png_dpi(bytes)?
    } else {
        return None;
    };
    (dpi > 0.0).then_some(dpi)
}

fn jfif_dpi(bytes: &[u8]) -> Option<f64> {
    let mut pos = 2;
    while pos + 4 <= bytes.len() && bytes[pos] == 0xFF {
        let marker = bytes[pos + 1];
        let len = usize::from(u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]));
        let segment = bytes.get(pos + 4..pos + 2 + len)?;
        if marker == 0xE0 && segment.starts_with(b"JFIF\0") && segment.len() >= 12 {
            let units = segment[7];
            let density = f64::from(u16::from_be_bytes([segment[8], segment[9]]));
            return match units {
                1 => Some(density),
                2 => Some(density * 2.54),
                _ => None,
            };
        }
        // 扫描到图像数据就停止
        if marker == 0xDA {
            return None;
        }
        pos += 2 + len;
    }
    None
}

fn png_dpi(bytes: &[u8]) -> Option<f64> {
    let mut pos = 8;
    while pos + 8 <= bytes.len() {
        let len = u32::from_be_bytes(bytes[pos..pos + 4].try_into().ok()?) as usize;
        let kind = &bytes[pos + 4..pos + 8];
        let data = bytes.get(pos + 8..pos + 8 + len)?;
        match kind {
            b"pHYs" if data.len() >= 9 => {
                let ppu = f64::from(u32::from_be_bytes(data[0..4].try_into().ok()?));
                return (data[8] == 1).then_some(ppu * 0.0254);
            }
            b"IDAT" | b"IEND" => return None,
            _ => {}
        }
        pos += 12 + len;
    }
    None
}

fn media_type(format: ImageFormat) -> Option<(&'static str, &'static str)> {
    match format {
        ImageFormat::Jpeg => Some(("jpeg", "image/jpeg")),
        ImageFormat::Png => Some(("png", "image/png")),
        ImageFormat::Gif => Some(("gif", "image/gif")),
        ImageFormat::Bmp => Some(("bmp", "image/bmp")),
        ImageFormat::WebP => Some(("webp", "image/webp")),
        ImageFormat::Tiff => Some(("tiff", "image/tiff")),
        _ => None,
    }
}

fn picture_paragraph(rid: &str, id: u32, cx: i64, cy: i64, extension: &str) -> XmlElement {
    let name = format!("image{}.{}", id, extension);
    let extent = |tag: &str| {
        XmlElement::new(tag)
            .with_attr("cx", cx.to_string())
            .with_attr("cy", cy.to_string())
    };

    let picture = XmlElement::new("pic:pic")
        .with_attr("xmlns:pic", PICTURE_NS)
        .with_child(
            XmlElement::new("pic:nvPicPr")
                .with_child(
                    XmlElement::new("pic:cNvPr")
                        .with_attr("id", "0")
                        .with_attr("name", name.as_str()),
                )
                .with_child(XmlElement::new("pic:cNvPicPr")),
        )
        .with_child(
            XmlElement::new("pic:blipFill")
                .with_child(XmlElement::new("a:blip").with_attr("r:embed", rid))
                .with_child(XmlElement::new("a:stretch").with_child(XmlElement::new("a:fillRect"))),
        )
        .with_child(
            XmlElement::new("pic:spPr")
                .with_child(
                    XmlElement::new("a:xfrm")
                        .with_child(XmlElement::new("a:off").with_attr("x", "0").with_attr("y", "0"))
                        .with_child(extent("a:ext")),
                )
                .with_child(
                    XmlElement::new("a:prstGeom")
                        .with_attr("prst", "rect")
                        .with_child(XmlElement::new("a:avLst")),
                ),
        );

    let inline = XmlElement::new("wp:inline")
        .with_attr("distT", "0")
        .with_attr("distB", "0")
        .with_attr("distL", "0")
        .with_attr("distR", "0")
        .with_child(extent("wp:extent"))
        .with_child(
            XmlElement::new("wp:docPr")
                .with_attr("id", id.to_string())
                .with_attr("name", format!("Picture {}", id)),
        )
        .with_child(
            XmlElement::new("wp:cNvGraphicFramePr").with_child(
                XmlElement::new("a:graphicFrameLocks")
                    .with_attr("xmlns:a", DRAWINGML_NS)
                    .with_attr("noChangeAspect", "1"),
            ),
        )
        .with_child(
            XmlElement::new("a:graphic")
                .with_attr("xmlns:a", DRAWINGML_NS)
                .with_child(
                    XmlElement::new("a:graphicData")
                        .with_attr("uri", PICTURE_NS)
                        .with_child(picture),
                ),
        );

    XmlElement::new("w:p")
        .with_child(
            XmlElement::new("w:pPr")
                .with_child(XmlElement::new("w:jc").with_attr("w:val", "center")),
        )
        .with_child(
            XmlElement::new("w:r").with_child(XmlElement::new("w:drawing").with_child(inline)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::document::fixtures::DocxFixture;
    use crate::infrastructure::document::{paragraph_text, Package};
    use crate::models::StyleProfile;

    fn open(fixture: DocxFixture) -> DocumentHandle {
        let package = Package::from_bytes(&fixture.build()).unwrap();
        DocumentHandle::from_package("image.docx", package).unwrap()
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn test_width_policy() {
        let usable = 15.0;
        assert!((target_width_cm(Some(usable * 0.9), usable) - usable * 0.7).abs() < 1e-9);
        assert_eq!(target_width_cm(Some(3.0), usable), 5.0);
        assert_eq!(target_width_cm(Some(6.0), usable), 6.0);
        assert_eq!(target_width_cm(None, usable), 7.5);
    }

    #[test]
    fn test_probe_png_defaults_to_96_dpi() {
        let probe = probe_image(&png_bytes(96, 48)).unwrap();
        assert_eq!((probe.width_px, probe.height_px), (96, 48));
        assert_eq!(probe.format, ImageFormat::Png);
        assert_eq!(probe.dpi, DEFAULT_DPI);
        assert!((probe.natural_width_cm() - 2.54).abs() < 1e-9);
    }

    #[test]
    fn test_read_jfif_density() {
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        jpeg.extend_from_slice(b"JFIF\0");
        jpeg.extend_from_slice(&[0x01, 0x01, 0x01, 0x01, 0x2C, 0x01, 0x2C, 0x00, 0x00]);
        assert_eq!(read_dpi(&jpeg), Some(300.0));
    }

    #[test]
    fn test_unreadable_bytes_have_no_probe() {
        assert!(probe_image(b"<html>not an image</html>").is_none());
    }

    #[tokio::test]
    async fn test_insert_appends_caption_and_drawing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.png");
        std::fs::write(&path, png_bytes(300, 450)).unwrap();

        let mut doc = open(DocxFixture::new().paragraph("钱学森（Qian Xuesen）"));
        let compositor = ImageCompositor::new(StyleProfile::default().caption);
        assert!(compositor.insert_image(&mut doc, &path).await);

        let paragraphs = doc.paragraphs();
        assert_eq!(paragraphs.len(), 5);
        assert_eq!(paragraph_text(paragraphs[2]), CAPTION_LABEL);
        assert_eq!(paragraphs[3].count_descendants("w:drawing"), 1);
        assert_eq!(paragraphs[3].child("w:pPr").unwrap().child("w:jc").unwrap().attr("w:val"), Some("center"));

        let body = doc.body().unwrap();
        assert_eq!(body.elements().last().unwrap().name, "w:sectPr");

        // 300px @ 96dpi = 7.94cm，在 5cm 和 70% 版心之间
        let mut extent = None;
        paragraphs[3].for_each_descendant("wp:extent", &mut |e| extent = Some(e.clone()));
        let extent = extent.unwrap();
        assert_eq!(extent.attr("cx"), Some(cm_to_emu(300.0 * 2.54 / 96.0).to_string().as_str()));

        let package = doc.into_package().unwrap();
        assert!(package.contains("word/media/image1.png"));
    }

    #[tokio::test]
    async fn test_non_image_payload_is_not_inserted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocked.jpg");
        let page = format!("<html><body>403 Forbidden{}</body></html>", " ".repeat(5000));
        std::fs::write(&path, page).unwrap();

        let mut doc = open(DocxFixture::new().paragraph("钱学森"));
        let compositor = ImageCompositor::new(StyleProfile::default().caption);
        assert!(!compositor.insert_image(&mut doc, &path).await);
        assert_eq!(doc.paragraphs().len(), 1);

        let package = doc.into_package().unwrap();
        assert!(!package.part_names().any(|name| name.starts_with("word/media/")));
        let rels = String::from_utf8_lossy(package.part("word/_rels/document.xml.rels").unwrap()).into_owned();
        assert!(!rels.contains("/image"));
    }

    #[tokio::test]
    async fn test_known_format_without_dimensions_uses_half_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.png");
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend(vec![0u8; 5000]);
        std::fs::write(&path, bytes).unwrap();

        let mut doc = open(DocxFixture::new().paragraph("钱学森"));
        let usable = doc.page_geometry().usable_width_cm();
        let compositor = ImageCompositor::new(StyleProfile::default().caption);
        assert!(compositor.insert_image(&mut doc, &path).await);

        let mut extent = None;
        doc.paragraphs()[3].for_each_descendant("wp:extent", &mut |e| extent = Some(e.clone()));
        let extent = extent.unwrap();
        let expected = cm_to_emu(usable * FALLBACK_WIDTH_RATIO);
        assert_eq!(extent.attr("cx"), Some(expected.to_string().as_str()));
    }

    #[tokio::test]
    async fn test_picture_references_registered_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.png");
        std::fs::write(&path, png_bytes(300, 450)).unwrap();

        let mut doc = open(DocxFixture::new().paragraph("钱学森").with_footer("旧页脚"));
        let compositor = ImageCompositor::new(StyleProfile::default().caption);
        assert!(compositor.insert_image(&mut doc, &path).await);

        let mut embed = None;
        doc.paragraphs()[3].for_each_descendant("a:blip", &mut |b| {
            embed = b.attr("r:embed").map(str::to_owned)
        });
        let embed = embed.unwrap();

        let package = doc.into_package().unwrap();
        let rels = XmlElement::parse(package.part("word/_rels/document.xml.rels").unwrap()).unwrap();
        let target = rels
            .elements_named("Relationship")
            .find(|r| r.attr("Id") == Some(embed.as_str()))
            .and_then(|r| r.attr("Target"))
            .map(str::to_owned);
        assert_eq!(target.as_deref(), Some("media/image1.png"));
    }

    #[tokio::test]
    async fn test_missing_file_returns_false() {
        let mut doc = open(DocxFixture::new().paragraph("x"));
        let compositor = ImageCompositor::new(StyleProfile::default().caption);
        assert!(!compositor.insert_image(&mut doc, Path::new("/nonexistent/p.jpg")).await);
        assert_eq!(doc.paragraphs().len(), 1);
    }
}
