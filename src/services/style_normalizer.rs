//! 样式统一服务 - 业务能力层
//!
//! 把整篇文档改写为 `StyleProfile` 规定的字体、行距和页边距。
//! 这是覆盖而不是合并：run 上原有的字体设置会被整体替换。

use tracing::debug;

use crate::error::DocumentError;
use crate::infrastructure::document::schema::{PPR_ORDER, RPR_ORDER, SECTPR_ORDER, STYLE_ORDER};
use crate::infrastructure::document::units::cm_to_twips;
use crate::infrastructure::document::{DocumentHandle, XmlElement};
use crate::models::{FontSpec, PageMargins, StyleProfile};

/// 新建 `w:pgMar` 时页眉 / 页脚距离的默认值（缇）
const DEFAULT_HEADER_FOOTER_TWIPS: &str = "720";

/// 样式统一服务
pub struct StyleNormalizer {
    profile: StyleProfile,
}

impl StyleNormalizer {
    pub fn new(profile: StyleProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &StyleProfile {
        &self.profile
    }

    /// 统一默认样式、页边距和所有段落（包括表格中的段落）
    pub fn normalize(&self, doc: &mut DocumentHandle) -> Result<(), DocumentError> {
        apply_font(normal_style_rpr(doc.styles_mut()), &self.profile.body);

        let mut sections = 0;
        doc.for_each_section_mut(&mut |section| {
            apply_margins(section, &self.profile.margins);
            sections += 1;
        })?;

        let line = self.profile.line_spacing_value().to_string();
        let mut paragraphs = 0;
        doc.for_each_paragraph_mut(&mut |paragraph| {
            normalize_paragraph(paragraph, &self.profile.body, &line);
            paragraphs += 1;
        })?;

        debug!("样式已统一: {} 个节, {} 个段落", sections, paragraphs);
        Ok(())
    }
}

/// 用字体三元组整体替换 run 属性中的字体、粗细和字号
pub fn apply_font(rpr: &mut XmlElement, font: &FontSpec) {
    rpr.set_child_ordered(
        XmlElement::new("w:rFonts")
            .with_attr("w:ascii", font.typeface.as_str())
            .with_attr("w:hAnsi", font.typeface.as_str())
            .with_attr("w:eastAsia", font.typeface.as_str())
            .with_attr("w:cs", font.typeface.as_str()),
        RPR_ORDER,
    );

    for tag in ["w:b", "w:bCs"] {
        let mut element = XmlElement::new(tag);
        if !font.bold {
            element.set_attr("w:val", "0");
        }
        rpr.set_child_ordered(element, RPR_ORDER);
    }

    let size = font.half_points().to_string();
    for tag in ["w:sz", "w:szCs"] {
        rpr.set_child_ordered(XmlElement::new(tag).with_attr("w:val", size.as_str()), RPR_ORDER);
    }
}

/// 默认段落样式（Normal）的 `w:rPr`，样式不存在时创建
fn normal_style_rpr(styles: &mut XmlElement) -> &mut XmlElement {
    let is_normal = |e: &XmlElement| {
        e.name == "w:style"
            && e.attr("w:type") == Some("paragraph")
            && (e.attr("w:default") == Some("1") || e.attr("w:styleId") == Some("Normal"))
    };

    if !styles.elements().any(is_normal) {
        styles.push(
            XmlElement::new("w:style")
                .with_attr("w:type", "paragraph")
                .with_attr("w:default", "1")
                .with_attr("w:styleId", "Normal")
                .with_child(XmlElement::new("w:name").with_attr("w:val", "Normal")),
        );
    }

    let style = styles
        .elements_mut()
        .find(|e| is_normal(e))
        .unwrap_or_else(|| unreachable!("Normal style is inserted above"));
    style.get_or_insert_ordered("w:rPr", STYLE_ORDER)
}

fn apply_margins(section: &mut XmlElement, margins: &PageMargins) {
    let pg_mar = section.get_or_insert_ordered("w:pgMar", SECTPR_ORDER);
    pg_mar.set_attr("w:top", cm_to_twips(margins.top_cm).to_string());
    pg_mar.set_attr("w:right", cm_to_twips(margins.right_cm).to_string());
    pg_mar.set_attr("w:bottom", cm_to_twips(margins.bottom_cm).to_string());
    pg_mar.set_attr("w:left", cm_to_twips(margins.left_cm).to_string());
    for (key, default) in [
        ("w:header", DEFAULT_HEADER_FOOTER_TWIPS),
        ("w:footer", DEFAULT_HEADER_FOOTER_TWIPS),
        ("w:gutter", "0"),
    ] {
        if pg_mar.attr(key).is_none() {
            pg_mar.set_attr(key, default);
        }
    }
}

fn normalize_paragraph(paragraph: &mut XmlElement, font: &FontSpec, line: &str) {
    let spacing = paragraph
        .get_or_insert_first("w:pPr")
        .get_or_insert_ordered("w:spacing", PPR_ORDER);
    spacing.set_attr("w:line", line);
    spacing.set_attr("w:lineRule", "auto");

    paragraph.for_each_descendant_mut("w:r", &mut |run| {
        apply_font(run.get_or_insert_first("w:rPr"), font);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::document::fixtures::DocxFixture;
    use crate::infrastructure::document::Package;

    fn open(fixture: DocxFixture) -> DocumentHandle {
        let package = Package::from_bytes(&fixture.build()).unwrap();
        DocumentHandle::from_package("style.docx", package).unwrap()
    }

    fn normalizer() -> StyleNormalizer {
        StyleNormalizer::new(StyleProfile::default())
    }

    fn all_runs(doc: &DocumentHandle) -> Vec<XmlElement> {
        let mut runs = Vec::new();
        doc.body()
            .unwrap()
            .for_each_descendant("w:r", &mut |r| runs.push(r.clone()));
        runs
    }

    #[test]
    fn test_runs_in_body_and_tables_get_body_font() {
        let mut doc = open(
            DocxFixture::new()
                .paragraph_runs(&["张三", "（教授）"])
                .table_cell("表格内容"),
        );
        normalizer().normalize(&mut doc).unwrap();

        let runs = all_runs(&doc);
        assert_eq!(runs.len(), 3);
        for run in &runs {
            let rpr = run.child("w:rPr").expect("run properties");
            assert_eq!(run.elements().next().unwrap().name, "w:rPr");
            let fonts = rpr.child("w:rFonts").unwrap();
            assert_eq!(fonts.attr("w:eastAsia"), Some("楷体"));
            assert_eq!(fonts.attr("w:ascii"), Some("楷体"));
            assert!(rpr.child("w:b").unwrap().attr("w:val").is_none());
            assert_eq!(rpr.child("w:sz").unwrap().attr("w:val"), Some("28"));
        }
    }

    #[test]
    fn test_existing_run_fonts_are_replaced() {
        let mut doc = open(DocxFixture::new().paragraph("x"));
        doc.for_each_paragraph_mut(&mut |p| {
            p.for_each_descendant_mut("w:r", &mut |r| {
                r.get_or_insert_first("w:rPr").push(
                    XmlElement::new("w:rFonts").with_attr("w:asciiTheme", "minorHAnsi"),
                );
            });
        })
        .unwrap();

        normalizer().normalize(&mut doc).unwrap();

        let runs = all_runs(&doc);
        let rpr = runs[0].child("w:rPr").unwrap();
        assert_eq!(rpr.elements_named("w:rFonts").count(), 1);
        assert_eq!(rpr.child("w:rFonts").unwrap().attr("w:asciiTheme"), None);
    }

    #[test]
    fn test_line_spacing_and_margins() {
        let mut doc = open(DocxFixture::new().paragraph("正文").section_break("上一节"));
        normalizer().normalize(&mut doc).unwrap();

        for paragraph in doc.paragraphs() {
            let ppr = paragraph.child("w:pPr").unwrap();
            let spacing = ppr.child("w:spacing").unwrap();
            assert_eq!(spacing.attr("w:line"), Some("360"));
            assert_eq!(spacing.attr("w:lineRule"), Some("auto"));
        }

        let mut margins = Vec::new();
        doc.body().unwrap().for_each_descendant("w:sectPr", &mut |s| {
            margins.push(s.child("w:pgMar").unwrap().clone());
        });
        assert_eq!(margins.len(), 2);
        for pg_mar in margins {
            assert_eq!(pg_mar.attr("w:top"), Some("1440"));
            assert_eq!(pg_mar.attr("w:left"), Some("1803"));
            assert_eq!(pg_mar.attr("w:footer"), Some("992"));
        }
    }

    #[test]
    fn test_section_break_keeps_ppr_order() {
        let mut doc = open(DocxFixture::new().section_break("上一节"));
        normalizer().normalize(&mut doc).unwrap();

        let paragraph = doc.paragraphs()[0];
        let names: Vec<&str> = paragraph
            .child("w:pPr")
            .unwrap()
            .elements()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, ["w:spacing", "w:sectPr"]);
    }

    #[test]
    fn test_normal_style_created_or_updated() {
        let mut plain = open(DocxFixture::new().paragraph("x"));
        normalizer().normalize(&mut plain).unwrap();
        let rpr = normal_style_rpr(plain.styles_mut()).clone();
        assert_eq!(rpr.child("w:rFonts").unwrap().attr("w:hAnsi"), Some("楷体"));

        let mut styled = open(DocxFixture::new().paragraph("x").with_styles());
        normalizer().normalize(&mut styled).unwrap();
        let styles = styled.styles_mut();
        assert_eq!(styles.elements_named("w:style").count(), 1);
        let style = styles.child("w:style").unwrap();
        let names: Vec<&str> = style.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["w:name", "w:qFormat", "w:rPr"]);
        let fonts = style.child("w:rPr").unwrap().child("w:rFonts").unwrap();
        assert_eq!(fonts.attr("w:asciiTheme"), None);
        assert_eq!(fonts.attr("w:eastAsia"), Some("楷体"));
    }

    #[test]
    fn test_non_bold_font_writes_explicit_off() {
        let mut rpr = XmlElement::new("w:rPr").with_child(XmlElement::new("w:b"));
        apply_font(&mut rpr, &FontSpec::new("宋体", 12.0, false));
        assert_eq!(rpr.child("w:b").unwrap().attr("w:val"), Some("0"));
        assert_eq!(rpr.child("w:sz").unwrap().attr("w:val"), Some("24"));
    }
}
