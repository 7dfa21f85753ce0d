//! 页码注入服务 - 业务能力层
//!
//! 在每一节的默认页脚中放入一个居中的 `PAGE` 域，由 Word 在显示和打印时计算页码。
//! 注入前先清空页脚中的段落，重复执行不会叠加多个域。

use tracing::debug;

use crate::error::DocumentError;
use crate::infrastructure::document::{DocumentHandle, XmlElement};
use crate::models::FontSpec;
use crate::services::style_normalizer::apply_font;

/// 页码注入服务
pub struct PageNumberInjector {
    font: FontSpec,
}

impl PageNumberInjector {
    /// `font` 与正文字体一致
    pub fn new(font: FontSpec) -> Self {
        Self { font }
    }

    /// 返回写入的页脚部件数量（链接到前一节的页脚只写一次）
    pub fn inject(&self, doc: &mut DocumentHandle) -> Result<usize, DocumentError> {
        let mut parts = doc.ensure_default_footers()?;
        parts.sort();
        parts.dedup();
        let mut written = 0;

        for part in &parts {
            let footer = doc
                .footer_mut(part)
                .ok_or_else(|| DocumentError::MissingPart(part.clone()))?;
            footer.remove_children("w:p");
            footer.push(page_number_paragraph(&self.font));
            written += 1;
        }

        debug!("页码已注入: {} 个页脚", written);
        Ok(written)
    }
}

/// 居中段落，内含一个 `PAGE` 域
fn page_number_paragraph(font: &FontSpec) -> XmlElement {
    let mut rpr = XmlElement::new("w:rPr");
    apply_font(&mut rpr, font);

    let run = XmlElement::new("w:r")
        .with_child(rpr)
        .with_child(XmlElement::new("w:fldChar").with_attr("w:fldCharType", "begin"))
        .with_child(
            XmlElement::new("w:instrText")
                .with_attr("xml:space", "preserve")
                .with_text("PAGE"),
        )
        .with_child(XmlElement::new("w:fldChar").with_attr("w:fldCharType", "end"));

    XmlElement::new("w:p")
        .with_child(
            XmlElement::new("w:pPr")
                .with_child(XmlElement::new("w:jc").with_attr("w:val", "center")),
        )
        .with_child(run)
}
