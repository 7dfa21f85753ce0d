//! 文档样式配置
//!
//! `StyleProfile` 是一个不可变的值，由配置层构造后传给样式统一、页码注入
//! 和图片插入三个服务，服务内部不再出现字体、字号等字面量。

use serde::Deserialize;

/// 字体三元组：字体、字号、是否加粗
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FontSpec {
    pub typeface: String,
    pub size_pt: f32,
    pub bold: bool,
}

impl FontSpec {
    pub fn new(typeface: impl Into<String>, size_pt: f32, bold: bool) -> Self {
        Self {
            typeface: typeface.into(),
            size_pt,
            bold,
        }
    }

    /// WordprocessingML 的字号单位是半磅
    pub fn half_points(&self) -> u32 {
        (self.size_pt * 2.0).round() as u32
    }
}

/// 页边距（厘米）
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PageMargins {
    pub top_cm: f64,
    pub bottom_cm: f64,
    pub left_cm: f64,
    pub right_cm: f64,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self {
            top_cm: 2.54,
            bottom_cm: 2.54,
            left_cm: 3.18,
            right_cm: 3.18,
        }
    }
}

/// 全局样式
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StyleProfile {
    /// 正文字体（楷体四号加粗）
    pub body: FontSpec,
    /// 图片标题字体（宋体小四）
    pub caption: FontSpec,
    /// 行距倍数
    pub line_spacing: f64,
    pub margins: PageMargins,
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self {
            body: FontSpec::new("楷体", 14.0, true),
            caption: FontSpec::new("宋体", 12.0, false),
            line_spacing: 1.5,
            margins: PageMargins::default(),
        }
    }
}

impl StyleProfile {
    /// 行距换算为 `w:spacing/@w:line`（单倍行距 = 240）
    pub fn line_spacing_value(&self) -> u32 {
        (self.line_spacing * 240.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_values() {
        let profile = StyleProfile::default();
        assert_eq!(profile.body.typeface, "楷体");
        assert_eq!(profile.body.half_points(), 28);
        assert!(profile.body.bold);
        assert_eq!(profile.line_spacing_value(), 360);
        assert_eq!(profile.margins.left_cm, 3.18);
    }
}
