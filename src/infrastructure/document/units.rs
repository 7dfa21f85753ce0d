//! 长度单位换算

/// 1 英寸 = 1440 缇（twip）
const TWIPS_PER_INCH: f64 = 1440.0;
const CM_PER_INCH: f64 = 2.54;
/// 1 厘米 = 360000 EMU
const EMU_PER_CM: f64 = 360_000.0;

pub fn cm_to_twips(cm: f64) -> i64 {
    (cm * TWIPS_PER_INCH / CM_PER_INCH).round() as i64
}

pub fn twips_to_cm(twips: i64) -> f64 {
    twips as f64 * CM_PER_INCH / TWIPS_PER_INCH
}

pub fn cm_to_emu(cm: f64) -> i64 {
    (cm * EMU_PER_CM).round() as i64
}

/// 像素宽度按 DPI 换算为厘米
pub fn px_to_cm(px: u32, dpi: f64) -> f64 {
    px as f64 * CM_PER_INCH / dpi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_conversions() {
        assert_eq!(cm_to_twips(2.54), 1440);
        assert_eq!(cm_to_twips(3.18), 1803);
        assert!((twips_to_cm(11906) - 21.0).abs() < 0.01);
    }

    #[test]
    fn test_emu_and_pixels() {
        assert_eq!(cm_to_emu(5.0), 1_800_000);
        assert!((px_to_cm(96, 96.0) - 2.54).abs() < 1e-9);
    }
}
