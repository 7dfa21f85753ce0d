use std::fmt::{self, Display};

/// 从文档首行提取出的人物姓名
///
/// 已去除首尾空白，保证非空。不同文档之间可能重名。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersonName(String);

impl PersonName {
    /// 去除首尾空白后创建，空串返回 `None`
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_is_rejected() {
        assert!(PersonName::new("   ").is_none());
        assert_eq!(PersonName::new("  钱学森 ").unwrap().as_str(), "钱学森");
    }
}
