//! 姓名提取服务 - 业务能力层
//!
//! 只看文档第一段，按"姓名（别名）"的书写习惯取括号前的部分。
//! 不符合该习惯的文档会得到截断后的首行文本，这是已知的局限。

use crate::infrastructure::document::{paragraph_text, DocumentHandle};
use crate::models::PersonName;

/// 没有括号时保留的最大字符数
pub const MAX_NAME_CHARS: usize = 50;

/// 从文档第一段提取姓名
pub fn extract_name(doc: &DocumentHandle) -> Option<PersonName> {
    let first = doc.paragraphs().into_iter().next()?;
    extract_name_from_line(&paragraph_text(first))
}

/// 从一行文本提取姓名
///
/// - 含半角 `(` 或全角 `（` 时取第一个括号之前的部分，并把连续空白压成一个空格
/// - 否则取整行的前 50 个字符
/// - 空行或只有空白返回 `None`
pub fn extract_name_from_line(line: &str) -> Option<PersonName> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match line.find(['(', '（']) {
        Some(pos) if pos > 0 => {
            let collapsed = line[..pos].split_whitespace().collect::<Vec<_>>().join(" ");
            PersonName::new(collapsed)
        }
        _ => PersonName::new(line.chars().take(MAX_NAME_CHARS).collect::<String>()),
    }
}
