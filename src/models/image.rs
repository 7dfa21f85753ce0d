//! 图片资源模型

use std::path::PathBuf;

/// 已下载并通过校验的图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// 图片来源 URL
    pub source_url: String,
    /// 本地保存路径
    pub local_path: PathBuf,
    /// 文件大小（字节），总是大于最小阈值
    pub size_bytes: u64,
}
