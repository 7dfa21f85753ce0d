use std::path::{Path, PathBuf};

use thiserror::Error;

/// 应用程序错误类型
///
/// 除 `NotFound`（源文件夹不存在）外，所有错误都在单个文档的边界内被捕获，
/// 转成字符串写入该文档的 `ProcessingRecord.errors`，不会中断整个批次。
#[derive(Debug, Error)]
pub enum AppError {
    /// 路径不存在（源文件夹缺失时对整次运行致命）
    #[error("路径不存在: {}", .path.display())]
    NotFound { path: PathBuf },

    /// 文档解析 / 保存错误
    #[error("文档错误: {0}")]
    Document(#[from] DocumentError),

    /// 搜索或下载的网络错误
    #[error("网络错误: {0}")]
    Network(#[from] NetworkError),

    /// 下载内容校验失败
    #[error("校验失败: {0}")]
    Validation(#[from] ValidationError),

    /// 文件系统错误（备份、报告等）
    #[error("IO错误 ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 被外部信号中断
    #[error("处理被用户中断")]
    Interrupted,
}

/// 文档相关错误
#[derive(Debug, Error)]
pub enum DocumentError {
    /// 文档格式错误，无法打开
    #[error("无法解析文档 {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// zip 包读写失败
    #[error("文档包处理失败: {0}")]
    Package(String),

    /// 缺少必需的部件或元素
    #[error("缺少文档部件: {0}")]
    MissingPart(String),

    /// XML 读写失败
    #[error("XML处理失败: {0}")]
    Xml(String),

    /// 无法识别或不支持的图片数据
    #[error("不支持的图片数据: {0}")]
    UnsupportedImage(String),

    /// 保存失败
    #[error("保存文档失败 {}: {message}", .path.display())]
    Save { path: PathBuf, message: String },
}

/// 网络错误
#[derive(Debug, Error)]
pub enum NetworkError {
    /// 请求失败（连接、超时、读取响应体）
    #[error("请求失败 ({url}): {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// 非成功的 HTTP 状态码
    #[error("HTTP状态异常 ({url}): {status}")]
    BadStatus { url: String, status: u16 },

    /// 写入下载文件失败
    #[error("写入下载文件失败 ({}): {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 下载内容校验错误
#[derive(Debug, Error)]
pub enum ValidationError {
    /// 文件过小，视为无效图片
    #[error("图片文件过小 ({}): {size} 字节，至少需要超过 {min} 字节", .path.display())]
    TooSmall { path: PathBuf, size: u64, min: u64 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("无法读取配置文件 {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML 解析失败
    #[error("配置文件解析失败 {}: {source}", .path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// 请求头取值非法
    #[error("非法的请求头取值: {0}")]
    InvalidHeader(String),

    /// HTTP 客户端构建失败
    #[error("HTTP客户端构建失败: {0}")]
    HttpClient(String),
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建 IO 错误
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// 创建路径不存在错误
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        AppError::NotFound {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DocumentError {
    /// 把内部错误包装为带路径的解析错误
    pub fn parse(path: impl AsRef<Path>, source: impl std::fmt::Display) -> Self {
        DocumentError::Parse {
            path: path.as_ref().to_path_buf(),
            message: source.to_string(),
        }
    }

    /// 把内部错误包装为带路径的保存错误
    pub fn save(path: impl AsRef<Path>, source: impl std::fmt::Display) -> Self {
        DocumentError::Save {
            path: path.as_ref().to_path_buf(),
            message: source.to_string(),
        }
    }

    pub(crate) fn xml(source: impl std::fmt::Display) -> Self {
        DocumentError::Xml(source.to_string())
    }

    pub(crate) fn package(source: impl std::fmt::Display) -> Self {
        DocumentError::Package(source.to_string())
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
