use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::StyleProfile;

/// 配置文件路径的环境变量
pub const CONFIG_FILE_ENV: &str = "WORD_BATCH_CONFIG";
/// 未指定时在工作目录中查找的配置文件
pub const DEFAULT_CONFIG_FILE: &str = "word_batch.toml";
/// 错误报告的默认文件名
pub const DEFAULT_REPORT_NAME: &str = "processing_error_report.txt";

/// 程序配置
///
/// 加载顺序：默认值 → TOML 配置文件 → 环境变量
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 待处理文档所在文件夹
    pub source_folder: PathBuf,
    /// 人物图片保存文件夹
    pub image_folder: PathBuf,
    /// 错误报告路径（不设置时放在源文件夹旁边）
    pub report_path: Option<PathBuf>,
    /// 处理前是否备份原始文档
    pub enable_backup: bool,
    // --- 图片搜索 ---
    pub search_base_url: String,
    /// 拼接在姓名后面的搜索限定词
    pub query_suffix: String,
    pub search_timeout_secs: u64,
    pub download_timeout_secs: u64,
    /// 图片文件大小必须超过此值（字节）
    pub min_image_bytes: u64,
    pub user_agent: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 统一样式
    pub style: StyleProfile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::from("documents"),
            image_folder: PathBuf::from("person_images"),
            report_path: None,
            enable_backup: true,
            search_base_url: "https://www.bing.com".to_string(),
            query_suffix: "portrait photo".to_string(),
            search_timeout_secs: 15,
            download_timeout_secs: 20,
            min_image_bytes: 2048,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            verbose_logging: false,
            style: StyleProfile::default(),
        }
    }
}

impl Config {
    /// 按 默认值 → 配置文件 → 环境变量 的顺序加载
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var(CONFIG_FILE_ENV)
            .map(PathBuf::from)
            .ok()
            .or_else(|| {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            });

        let base = match file {
            Some(path) => Self::from_toml_file(&path)?,
            None => Self::default(),
        };

        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件加载，缺失的键取默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 仅使用默认值和环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(self) -> Self {
        Self {
            source_folder: env_or("SOURCE_FOLDER", self.source_folder),
            image_folder: env_or("IMAGE_FOLDER", self.image_folder),
            report_path: std::env::var("REPORT_PATH").ok().map(PathBuf::from).or(self.report_path),
            enable_backup: env_or("ENABLE_BACKUP", self.enable_backup),
            search_base_url: env_or("SEARCH_BASE_URL", self.search_base_url),
            query_suffix: env_or("QUERY_SUFFIX", self.query_suffix),
            search_timeout_secs: env_or("SEARCH_TIMEOUT_SECS", self.search_timeout_secs),
            download_timeout_secs: env_or("DOWNLOAD_TIMEOUT_SECS", self.download_timeout_secs),
            min_image_bytes: env_or("MIN_IMAGE_BYTES", self.min_image_bytes),
            user_agent: env_or("USER_AGENT", self.user_agent),
            verbose_logging: env_or("VERBOSE_LOGGING", self.verbose_logging),
            style: self.style,
        }
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// 错误报告路径，未配置时放在源文件夹的上一级目录
    pub fn report_path(&self) -> PathBuf {
        if let Some(path) = &self.report_path {
            return path.clone();
        }
        self.source_folder
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.join(DEFAULT_REPORT_NAME))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_NAME))
    }
}

/// 读取并解析环境变量，不存在或无法解析时返回默认值
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = Config::default();
        assert!(config.enable_backup);
        assert_eq!(config.search_timeout(), Duration::from_secs(15));
        assert_eq!(config.download_timeout(), Duration::from_secs(20));
        assert_eq!(config.min_image_bytes, 2048);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("word_batch.toml");
        std::fs::write(
            &path,
            r#"
source_folder = "/data/人物资料"
enable_backup = false

[style]
line_spacing = 2.0
"#,
        )
        .unwrap();

        let config = Config::from_toml_file(&path).unwrap();
        assert_eq!(config.source_folder, PathBuf::from("/data/人物资料"));
        assert!(!config.enable_backup);
        assert_eq!(config.style.line_spacing, 2.0);
        assert_eq!(config.style.body.typeface, "楷体");
        assert_eq!(config.download_timeout_secs, 20);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "enable_backup = [").unwrap();

        let err = Config::from_toml_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseFailed { .. }));
    }

    #[test]
    fn test_report_path_defaults_next_to_source() {
        let config = Config {
            source_folder: PathBuf::from("/home/user/Desktop/人物"),
            ..Config::default()
        };
        assert_eq!(
            config.report_path(),
            PathBuf::from("/home/user/Desktop").join(DEFAULT_REPORT_NAME)
        );
    }
}
