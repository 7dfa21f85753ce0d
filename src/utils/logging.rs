//! 日志工具模块
//!
//! 提供日志初始化和格式化输出的辅助函数

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::BatchStatistics;

/// 初始化 tracing 订阅器
///
/// `RUST_LOG` 优先；未设置时 `verbose` 为 `debug`，否则为 `info`。
/// 重复调用不会报错（测试中会被多次调用）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - Word 文档批量处理");
    info!("📁 源文件夹: {}", config.source_folder.display());
    info!("🖼️ 图片保存: {}", config.image_folder.display());
    info!(
        "📝 文档格式: {} {}pt{} + 居中页码",
        config.style.body.typeface,
        config.style.body.size_pt,
        if config.style.body.bold { " 加粗" } else { "" }
    );
    info!("💾 备份: {}", if config.enable_backup { "开启" } else { "关闭" });
    info!("{}", "=".repeat(60));
}

/// 记录文档扫描结果
pub fn log_documents_found(total: usize) {
    info!("✓ 找到 {} 个待处理的文档", total);
    info!("💡 逐个处理，单个文档失败不影响其他文档\n");
}

/// 记录单个文档开始处理
pub fn log_document_start(prefix: &impl std::fmt::Display) {
    info!("\n{}", "─".repeat(60));
    info!("{} 📄 开始处理", prefix);
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &BatchStatistics, report_path: Option<&Path>) {
    info!("\n{}", "=".repeat(60));
    if stats.interrupted() {
        info!("⏹️ 处理被中断");
    } else {
        info!("📊 全部处理完成统计");
    }
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📄 总计文档: {}", stats.total());
    info!("✅ 成功处理: {}/{}", stats.success(), stats.total());
    info!("❌ 失败: {}", stats.failed().len());
    info!("🔍 找到图片: {}", stats.images_found());
    info!("🖼️ 插入图片: {}", stats.images_inserted());
    if let Some(backup) = stats.backup_location() {
        info!("💾 文档备份: {}", backup.display());
    }
    if let Some(report) = report_path {
        info!("📋 错误报告: {}", report.display());
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
