use anyhow::{Context, Result};
use tracing::{error, warn};

use word_batch::utils::logging;
use word_batch::{BatchProcessor, Config, ReportWriter};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load().context("加载配置失败")?;

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config);

    tokio::fs::create_dir_all(&config.image_folder)
        .await
        .with_context(|| format!("无法创建图片文件夹 {}", config.image_folder.display()))?;

    let processor = BatchProcessor::from_config(&config)?;

    // Ctrl-C 只取消令牌，由编排层决定在哪里停下
    let cancel = processor.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("\n⏹️ 用户中断操作，正在停止...");
            cancel.cancel();
        }
    });

    let stats = processor
        .process_collection(&config.source_folder, &config.image_folder)
        .await?;

    // 中断时不生成报告
    let mut report = None;
    if !stats.interrupted() {
        match ReportWriter::with_path(config.report_path())
            .write(stats.failed())
            .await
        {
            Ok(path) => report = path,
            Err(e) => error!("❌ 错误报告写入失败: {}", e),
        }
    }

    logging::print_final_stats(&stats, report.as_deref());
    Ok(())
}
