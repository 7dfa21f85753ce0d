//! 文档处理流程 - 流程层
//!
//! 核心职责：定义"一个文档"的完整处理流程
//!
//! 流程顺序：
//! 1. 打开文档
//! 2. 统一样式 → 注入页码
//! 3. 提取姓名 → 搜索下载图片 → 插入图片
//! 4. 保存（只保存一次）
//!
//! 任何一步返回错误时立即结束，文档句柄被丢弃，磁盘上的文件保持原样。

use std::path::Path;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppResult, ConfigError};
use crate::infrastructure::{DocumentStore, DocxStore};
use crate::models::{ProcessingRecord, StyleProfile};
use crate::services::{
    extract_name, ImageCompositor, ImageResolver, PageNumberInjector, StyleNormalizer,
};
use crate::utils::logging::truncate_text;
use crate::workflow::document_ctx::DocumentCtx;

/// 文档处理流程
///
/// - 编排单个文档的完整处理流程
/// - 把姓名、图片等中间结果写入 `ProcessingRecord`
/// - 错误向上返回，由编排层记录
pub struct DocumentFlow {
    store: Box<dyn DocumentStore>,
    normalizer: StyleNormalizer,
    page_numbers: PageNumberInjector,
    resolver: ImageResolver,
    compositor: ImageCompositor,
    verbose_logging: bool,
}

impl DocumentFlow {
    /// 按配置创建（.docx 存储 + 必应搜索）
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let mut flow = Self::with_components(
            Box::new(DocxStore::new()),
            ImageResolver::from_config(config)?,
            config.style.clone(),
        );
        flow.verbose_logging = config.verbose_logging;
        Ok(flow)
    }

    /// 使用自定义存储和图片解析服务创建
    pub fn with_components(
        store: Box<dyn DocumentStore>,
        resolver: ImageResolver,
        profile: StyleProfile,
    ) -> Self {
        Self {
            store,
            page_numbers: PageNumberInjector::new(profile.body.clone()),
            compositor: ImageCompositor::new(profile.caption.clone()),
            normalizer: StyleNormalizer::new(profile),
            resolver,
            verbose_logging: false,
        }
    }

    pub async fn run(
        &self,
        ctx: &DocumentCtx,
        image_dir: &Path,
        record: &mut ProcessingRecord,
    ) -> AppResult<()> {
        // ========== 1. 打开 ==========
        let mut doc = self.store.open(&ctx.path)?;

        // ========== 2. 样式与页码 ==========
        self.normalizer.normalize(&mut doc)?;
        let footers = self.page_numbers.inject(&mut doc)?;
        if self.verbose_logging {
            info!("{} 样式已统一，页码已写入 {} 个页脚", ctx, footers);
        }

        // ========== 3. 姓名与图片 ==========
        match extract_name(&doc) {
            Some(name) => {
                info!("{} 👤 提取到姓名: {}", ctx, truncate_text(name.as_str(), 30));
                if let Some(asset) = self.resolver.resolve(&name, image_dir).await {
                    record.image_found = true;
                    info!(
                        "{} 🖼️ 图片已下载: {} ({} 字节)",
                        ctx,
                        asset.local_path.display(),
                        asset.size_bytes
                    );
                    record.image_inserted =
                        self.compositor.insert_image(&mut doc, &asset.local_path).await;
                    if !record.image_inserted {
                        warn!("{} ⚠️ 图片未能插入文档", ctx);
                    }
                }
                record.extracted_name = Some(name);
            }
            None => warn!("{} ⚠️ 首段为空，跳过图片处理", ctx),
        }

        // ========== 4. 保存 ==========
        self.store.save(doc, &ctx.path)?;
        Ok(())
    }
}
