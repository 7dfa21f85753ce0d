//! 处理记录与批次统计

use std::path::{Path, PathBuf};

use crate::models::PersonName;

/// 单个文档的处理记录
///
/// 每个被尝试处理的文档都会有一条记录；`errors` 非空即视为失败。
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingRecord {
    pub filename: String,
    pub extracted_name: Option<PersonName>,
    pub errors: Vec<String>,
    pub image_found: bool,
    pub image_inserted: bool,
}

impl ProcessingRecord {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            extracted_name: None,
            errors: Vec::new(),
            image_found: false,
            image_inserted: false,
        }
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn is_failed(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// 批次统计
///
/// 只由编排层在两次文档处理之间累加；运行结束后通过只读访问器对外暴露。
/// 始终满足 `success + failed.len() == total` 且
/// `images_inserted <= images_found <= total`。
#[derive(Debug, Clone, Default)]
pub struct BatchStatistics {
    total: usize,
    success: usize,
    images_found: usize,
    images_inserted: usize,
    backup_location: Option<PathBuf>,
    failed: Vec<ProcessingRecord>,
    interrupted: bool,
}

impl BatchStatistics {
    /// 归并一条处理记录：失败的进入失败列表，成功的计入汇总
    pub(crate) fn fold(&mut self, record: ProcessingRecord) {
        self.total += 1;
        if record.is_failed() {
            self.failed.push(record);
            return;
        }
        self.success += 1;
        if record.image_found {
            self.images_found += 1;
            if record.image_inserted {
                self.images_inserted += 1;
            }
        }
    }

    pub(crate) fn set_backup_location(&mut self, location: PathBuf) {
        self.backup_location = Some(location);
    }

    pub(crate) fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn success(&self) -> usize {
        self.success
    }

    pub fn images_found(&self) -> usize {
        self.images_found
    }

    pub fn images_inserted(&self) -> usize {
        self.images_inserted
    }

    pub fn backup_location(&self) -> Option<&Path> {
        self.backup_location.as_deref()
    }

    pub fn failed(&self) -> &[ProcessingRecord] {
        &self.failed
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }
}
