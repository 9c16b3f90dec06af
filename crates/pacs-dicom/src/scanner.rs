//! 目录扫描
//!
//! 递归遍历目录树，按文件名排序，不跟随符号链接，每个普通文件只访问一次。

use pacs_core::utils::matches_extension;
use pacs_core::{PacsError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// 扫描到的文件
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl ScannedFile {
    /// 文件大小（MB）
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// 扫描结果
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// 匹配的文件，按遍历顺序
    pub files: Vec<ScannedFile>,
    /// 遍历中无法访问的条目
    pub errors: Vec<(PathBuf, String)>,
}

/// 文件扫描器
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    extensions: Vec<String>,
}

impl FileScanner {
    /// 创建扫描器，`extensions` 为空时接受所有文件
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// 扫描目录
    pub fn scan(&self, root: &Path) -> Result<ScanResult> {
        if !root.exists() {
            return Err(PacsError::NotFound(format!("目录不存在: {}", root.display())));
        }
        if !root.is_dir() {
            return Err(PacsError::Validation(format!("不是目录: {}", root.display())));
        }

        let mut result = ScanResult::default();
        let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    warn!("无法访问 {}: {}", path.display(), e);
                    result.errors.push((path, e.to_string()));
                    continue;
                }
            };

            if entry.path_is_symlink() {
                debug!("跳过符号链接: {}", entry.path().display());
                continue;
            }
            if !entry.file_type().is_file() || !matches_extension(entry.path(), &self.extensions) {
                continue;
            }

            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or_default();
            result.files.push(ScannedFile {
                path: entry.into_path(),
                size_bytes,
            });
        }

        debug!(
            "扫描完成 {}: {} 个文件, {} 个错误",
            root.display(),
            result.files.len(),
            result.errors.len()
        );
        Ok(result)
    }
}
