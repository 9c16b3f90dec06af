//! 元数据提取
//!
//! 两遍处理：先读取目录树中全部文件头，再按序列UID统计切片数并回填到每条记录。
//! 序列UID缺失的记录构成独立的“未识别”分组，切片数为0，不会并入任何序列。

use crate::parser::{DicomParser, HeaderFields};
use crate::scanner::FileScanner;
use crate::validator::HeaderValidator;
use pacs_core::artifact::write_artifact;
use pacs_core::{MetadataRecord, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 单个文件的提取诊断
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionDiagnostic {
    pub path: PathBuf,
    pub error: String,
}

/// 一次提取运行的结果
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// 按遍历顺序排列的记录
    pub records: Vec<MetadataRecord>,
    /// 被跳过的文件
    pub diagnostics: Vec<ExtractionDiagnostic>,
    /// 扫描到的候选文件数
    pub files_scanned: usize,
}

impl ExtractionReport {
    /// 序列UID缺失的记录数
    pub fn unidentified_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.series_instance_uid.is_none())
            .count()
    }

    /// 不同序列的数量
    pub fn series_count(&self) -> usize {
        count_slices(self.records.iter().map(|r| r.series_instance_uid.as_deref())).len()
    }
}

/// 元数据提取器
#[derive(Debug, Default)]
pub struct MetadataExtractor {
    scanner: FileScanner,
    validator: HeaderValidator,
}

impl MetadataExtractor {
    /// 创建提取器，`extensions` 为空时尝试解析所有文件
    pub fn new(extensions: Vec<String>) -> Self {
        Self {
            scanner: FileScanner::new(extensions),
            validator: HeaderValidator::new(),
        }
    }

    /// 提取目录树下所有文件的元数据
    pub async fn extract(&self, root: &Path) -> Result<ExtractionReport> {
        info!("开始提取元数据: {}", root.display());
        let scan = self.scanner.scan(root)?;

        let mut diagnostics: Vec<ExtractionDiagnostic> = scan
            .errors
            .into_iter()
            .map(|(path, error)| ExtractionDiagnostic { path, error })
            .collect();

        // 第一遍：读取文件头
        let mut headers: Vec<(PathBuf, HeaderFields)> = Vec::with_capacity(scan.files.len());
        for file in &scan.files {
            // 表格产物以UTF-8文本保存路径，无法无损表示的路径在重组时找不到源文件
            if file.path.to_str().is_none() {
                warn!("路径不是有效的UTF-8，跳过: {}", file.path.display());
                diagnostics.push(ExtractionDiagnostic {
                    path: file.path.clone(),
                    error: "path is not valid UTF-8".to_string(),
                });
                continue;
            }
            match DicomParser::parse_file(&file.path).await {
                Ok(fields) => {
                    let validation = self.validator.validate(&fields);
                    for warning in &validation.warnings {
                        warn!("{}: {}", file.path.display(), warning);
                    }
                    headers.push((file.path.clone(), fields));
                }
                Err(e) => {
                    warn!("读取文件失败 {}: {}", file.path.display(), e);
                    diagnostics.push(ExtractionDiagnostic {
                        path: file.path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        // 第二遍：按序列统计切片数并回填
        let records = aggregate_records(headers);

        let report = ExtractionReport {
            records,
            diagnostics,
            files_scanned: scan.files.len(),
        };
        info!(
            "提取完成: 扫描 {} 个文件, 生成 {} 条记录, {} 个序列, 跳过 {} 个文件",
            report.files_scanned,
            report.records.len(),
            report.series_count(),
            report.diagnostics.len()
        );
        if report.unidentified_count() > 0 {
            warn!("{} 条记录缺少序列UID，切片数记为0", report.unidentified_count());
        }
        Ok(report)
    }

    /// 提取并写入表格产物
    pub async fn extract_to_artifact(&self, root: &Path, output: &Path) -> Result<ExtractionReport> {
        let report = self.extract(root).await?;
        write_artifact(output, &report.records)?;
        Ok(report)
    }
}

/// 统计每个序列UID出现的次数，缺失的UID不计入
pub fn count_slices<'a, I>(series_uids: I) -> HashMap<String, u32>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts = HashMap::new();
    for uid in series_uids.into_iter().flatten() {
        *counts.entry(uid.to_string()).or_insert(0) += 1;
    }
    counts
}

/// 将原始头字段与其序列切片数组合为最终记录
pub fn aggregate_records(headers: Vec<(PathBuf, HeaderFields)>) -> Vec<MetadataRecord> {
    let counts = count_slices(headers.iter().map(|(_, h)| h.series_instance_uid.as_deref()));

    headers
        .into_iter()
        .map(|(path, fields)| {
            let number_of_slices = fields
                .series_instance_uid
                .as_deref()
                .and_then(|uid| counts.get(uid))
                .copied()
                .unwrap_or(0);
            fields.into_record(path.to_string_lossy().into_owned(), number_of_slices)
        })
        .collect()
}
