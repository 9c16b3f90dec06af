//! 子命令实现

use crate::config::{ExtractConfig, OrganizeConfig, ReportConfig};
use anyhow::{Context, Result};
use pacs_catalog::{Catalog, SummaryReport};
use pacs_core::ArtifactReader;
use pacs_dicom::{ExtractionReport, FileScanner, MetadataExtractor, ScannedFile};
use pacs_storage::{FileOrganizer, OrganizeSummary, OrganizerConfig};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{info, warn};

/// 提取元数据并写入表格产物
pub async fn run_extract(config: &ExtractConfig) -> Result<ExtractionReport> {
    let extractor = MetadataExtractor::new(config.extensions.clone());
    let report = extractor
        .extract_to_artifact(&config.data_dir, &config.output_file)
        .await
        .with_context(|| format!("元数据提取失败: {}", config.data_dir.display()))?;

    let catalog = Catalog::from_records(&report.records);
    if catalog.has_conflicts() {
        warn!("发现 {} 个层级归属冲突，记录已按原样写出", catalog.conflicts.len());
    }
    if !report.diagnostics.is_empty() {
        warn!("{} 个文件无法解析", report.diagnostics.len());
    }

    info!("Metadata extracted and saved to {}", config.output_file.display());
    Ok(report)
}

/// 按表格产物重组文件
pub async fn run_organize(config: &OrganizeConfig) -> Result<OrganizeSummary> {
    let organizer = FileOrganizer::new(OrganizerConfig {
        output_dir: config.output_dir.clone(),
        log_file: config.log_file.clone(),
        layout: config.layout,
    });

    let summary = match organizer.organize(&config.metadata_file).await {
        Ok(summary) => summary,
        Err(e) if e.is_configuration() => {
            return Err(anyhow::Error::new(e).context(format!(
                "元数据表格不满足重组要求，未复制任何文件: {}",
                config.metadata_file.display()
            )));
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("文件重组失败: {}", config.metadata_file.display())));
        }
    };

    info!("{}", summary);
    info!("Files organized under {}", config.output_dir.display());
    Ok(summary)
}

/// 生成汇总报告，未指定输出文件时打印到标准输出
pub async fn run_report(config: &ReportConfig) -> Result<SummaryReport> {
    let mut reader = ArtifactReader::open(&config.metadata_file)
        .with_context(|| format!("无法打开元数据文件: {}", config.metadata_file.display()))?;
    let records = reader.read_records().context("元数据文件解析失败")?;

    let report = SummaryReport::from_catalog(&Catalog::from_records(&records));
    let rendered = report.render(config.format)?;

    match &config.output_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            tokio::fs::write(path, rendered.as_bytes())
                .await
                .with_context(|| format!("无法写入报告: {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(report)
}

/// 列出目录下的文件
pub fn run_list(directory: &Path, extensions: Vec<String>) -> Result<Vec<ScannedFile>> {
    let scan = FileScanner::new(extensions)
        .scan(directory)
        .with_context(|| format!("无法列出目录: {}", directory.display()))?;

    print!("{}", format_listing(&scan.files));
    Ok(scan.files)
}

/// 文件列表的文本形式
pub fn format_listing(files: &[ScannedFile]) -> String {
    let mut out = String::new();
    for file in files {
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = writeln!(out, "File: {}", name);
        let _ = writeln!(out, "Path: {}", file.path.display());
        let _ = writeln!(out, "Size: {:.2} MB", file.size_mb());
        let _ = writeln!(out);
    }
    out
}
