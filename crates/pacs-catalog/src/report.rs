//! 汇总报告
//!
//! 基于目录中的序列表计算：检查总数、切片总数、每检查平均切片数和层厚分布。

use crate::catalog::Catalog;
use crate::models::ParentageConflict;
use chrono::{DateTime, Utc};
use pacs_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::str::FromStr;

/// 报告输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("未知的报告格式: {}", other)),
        }
    }
}

/// 层厚分组
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThicknessBucket {
    /// 层厚（mm），缺失为 `None`
    pub thickness: Option<f64>,
    /// 该层厚下的序列数
    pub series_count: usize,
}

/// 汇总报告
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub generated_at: DateTime<Utc>,
    pub total_patients: usize,
    pub total_studies: usize,
    pub total_series: usize,
    pub total_files: usize,
    pub total_slices: u64,
    pub average_slices_per_study: f64,
    pub slice_thickness_distribution: Vec<ThicknessBucket>,
    pub dropped_records: usize,
    pub conflicts: Vec<ParentageConflict>,
}

impl SummaryReport {
    /// 由目录计算报告
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let total_studies = catalog
            .series
            .values()
            .map(|s| s.study_instance_uid.as_str())
            .collect::<BTreeSet<_>>()
            .len();
        let total_slices: u64 = catalog.series.values().map(|s| u64::from(s.number_of_slices)).sum();
        let average_slices_per_study = if total_studies > 0 {
            total_slices as f64 / total_studies as f64
        } else {
            0.0
        };

        Self {
            generated_at: Utc::now(),
            total_patients: catalog.patients.len(),
            total_studies,
            total_series: catalog.series.len(),
            total_files: catalog.file_count,
            total_slices,
            average_slices_per_study,
            slice_thickness_distribution: thickness_distribution(catalog),
            dropped_records: catalog.dropped_records,
            conflicts: catalog.conflicts.clone(),
        }
    }

    /// 序列化为JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 渲染为纯文本
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "DICOM 元数据汇总报告");
        let _ = writeln!(out, "生成时间: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out);
        let _ = writeln!(out, "患者总数: {}", self.total_patients);
        let _ = writeln!(out, "检查总数: {}", self.total_studies);
        let _ = writeln!(out, "序列总数: {}", self.total_series);
        let _ = writeln!(out, "文件总数: {}", self.total_files);
        let _ = writeln!(out, "切片总数: {}", self.total_slices);
        let _ = writeln!(out, "每个检查平均切片数: {:.2}", self.average_slices_per_study);
        let _ = writeln!(out);
        let _ = writeln!(out, "层厚分布:");
        for bucket in &self.slice_thickness_distribution {
            match bucket.thickness {
                Some(thickness) => {
                    let _ = writeln!(out, "  {} mm: {} 个序列", thickness, bucket.series_count);
                }
                None => {
                    let _ = writeln!(out, "  未知: {} 个序列", bucket.series_count);
                }
            }
        }
        if self.dropped_records > 0 {
            let _ = writeln!(out);
            let _ = writeln!(out, "身份键缺失而未统计的记录: {}", self.dropped_records);
        }
        if !self.conflicts.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "层级归属冲突:");
            for conflict in &self.conflicts {
                let _ = writeln!(out, "  {}", conflict);
            }
        }
        out
    }

    /// 按格式渲染
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => self.to_json(),
        }
    }
}

/// 按层厚统计序列数，数值升序，缺失层厚排在最后
fn thickness_distribution(catalog: &Catalog) -> Vec<ThicknessBucket> {
    let mut buckets: Vec<ThicknessBucket> = Vec::new();
    for series in catalog.series.values() {
        match buckets.iter_mut().find(|b| b.thickness == series.slice_thickness) {
            Some(bucket) => bucket.series_count += 1,
            None => buckets.push(ThicknessBucket {
                thickness: series.slice_thickness,
                series_count: 1,
            }),
        }
    }
    buckets.sort_by(|a, b| match (a.thickness, b.thickness) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacs_core::MetadataRecord;

    fn record(study: &str, series: &str, thickness: Option<f64>, slices: u32) -> MetadataRecord {
        MetadataRecord {
            patient_id: Some("P1".to_string()),
            study_instance_uid: Some(study.to_string()),
            series_instance_uid: Some(series.to_string()),
            slice_thickness: thickness,
            pixel_spacing: None,
            study_date: None,
            acquisition_date: None,
            source_path: format!("/data/{}.dcm", series),
            number_of_slices: slices,
        }
    }

    #[test]
    fn test_summary_aggregates() {
        let records = vec![
            record("S1", "R1", Some(2.5), 3),
            record("S1", "R1", Some(2.5), 3),
            record("S1", "R1", Some(2.5), 3),
            record("S1", "R2", Some(1.25), 1),
            record("S2", "R3", Some(2.5), 2),
            record("S2", "R3", Some(2.5), 2),
            record("S2", "R4", None, 1),
        ];
        let report = SummaryReport::from_catalog(&Catalog::from_records(&records));

        assert_eq!(report.total_studies, 2);
        assert_eq!(report.total_series, 4);
        assert_eq!(report.total_files, 7);
        assert_eq!(report.total_slices, 7);
        assert!((report.average_slices_per_study - 3.5).abs() < 1e-9);
        assert_eq!(
            report.slice_thickness_distribution,
            vec![
                ThicknessBucket { thickness: Some(1.25), series_count: 1 },
                ThicknessBucket { thickness: Some(2.5), series_count: 2 },
                ThicknessBucket { thickness: None, series_count: 1 },
            ]
        );
    }

    #[test]
    fn test_empty_catalog_report() {
        let report = SummaryReport::from_catalog(&Catalog::new());
        assert_eq!(report.total_studies, 0);
        assert_eq!(report.average_slices_per_study, 0.0);
        assert!(report.render_text().contains("检查总数: 0"));
    }

    #[test]
    fn test_json_render() {
        let report = SummaryReport::from_catalog(&Catalog::from_records(&[record("S1", "R1", Some(2.5), 1)]));
        let json = report.render(ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total_slices"], 1);
        assert_eq!(value["slice_thickness_distribution"][0]["thickness"], 2.5);
    }

    #[test]
    fn test_report_format_from_str() {
        assert_eq!("JSON".parse::<ReportFormat>(), Ok(ReportFormat::Json));
        assert_eq!("text".parse::<ReportFormat>(), Ok(ReportFormat::Text));
        assert!("pdf".parse::<ReportFormat>().is_err());
    }
}
