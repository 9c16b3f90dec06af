//! 核心数据模型定义

use serde::{Deserialize, Serialize};

/// 单个源文件的元数据记录
///
/// 字段顺序即表格产物的列顺序，序列化时不可调整。
/// 缺失字段以 `None` 表示，写入表格产物时为空单元格。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(rename = "PatientID")]
    pub patient_id: Option<String>,
    #[serde(rename = "StudyInstanceUID")]
    pub study_instance_uid: Option<String>,
    #[serde(rename = "SeriesInstanceUID")]
    pub series_instance_uid: Option<String>,
    #[serde(rename = "SliceThickness")]
    pub slice_thickness: Option<f64>,
    /// 像素间距，格式为 `[行间距, 列间距]`
    #[serde(rename = "PixelSpacing")]
    pub pixel_spacing: Option<String>,
    #[serde(rename = "StudyDate")]
    pub study_date: Option<String>,
    #[serde(rename = "AcquisitionDate")]
    pub acquisition_date: Option<String>,
    #[serde(rename = "FilePath")]
    pub source_path: String,
    /// 同一序列在本次提取中的文件数，由聚合步骤计算
    #[serde(rename = "NumberOfSlices")]
    pub number_of_slices: u32,
}

impl MetadataRecord {
    /// 返回 (患者ID, 检查UID, 序列UID)，任一缺失则为 `None`
    pub fn identity(&self) -> Option<(&str, &str, &str)> {
        match (
            self.patient_id.as_deref(),
            self.study_instance_uid.as_deref(),
            self.series_instance_uid.as_deref(),
        ) {
            (Some(patient), Some(study), Some(series)) => Some((patient, study, series)),
            _ => None,
        }
    }

    /// 获取记录的摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "患者ID={}, 检查UID={}, 序列UID={}, 文件={}",
            self.patient_id.as_deref().unwrap_or("未知"),
            self.study_instance_uid.as_deref().unwrap_or("未知"),
            self.series_instance_uid.as_deref().unwrap_or("未知"),
            self.source_path
        )
    }
}
