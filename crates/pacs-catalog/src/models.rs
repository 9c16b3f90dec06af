//! 目录模型
//!
//! 患者、检查、序列三级实体，以身份键关联。

use pacs_core::MetadataRecord;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// 患者
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogPatient {
    pub patient_id: String,
    pub study_uids: BTreeSet<String>,
}

impl CatalogPatient {
    pub fn new(patient_id: &str) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            study_uids: BTreeSet::new(),
        }
    }
}

/// 检查
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStudy {
    pub study_instance_uid: String,
    pub patient_id: String,
    pub study_date: Option<String>,
    pub series_uids: BTreeSet<String>,
}

impl CatalogStudy {
    /// 以首条记录的字段建立检查
    pub fn from_record(study_uid: &str, patient_id: &str, record: &MetadataRecord) -> Self {
        Self {
            study_instance_uid: study_uid.to_string(),
            patient_id: patient_id.to_string(),
            study_date: record.study_date.clone(),
            series_uids: BTreeSet::new(),
        }
    }
}

/// 序列
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSeries {
    pub series_instance_uid: String,
    pub study_instance_uid: String,
    pub slice_thickness: Option<f64>,
    pub pixel_spacing: Option<String>,
    pub number_of_slices: u32,
}

impl CatalogSeries {
    /// 以首条记录的字段建立序列
    pub fn from_record(series_uid: &str, study_uid: &str, record: &MetadataRecord) -> Self {
        Self {
            series_instance_uid: series_uid.to_string(),
            study_instance_uid: study_uid.to_string(),
            slice_thickness: record.slice_thickness,
            pixel_spacing: record.pixel_spacing.clone(),
            number_of_slices: record.number_of_slices,
        }
    }
}

/// 层级归属冲突
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParentageConflict {
    /// 同一序列UID出现在不同检查下
    SeriesInMultipleStudies {
        series_instance_uid: String,
        recorded_study_uid: String,
        conflicting_study_uid: String,
    },
    /// 同一检查UID出现在不同患者下
    StudyInMultiplePatients {
        study_instance_uid: String,
        recorded_patient_id: String,
        conflicting_patient_id: String,
    },
}

impl fmt::Display for ParentageConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentageConflict::SeriesInMultipleStudies {
                series_instance_uid,
                recorded_study_uid,
                conflicting_study_uid,
            } => write!(
                f,
                "序列 {} 同时属于检查 {} 和 {}",
                series_instance_uid, recorded_study_uid, conflicting_study_uid
            ),
            ParentageConflict::StudyInMultiplePatients {
                study_instance_uid,
                recorded_patient_id,
                conflicting_patient_id,
            } => write!(
                f,
                "检查 {} 同时属于患者 {} 和 {}",
                study_instance_uid, recorded_patient_id, conflicting_patient_id
            ),
        }
    }
}
