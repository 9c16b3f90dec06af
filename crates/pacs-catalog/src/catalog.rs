//! 规范化目录
//!
//! 将逐文件的元数据记录归并为患者/检查/序列三级实体。插入语义为“存在即忽略”：
//! 每个实体的字段取自第一条出现的记录。归属不一致只记录冲突，不做修正。

use crate::models::{CatalogPatient, CatalogSeries, CatalogStudy, ParentageConflict};
use pacs_core::MetadataRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// 规范化目录
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    pub patients: BTreeMap<String, CatalogPatient>,
    pub studies: BTreeMap<String, CatalogStudy>,
    pub series: BTreeMap<String, CatalogSeries>,
    pub conflicts: Vec<ParentageConflict>,
    /// 因身份键缺失而未入目录的记录数
    pub dropped_records: usize,
    /// 已入目录的文件记录数
    pub file_count: usize,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由一批记录构建目录
    pub fn from_records(records: &[MetadataRecord]) -> Self {
        let mut catalog = Self::new();
        for record in records {
            catalog.insert(record);
        }
        debug!(
            "目录构建完成: {} 个患者, {} 个检查, {} 个序列, 丢弃 {} 条记录, {} 个冲突",
            catalog.patients.len(),
            catalog.studies.len(),
            catalog.series.len(),
            catalog.dropped_records,
            catalog.conflicts.len()
        );
        catalog
    }

    /// 插入一条记录，身份键不全时丢弃并返回 `false`
    pub fn insert(&mut self, record: &MetadataRecord) -> bool {
        let (patient_id, study_uid, series_uid) = match record.identity() {
            Some(identity) => identity,
            None => {
                debug!("身份键不全，未入目录: {}", record.get_summary());
                self.dropped_records += 1;
                return false;
            }
        };
        self.file_count += 1;

        self.patients
            .entry(patient_id.to_string())
            .or_insert_with(|| CatalogPatient::new(patient_id));

        match self.studies.get(study_uid) {
            Some(study) if study.patient_id != patient_id => {
                let conflict = ParentageConflict::StudyInMultiplePatients {
                    study_instance_uid: study_uid.to_string(),
                    recorded_patient_id: study.patient_id.clone(),
                    conflicting_patient_id: patient_id.to_string(),
                };
                self.add_conflict(conflict);
            }
            Some(_) => {}
            None => {
                self.studies.insert(
                    study_uid.to_string(),
                    CatalogStudy::from_record(study_uid, patient_id, record),
                );
                if let Some(patient) = self.patients.get_mut(patient_id) {
                    patient.study_uids.insert(study_uid.to_string());
                }
            }
        }

        match self.series.get(series_uid) {
            Some(series) if series.study_instance_uid != study_uid => {
                let conflict = ParentageConflict::SeriesInMultipleStudies {
                    series_instance_uid: series_uid.to_string(),
                    recorded_study_uid: series.study_instance_uid.clone(),
                    conflicting_study_uid: study_uid.to_string(),
                };
                self.add_conflict(conflict);
            }
            Some(_) => {}
            None => {
                self.series.insert(
                    series_uid.to_string(),
                    CatalogSeries::from_record(series_uid, study_uid, record),
                );
                if let Some(study) = self.studies.get_mut(study_uid) {
                    if study.patient_id == patient_id {
                        study.series_uids.insert(series_uid.to_string());
                    }
                }
            }
        }

        true
    }

    fn add_conflict(&mut self, conflict: ParentageConflict) {
        if !self.conflicts.contains(&conflict) {
            warn!("层级归属冲突: {}", conflict);
            self.conflicts.push(conflict);
        }
    }

    /// 是否存在归属冲突
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}
