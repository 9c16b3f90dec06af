//! DICOM头字段检查
//!
//! 检查结果只产生警告，不会让文件被排除在提取结果之外。

use crate::parser::HeaderFields;
use chrono::NaiveDate;
use pacs_core::utils::is_valid_dicom_uid;
use tracing::debug;

/// 头字段检查器
#[derive(Debug, Default)]
pub struct HeaderValidator;

impl HeaderValidator {
    /// 创建新的检查器
    pub fn new() -> Self {
        Self
    }

    /// 检查头字段，返回警告列表
    pub fn validate(&self, fields: &HeaderFields) -> ValidationResult {
        let mut result = ValidationResult::new();

        self.validate_identity(fields, &mut result);
        self.validate_dates(fields, &mut result);

        if let Some(thickness) = fields.slice_thickness {
            if thickness < 0.0 {
                result.add_warning(format!("层厚为负数: {}", thickness));
            }
        }

        debug!("头字段检查完成: {} 个警告", result.warning_count());
        result
    }

    fn validate_identity(&self, fields: &HeaderFields, result: &mut ValidationResult) {
        if fields.patient_id.is_none() {
            result.add_warning("患者ID缺失".to_string());
        }

        let uids = [
            ("Study Instance UID", fields.study_instance_uid.as_deref()),
            ("Series Instance UID", fields.series_instance_uid.as_deref()),
        ];
        for (name, uid) in uids {
            match uid {
                Some(uid) if !is_valid_dicom_uid(uid) => {
                    result.add_warning(format!("{} 格式无效: {}", name, uid));
                }
                Some(_) => {}
                None => result.add_warning(format!("{} 缺失", name)),
            }
        }
    }

    fn validate_dates(&self, fields: &HeaderFields, result: &mut ValidationResult) {
        let dates = [
            ("Study Date", fields.study_date.as_deref()),
            ("Acquisition Date", fields.acquisition_date.as_deref()),
        ];
        for (name, date) in dates {
            if let Some(date) = date {
                if !is_valid_dicom_date(date) {
                    result.add_warning(format!("{} 不是有效日期: {}", name, date));
                }
            }
        }
    }
}

/// DA格式（YYYYMMDD）日期校验
pub fn is_valid_dicom_date(date: &str) -> bool {
    date.len() == 8
        && date.chars().all(|c| c.is_ascii_digit())
        && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
}

/// 检查结果
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// 警告列表
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// 创建新的检查结果
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// 检查是否有警告
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// 获取警告数量
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dicom_date_validation() {
        assert!(is_valid_dicom_date("20230101"));
        assert!(is_valid_dicom_date("20240229")); // 闰年
        assert!(!is_valid_dicom_date("20230229")); // 非闰年
        assert!(!is_valid_dicom_date("20231301")); // 无效月份
        assert!(!is_valid_dicom_date("20230100")); // 无效日期
        assert!(!is_valid_dicom_date("2023011")); // 长度错误
        assert!(!is_valid_dicom_date("2023-1-1"));
    }

    #[test]
    fn test_complete_header_has_no_warnings() {
        let fields = HeaderFields {
            patient_id: Some("P1".to_string()),
            study_instance_uid: Some("1.2.840.1".to_string()),
            series_instance_uid: Some("1.2.840.1.1".to_string()),
            slice_thickness: Some(1.25),
            study_date: Some("20000101".to_string()),
            ..Default::default()
        };
        assert!(!HeaderValidator::new().validate(&fields).has_warnings());
    }

    #[test]
    fn test_missing_identity_and_bad_date_warn() {
        let fields = HeaderFields {
            study_instance_uid: Some("not-a-uid".to_string()),
            acquisition_date: Some("20001332".to_string()),
            ..Default::default()
        };
        let result = HeaderValidator::new().validate(&fields);
        // 患者ID缺失、Study UID格式无效、Series UID缺失、采集日期无效
        assert_eq!(result.warning_count(), 4);
    }
}
