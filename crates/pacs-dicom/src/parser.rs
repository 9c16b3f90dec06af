//! DICOM头解析器
//!
//! 只读取像素数据之前的头部元素，提取流水线需要的字段。

use dicom::dictionary_std::tags;
use dicom::object::{DefaultDicomObject, OpenFileOptions};
use pacs_core::utils::normalize_value;
use pacs_core::{MetadataRecord, PacsError, Result};
use std::path::Path;
use tracing::debug;

/// DICOM头解析器
pub struct DicomParser;

impl Default for DicomParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DicomParser {
    /// 创建新的DICOM解析器
    pub fn new() -> Self {
        Self
    }

    /// 解析DICOM文件头
    pub async fn parse_file<P: AsRef<Path>>(file_path: P) -> Result<HeaderFields> {
        let file_path = file_path.as_ref();
        debug!("开始解析DICOM文件: {:?}", file_path);

        let obj = OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(file_path)
            .map_err(|e| PacsError::DicomParseError(format!("无法解析DICOM文件: {}", e)))?;

        let fields = Self::extract_fields(&obj);
        debug!("成功提取DICOM头: {}", fields.get_summary());
        Ok(fields)
    }

    /// 从DICOM对象中提取字段
    fn extract_fields(obj: &DefaultDicomObject) -> HeaderFields {
        HeaderFields {
            patient_id: Self::get_string_element(obj, tags::PATIENT_ID),
            study_instance_uid: Self::get_string_element(obj, tags::STUDY_INSTANCE_UID),
            series_instance_uid: Self::get_string_element(obj, tags::SERIES_INSTANCE_UID),
            slice_thickness: Self::get_decimal_element(obj, tags::SLICE_THICKNESS),
            pixel_spacing: Self::get_decimal_pair(obj, tags::PIXEL_SPACING),
            study_date: Self::get_string_element(obj, tags::STUDY_DATE),
            acquisition_date: Self::get_string_element(obj, tags::ACQUISITION_DATE),
        }
    }

    /// 获取字符串类型元素的值，空值视为缺失
    fn get_string_element(obj: &DefaultDicomObject, tag: dicom::core::Tag) -> Option<String> {
        match obj.element(tag) {
            Ok(element) => match element.to_str() {
                Ok(value) => normalize_value(&value),
                Err(_) => {
                    debug!("标签 {:?} 不是字符串类型", tag);
                    None
                }
            },
            Err(_) => {
                debug!("未找到标签: {:?}", tag);
                None
            }
        }
    }

    /// 获取多值元素的各个分量
    fn get_components(obj: &DefaultDicomObject, tag: dicom::core::Tag) -> Vec<String> {
        Self::get_string_element(obj, tag)
            .map(|value| value.split('\\').filter_map(normalize_value).collect())
            .unwrap_or_default()
    }

    /// 获取十进制数（DS）元素的第一个值
    fn get_decimal_element(obj: &DefaultDicomObject, tag: dicom::core::Tag) -> Option<f64> {
        let first = Self::get_components(obj, tag).into_iter().next()?;
        match first.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                debug!("标签 {:?} 的值无法解析为数字: {}", tag, first);
                None
            }
        }
    }

    /// 获取成对十进制数（如像素间距），格式化为 `[a, b]`
    fn get_decimal_pair(obj: &DefaultDicomObject, tag: dicom::core::Tag) -> Option<String> {
        let components = Self::get_components(obj, tag);
        if components.is_empty() {
            None
        } else {
            Some(format!("[{}]", components.join(", ")))
        }
    }
}

/// 从DICOM头提取出的字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderFields {
    /// 患者ID
    pub patient_id: Option<String>,
    /// 检查实例UID
    pub study_instance_uid: Option<String>,
    /// 序列实例UID
    pub series_instance_uid: Option<String>,
    /// 层厚
    pub slice_thickness: Option<f64>,
    /// 像素间距
    pub pixel_spacing: Option<String>,
    /// 检查日期
    pub study_date: Option<String>,
    /// 采集日期
    pub acquisition_date: Option<String>,
}

impl HeaderFields {
    /// 结合源路径与切片数生成元数据记录
    pub fn into_record(self, source_path: String, number_of_slices: u32) -> MetadataRecord {
        MetadataRecord {
            patient_id: self.patient_id,
            study_instance_uid: self.study_instance_uid,
            series_instance_uid: self.series_instance_uid,
            slice_thickness: self.slice_thickness,
            pixel_spacing: self.pixel_spacing,
            study_date: self.study_date,
            acquisition_date: self.acquisition_date,
            source_path,
            number_of_slices,
        }
    }

    /// 获取摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "患者ID={}, 检查UID={}, 序列UID={}",
            self.patient_id.as_deref().unwrap_or("未知"),
            self.study_instance_uid.as_deref().unwrap_or("未知"),
            self.series_instance_uid.as_deref().unwrap_or("未知"),
        )
    }
}
