//! 测试用DICOM文件生成

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::tags;
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};
use pacs_core::{PacsError, Result};
use std::path::Path;

const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";

/// 可写入磁盘的最小DICOM文件描述
#[derive(Debug, Clone, Default)]
pub struct DicomFixture {
    pub patient_id: Option<String>,
    pub study_instance_uid: Option<String>,
    pub series_instance_uid: Option<String>,
    pub slice_thickness: Option<String>,
    /// 多值以反斜杠分隔，如 `0.7\0.7`
    pub pixel_spacing: Option<String>,
    pub study_date: Option<String>,
    pub acquisition_date: Option<String>,
    pub sop_instance_uid: String,
}

impl DicomFixture {
    pub fn new(patient_id: &str, study_instance_uid: &str, series_instance_uid: &str) -> Self {
        Self {
            patient_id: Some(patient_id.to_string()),
            study_instance_uid: Some(study_instance_uid.to_string()),
            series_instance_uid: Some(series_instance_uid.to_string()),
            sop_instance_uid: "1.2.826.0.1.3680043.9.7382.1".to_string(),
            ..Default::default()
        }
    }

    /// 写入带文件元信息的DICOM文件
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut obj = InMemDicomObject::new_empty();
        let mut put = |tag: Tag, vr: VR, value: &Option<String>| {
            if let Some(value) = value {
                obj.put(DataElement::new(tag, vr, PrimitiveValue::from(value.as_str())));
            }
        };

        put(tags::SOP_CLASS_UID, VR::UI, &Some(CT_IMAGE_STORAGE.to_string()));
        put(tags::SOP_INSTANCE_UID, VR::UI, &Some(self.sop_instance_uid.clone()));
        put(tags::PATIENT_ID, VR::LO, &self.patient_id);
        put(tags::STUDY_INSTANCE_UID, VR::UI, &self.study_instance_uid);
        put(tags::SERIES_INSTANCE_UID, VR::UI, &self.series_instance_uid);
        put(tags::SLICE_THICKNESS, VR::DS, &self.slice_thickness);
        put(tags::PIXEL_SPACING, VR::DS, &self.pixel_spacing);
        put(tags::STUDY_DATE, VR::DA, &self.study_date);
        put(tags::ACQUISITION_DATE, VR::DA, &self.acquisition_date);

        let file_obj = obj
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN)
                    .media_storage_sop_class_uid(CT_IMAGE_STORAGE)
                    .media_storage_sop_instance_uid(self.sop_instance_uid.as_str()),
            )
            .map_err(|e| PacsError::Internal(format!("构建文件元信息失败: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        file_obj
            .write_to_file(path)
            .map_err(|e| PacsError::Internal(format!("写入DICOM文件失败: {}", e)))?;
        Ok(())
    }
}
