//! 元数据表格产物（CSV）读写
//!
//! 列名是下游入库与报表流程的兼容接口，不可更改。

use crate::error::{PacsError, Result};
use crate::models::MetadataRecord;
use crate::utils::normalize_value;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// 列名常量
pub mod columns {
    pub const PATIENT_ID: &str = "PatientID";
    pub const STUDY_INSTANCE_UID: &str = "StudyInstanceUID";
    pub const SERIES_INSTANCE_UID: &str = "SeriesInstanceUID";
    pub const SLICE_THICKNESS: &str = "SliceThickness";
    pub const PIXEL_SPACING: &str = "PixelSpacing";
    pub const STUDY_DATE: &str = "StudyDate";
    pub const ACQUISITION_DATE: &str = "AcquisitionDate";
    pub const FILE_PATH: &str = "FilePath";
    pub const NUMBER_OF_SLICES: &str = "NumberOfSlices";
}

/// 产物表头，顺序与 [`MetadataRecord`] 字段一致
pub const COLUMNS: [&str; 9] = [
    columns::PATIENT_ID,
    columns::STUDY_INSTANCE_UID,
    columns::SERIES_INSTANCE_UID,
    columns::SLICE_THICKNESS,
    columns::PIXEL_SPACING,
    columns::STUDY_DATE,
    columns::ACQUISITION_DATE,
    columns::FILE_PATH,
    columns::NUMBER_OF_SLICES,
];

/// 文件重组所需的最少列
pub const ORGANIZE_REQUIRED_COLUMNS: [&str; 4] = [
    columns::PATIENT_ID,
    columns::STUDY_INSTANCE_UID,
    columns::SERIES_INSTANCE_UID,
    columns::FILE_PATH,
];

/// 将记录写入表格产物
///
/// 即使没有任何记录也会写出表头。父目录不存在时自动创建。
pub fn write_artifact<P: AsRef<Path>>(path: P, records: &[MetadataRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!("元数据已写入 {}，共 {} 条记录", path.display(), records.len());
    Ok(())
}

/// 表格产物读取器
///
/// 按表头名称定位列，缺失的列读出为 `None`。
pub struct ArtifactReader {
    reader: csv::Reader<File>,
    columns: HashMap<String, usize>,
}

impl ArtifactReader {
    /// 打开表格产物，文件不存在时返回 [`PacsError::NotFound`]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PacsError::NotFound(format!("元数据文件不存在: {}", path.display())));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)?;
        let columns = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(index, name)| (name.trim().to_string(), index))
            .collect::<HashMap<_, _>>();

        debug!("读取表格产物 {}，表头: {:?}", path.display(), columns.keys());
        Ok(Self { reader, columns })
    }

    /// 是否包含指定列
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// 返回缺失的列名（保持传入顺序）
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| name.to_string())
            .collect()
    }

    /// 校验必需列，缺失时返回配置级错误
    pub fn require_columns(&self, required: &[&str]) -> Result<()> {
        let missing = self.missing_columns(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PacsError::MissingColumns(missing))
        }
    }

    /// 逐行读取。单行解析失败不影响后续行。
    pub fn rows(&mut self) -> impl Iterator<Item = Result<ArtifactRow>> + '_ {
        let columns = &self.columns;
        self.reader.records().map(move |record| {
            let record = record?;
            Ok(ArtifactRow::from_record(columns, &record))
        })
    }

    /// 读取全部行并转换为元数据记录
    pub fn read_records(&mut self) -> Result<Vec<MetadataRecord>> {
        self.rows()
            .map(|row| row.and_then(|row| row.to_record()))
            .collect()
    }
}

/// 表格产物中的一行原始数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactRow {
    /// 所在行号（表头为第1行）
    pub line: u64,
    pub patient_id: Option<String>,
    pub study_instance_uid: Option<String>,
    pub series_instance_uid: Option<String>,
    pub slice_thickness: Option<String>,
    pub pixel_spacing: Option<String>,
    pub study_date: Option<String>,
    pub acquisition_date: Option<String>,
    /// 源文件路径保持原样，仅空白时视为缺失
    pub file_path: Option<String>,
    pub number_of_slices: Option<String>,
}

impl ArtifactRow {
    fn from_record(columns: &HashMap<String, usize>, record: &csv::StringRecord) -> Self {
        let raw = |name: &str| columns.get(name).and_then(|&index| record.get(index));
        let cell = |name: &str| raw(name).and_then(normalize_value);

        Self {
            line: record.position().map(|p| p.line()).unwrap_or_default(),
            patient_id: cell(columns::PATIENT_ID),
            study_instance_uid: cell(columns::STUDY_INSTANCE_UID),
            series_instance_uid: cell(columns::SERIES_INSTANCE_UID),
            slice_thickness: cell(columns::SLICE_THICKNESS),
            pixel_spacing: cell(columns::PIXEL_SPACING),
            study_date: cell(columns::STUDY_DATE),
            acquisition_date: cell(columns::ACQUISITION_DATE),
            file_path: raw(columns::FILE_PATH)
                .filter(|path| !path.trim().is_empty())
                .map(str::to_string),
            number_of_slices: cell(columns::NUMBER_OF_SLICES),
        }
    }

    /// 用于日志的源路径描述
    pub fn display_path(&self) -> String {
        match &self.file_path {
            Some(path) => path.clone(),
            None => format!("<第{}行无路径>", self.line),
        }
    }

    /// 转换为元数据记录
    ///
    /// 层厚无法解析时按缺失处理；切片数必须是非负整数。
    pub fn to_record(&self) -> Result<MetadataRecord> {
        let source_path = self.file_path.clone().ok_or_else(|| {
            PacsError::Validation(format!("第{}行缺少{}", self.line, columns::FILE_PATH))
        })?;

        let slice_thickness = self.slice_thickness.as_deref().and_then(|value| {
            match value.parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    debug!("第{}行层厚无法解析: {}", self.line, value);
                    None
                }
            }
        });

        let number_of_slices = match self.number_of_slices.as_deref() {
            Some(value) => value.parse::<u32>().map_err(|_| {
                PacsError::Validation(format!(
                    "第{}行{}不是非负整数: {}",
                    self.line,
                    columns::NUMBER_OF_SLICES,
                    value
                ))
            })?,
            None => 0,
        };

        Ok(MetadataRecord {
            patient_id: self.patient_id.clone(),
            study_instance_uid: self.study_instance_uid.clone(),
            series_instance_uid: self.series_instance_uid.clone(),
            slice_thickness,
            pixel_spacing: self.pixel_spacing.clone(),
            study_date: self.study_date.clone(),
            acquisition_date: self.acquisition_date.clone(),
            source_path,
            number_of_slices,
        })
    }
}
