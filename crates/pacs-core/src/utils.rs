//! 通用工具函数

use std::path::Path;

/// 验证DICOM UID格式
pub fn is_valid_dicom_uid(uid: &str) -> bool {
    // 简单的DICOM UID验证逻辑
    !uid.is_empty() && uid.len() <= 64 && uid.chars().all(|c| c.is_numeric() || c == '.')
}

/// 规范化字段值：去除首尾空白与DICOM填充的NUL，空值视为缺失
pub fn normalize_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 判断文件名是否匹配后缀过滤列表（不区分大小写）
///
/// 过滤列表为空时匹配所有文件。后缀可带或不带前导点。
pub fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }

    let file_name = match path.file_name() {
        Some(name) => name.to_string_lossy().to_lowercase(),
        None => return false,
    };

    extensions.iter().any(|ext| {
        let ext = ext.trim().to_lowercase();
        if ext.is_empty() {
            return false;
        }
        if ext.starts_with('.') {
            file_name.ends_with(&ext)
        } else {
            file_name.ends_with(&format!(".{}", ext))
        }
    })
}
