//! GeoTIFF 标签错误

use crate::tiff::TagId;
use std::fmt;

/// 读取 GeoTIFF 标签时的错误
#[derive(Debug)]
pub enum GeoTiffError {
    /// 缺少必需的标签,例如 ModelTiepoint 或 GeoKeyDirectory
    MissingTag(TagId),
    /// 标签存在但长度或类型不对
    BadTag(TagId),
}

impl fmt::Display for GeoTiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoTiffError::MissingTag(tag) => write!(f, "缺少GeoTIFF标签: {:?}", tag),
            GeoTiffError::BadTag(tag) => write!(f, "GeoTIFF标签内容错误: {:?}", tag),
        }
    }
}

impl std::error::Error for GeoTiffError {}
