//! TIFF 读取错误

use std::fmt;
use std::io;

use super::TagId;

/// 解析 TIFF 时可能出现的错误
#[derive(Debug)]
pub enum TiffError {
    /// 文件开头不是 `II*\0`、`MM\0*` 或对应的 BigTIFF 标识
    BadMagicBytes,
    /// 文件中没有任何 IFD
    NoIfd0,
    /// 底层 IO 错误
    ReadError(io::Error),
    /// 缺少必需的标签
    MissingTag(TagId),
    /// 标签存在但内容无法解释
    BadTag(TagId),
}

impl From<io::Error> for TiffError {
    fn from(e: io::Error) -> Self {
        TiffError::ReadError(e)
    }
}

impl fmt::Display for TiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiffError::BadMagicBytes => write!(f, "无效的TIFF文件魔数"),
            TiffError::NoIfd0 => write!(f, "未找到IFD0"),
            TiffError::ReadError(e) => write!(f, "IO读取错误: {}", e),
            TiffError::MissingTag(tag) => write!(f, "缺少必需的标签: {:?}", tag),
            TiffError::BadTag(tag) => write!(f, "标签数据错误: {:?}", tag),
        }
    }
}

impl std::error::Error for TiffError {}
