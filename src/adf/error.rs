//! ArcInfo Grid 解码错误

use std::fmt;
use std::io;
use std::path::PathBuf;

/// 解码数据集时的错误
#[derive(Debug)]
pub enum AdfError {
    /// 缺少必需的文件
    MissingRequiredFile(String),
    /// 文件头或边界文件无法解析
    CorruptHeader { file: String, reason: String },
    /// 数据块无法解码,`tile` 为 (块列, 块行)
    TileDecodeError {
        file: String,
        tile: (u32, u32),
        reason: String,
    },
    /// 读取数据集文件失败
    IoFailure { path: PathBuf, source: io::Error },
}

impl AdfError {
    pub(crate) fn corrupt(file: &str, reason: impl Into<String>) -> Self {
        AdfError::CorruptHeader {
            file: file.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn tile(file: &str, tile: (u32, u32), reason: impl Into<String>) -> Self {
        AdfError::TileDecodeError {
            file: file.to_string(),
            tile,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdfError::MissingRequiredFile(name) => write!(f, "缺少必需的文件: {name}"),
            AdfError::CorruptHeader { file, reason } => write!(f, "{file} 损坏: {reason}"),
            AdfError::TileDecodeError { file, tile, reason } => {
                write!(f, "{file} 中的数据块 {tile:?} 解码失败: {reason}")
            }
            AdfError::IoFailure { path, source } => {
                write!(f, "读取 {} 失败: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for AdfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AdfError::IoFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}
