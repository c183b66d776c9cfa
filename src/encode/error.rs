//! GeoTIFF 编码错误

use crate::compression::DecompressError;
use crate::raster::PixelType;
use std::fmt;
use std::io;

pub type EncodeResult<T> = Result<T, EncodeError>;

/// 编码过程中的错误
#[derive(Debug)]
pub enum EncodeError {
    /// 瓦片边长不是 2 的幂
    InvalidTileSize(u32),
    /// 无法识别的压缩方式名称
    UnsupportedCompression(String),
    /// 块尺寸与瓦片尺寸不一致
    TileSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// 块的像元类型与栅格不一致
    PixelTypeMismatch {
        expected: PixelType,
        actual: PixelType,
    },
    /// 瓦片坐标超出瓦片网格
    TileOutOfRange { tile: (u32, u32), grid: (u32, u32) },
    /// 同一瓦片写了两次
    TileAlreadyWritten((u32, u32)),
    /// 结束时仍有瓦片未写入
    IncompleteRaster { missing: usize },
    /// 不允许 BigTIFF 而文件超过 4 GiB
    FileTooLarge(u64),
    CompressionError(DecompressError),
    WriteError(io::Error),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::InvalidTileSize(size) => write!(f, "瓦片大小 {size} 不是2的幂"),
            EncodeError::UnsupportedCompression(name) => {
                write!(f, "不支持的压缩方式 '{name}',可选 LZW、DEFLATE、NONE")
            }
            EncodeError::TileSizeMismatch { expected, actual } => {
                write!(f, "块尺寸 {actual:?} 与瓦片尺寸 {expected:?} 不符")
            }
            EncodeError::PixelTypeMismatch { expected, actual } => {
                write!(f, "像元类型 {actual:?} 与栅格的 {expected:?} 不符")
            }
            EncodeError::TileOutOfRange { tile, grid } => {
                write!(f, "瓦片 {tile:?} 超出 {grid:?} 的瓦片网格")
            }
            EncodeError::TileAlreadyWritten(tile) => write!(f, "瓦片 {tile:?} 已写入"),
            EncodeError::IncompleteRaster { missing } => write!(f, "还有 {missing} 个瓦片未写入"),
            EncodeError::FileTooLarge(size) => {
                write!(f, "输出 {size} 字节超过经典TIFF上限,需要BigTIFF")
            }
            EncodeError::CompressionError(e) => write!(f, "{e}"),
            EncodeError::WriteError(e) => write!(f, "写入失败: {e}"),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<io::Error> for EncodeError {
    fn from(e: io::Error) -> Self {
        EncodeError::WriteError(e)
    }
}

impl From<DecompressError> for EncodeError {
    fn from(e: DecompressError) -> Self {
        EncodeError::CompressionError(e)
    }
}
