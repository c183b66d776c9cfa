//! 编码选项

use super::EncodeError;
use crate::compression::Compression;
use std::fmt;
use std::str::FromStr;

/// 输出支持的压缩方式
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SupportedCompression {
    /// 不压缩
    None,
    /// LZW 无损压缩,GIS 软件普遍支持
    #[default]
    Lzw,
    /// Deflate/ZIP 压缩,压缩比通常高于 LZW
    Deflate,
}

impl SupportedCompression {
    /// 对应的 TIFF Compression 标签值
    pub fn tag_value(&self) -> Compression {
        match self {
            SupportedCompression::None => Compression::Uncompressed,
            SupportedCompression::Lzw => Compression::Lzw,
            SupportedCompression::Deflate => Compression::DeflateAdobe,
        }
    }
}

impl FromStr for SupportedCompression {
    type Err = EncodeError;

    /// 不区分大小写地解析 `LZW`、`DEFLATE`、`NONE`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LZW" => Ok(SupportedCompression::Lzw),
            "DEFLATE" => Ok(SupportedCompression::Deflate),
            "NONE" => Ok(SupportedCompression::None),
            _ => Err(EncodeError::UnsupportedCompression(s.to_string())),
        }
    }
}

impl fmt::Display for SupportedCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportedCompression::None => write!(f, "NONE"),
            SupportedCompression::Lzw => write!(f, "LZW"),
            SupportedCompression::Deflate => write!(f, "DEFLATE"),
        }
    }
}

/// 何时使用 BigTIFF
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum BigTiffMode {
    /// 文件超过 4 GiB 时才使用
    #[default]
    Auto,
    Always,
    /// 文件超过 4 GiB 时报错
    Never,
}

impl FromStr for BigTiffMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "if_needed" => Ok(BigTiffMode::Auto),
            "always" | "yes" => Ok(BigTiffMode::Always),
            "never" | "no" => Ok(BigTiffMode::Never),
            other => Err(format!("无效的BigTIFF模式: {other}")),
        }
    }
}

/// 编码选项,默认 LZW、256 瓦片、自动 BigTIFF
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    pub compression: SupportedCompression,
    /// 瓦片边长,必须是 2 的幂
    pub tile_size: u32,
    pub big_tiff: BigTiffMode,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            compression: SupportedCompression::Lzw,
            tile_size: 256,
            big_tiff: BigTiffMode::Auto,
        }
    }
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression(mut self, compression: SupportedCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_tile_size(mut self, size: u32) -> Self {
        self.tile_size = size;
        self
    }

    pub fn with_big_tiff(mut self, mode: BigTiffMode) -> Self {
        self.big_tiff = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_names_ignore_case() {
        assert_eq!("deflate".parse::<SupportedCompression>().unwrap(), SupportedCompression::Deflate);
        assert_eq!("None".parse::<SupportedCompression>().unwrap(), SupportedCompression::None);
        assert!(matches!(
            "JPEG".parse::<SupportedCompression>(),
            Err(EncodeError::UnsupportedCompression(name)) if name == "JPEG"
        ));
    }

    #[test]
    fn defaults() {
        let options = EncodeOptions::default();
        assert_eq!(options.compression, SupportedCompression::Lzw);
        assert_eq!(options.tile_size, 256);
        assert_eq!(options.big_tiff, BigTiffMode::Auto);
        assert_eq!("NEVER".parse::<BigTiffMode>(), Ok(BigTiffMode::Never));
    }
}
