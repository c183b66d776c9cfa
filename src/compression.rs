//! TIFF 瓦片压缩
//!
//! 支持无压缩、LZW(TIFF 风格,MSB 位序、提前换码)和 Deflate(zlib 封装)。
//! 解码同样支持这三种,用于校验写出的文件。
//!
//! - [TIFF 压缩标签](https://en.wikipedia.org/wiki/TIFF#TIFF_Compression_Tag)

use num_enum::{FromPrimitive, IntoPrimitive};
use salzweg::decoder::{DecodingError, TiffStyleDecoder};
use salzweg::encoder::{EncodingError, TiffStyleEncoder};
use std::fmt;
use std::io::{self, Read, Write};

/// 压缩/解压过程中的错误
#[derive(Debug)]
pub enum DecompressError {
    LzwDecodeError(DecodingError),
    LzwEncodeError(EncodingError),
    /// 不支持的压缩方式
    CompressionNotSupported(Compression),
    IoError(io::Error),
}

impl From<io::Error> for DecompressError {
    fn from(e: io::Error) -> Self {
        DecompressError::IoError(e)
    }
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompressError::LzwDecodeError(e) => write!(f, "LZW解码失败: {e:?}"),
            DecompressError::LzwEncodeError(e) => write!(f, "LZW编码失败: {e:?}"),
            DecompressError::CompressionNotSupported(c) => write!(f, "不支持的压缩方式: {c:?}"),
            DecompressError::IoError(e) => write!(f, "压缩流IO错误: {e}"),
        }
    }
}

impl std::error::Error for DecompressError {}

/// TIFF Compression 标签值
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum Compression {
    Uncompressed = 1,
    Lzw = 5,
    /// Adobe 风格的 Deflate,GDAL 写出 DEFLATE 时使用此值
    DeflateAdobe = 8,
    /// 旧的 Deflate 编号,只用于读取
    Deflate = 32946,

    #[num_enum(default)]
    Unknown = 0x0000,
}

impl Compression {
    /// 解压一个瓦片
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, DecompressError> {
        match self {
            Self::Uncompressed => Ok(bytes.to_vec()),
            Self::Lzw => TiffStyleDecoder::decode_to_vec(bytes).map_err(DecompressError::LzwDecodeError),
            Self::DeflateAdobe | Self::Deflate => {
                let mut buf = vec![];
                flate2::read::ZlibDecoder::new(bytes).read_to_end(&mut buf)?;
                Ok(buf)
            }
            other => Err(DecompressError::CompressionNotSupported(*other)),
        }
    }

    /// 压缩一个瓦片
    pub fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>, DecompressError> {
        match self {
            Self::Uncompressed => Ok(bytes.to_vec()),
            Self::Lzw => TiffStyleEncoder::encode_to_vec(bytes).map_err(DecompressError::LzwEncodeError),
            Self::DeflateAdobe => {
                let mut encoder =
                    flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(bytes)?;
                Ok(encoder.finish()?)
            }
            other => Err(DecompressError::CompressionNotSupported(*other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        (0..4096u32).flat_map(|i| ((i / 7) as f32).to_le_bytes()).collect()
    }

    #[test]
    fn lzw_round_trip() {
        let data = sample();
        let packed = Compression::Lzw.encode(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(Compression::Lzw.decode(&packed).unwrap(), data);
    }

    #[test]
    fn deflate_round_trip() {
        let data = sample();
        let packed = Compression::DeflateAdobe.encode(&data).unwrap();
        assert_eq!(Compression::DeflateAdobe.decode(&packed).unwrap(), data);
        assert_eq!(Compression::Deflate.decode(&packed).unwrap(), data);
    }

    #[test]
    fn unknown_codes_are_rejected() {
        let compression = Compression::from(7u16);
        assert_eq!(compression, Compression::Unknown);
        assert!(matches!(
            compression.encode(&[1, 2, 3]),
            Err(DecompressError::CompressionNotSupported(Compression::Unknown))
        ));
    }
}
