//! 栅格像元类型与数据块
//!
//! ArcInfo Grid 只有两种像元:32位有符号整数和32位浮点数。[`RasterBlock`]
//! 以原生类型保存一块像元,解码器产生它,编码器消费它,中间不做任何数值换算。

use crate::tiff::Endian;
use std::fmt::Display;

mod photometrics;

pub use photometrics::{PhotometricInterpretation, PlanarConfiguration, SampleFormat};

/// 像元类型
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PixelType {
    /// 分类栅格,ArcInfo 单元类型 1
    Int32,
    /// 连续栅格,ArcInfo 单元类型 2
    Float32,
}

impl PixelType {
    pub const fn bits_per_sample(&self) -> u16 {
        32
    }

    pub const fn bytes_per_sample(&self) -> usize {
        4
    }

    pub const fn sample_format(&self) -> SampleFormat {
        match self {
            PixelType::Int32 => SampleFormat::Signed,
            PixelType::Float32 => SampleFormat::Float,
        }
    }

    /// 由 TIFF 的 SampleFormat 与 BitsPerSample 反推像元类型
    pub fn from_sample_format(format: SampleFormat, bits: u16) -> Option<Self> {
        match (format, bits) {
            (SampleFormat::Signed, 32) => Some(PixelType::Int32),
            (SampleFormat::Float, 32) => Some(PixelType::Float32),
            _ => None,
        }
    }
}

/// 按原生类型保存的像元
#[derive(Debug, PartialEq, Clone)]
pub enum PixelData {
    Int32(Vec<i32>),
    Float32(Vec<f32>),
}

impl PixelData {
    /// 用无数据值填满 `len` 个像元
    ///
    /// 整数栅格的无数据值按截断转换,浮点栅格按 `f32` 精度转换。
    pub fn filled(pixel_type: PixelType, len: usize, nodata: f64) -> Self {
        match pixel_type {
            PixelType::Int32 => PixelData::Int32(vec![nodata as i32; len]),
            PixelType::Float32 => PixelData::Float32(vec![nodata as f32; len]),
        }
    }

    pub fn pixel_type(&self) -> PixelType {
        match self {
            PixelData::Int32(_) => PixelType::Int32,
            PixelData::Float32(_) => PixelType::Float32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelData::Int32(v) => v.len(),
            PixelData::Float32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按字节序序列化
    pub fn to_bytes(&self, endian: Endian) -> Vec<u8> {
        match self {
            PixelData::Int32(v) => endian.encode_all(v),
            PixelData::Float32(v) => endian.encode_all(v),
        }
    }

    /// 按字节序反序列化,长度不是4的倍数时返回 `None`
    pub fn from_bytes(pixel_type: PixelType, bytes: &[u8], endian: Endian) -> Option<Self> {
        if bytes.len() % pixel_type.bytes_per_sample() != 0 {
            return None;
        }
        match pixel_type {
            PixelType::Int32 => endian.decode_all::<4, i32>(bytes).map(PixelData::Int32),
            PixelType::Float32 => endian.decode_all::<4, f32>(bytes).map(PixelData::Float32),
        }
    }
}

/// 块尺寸与数据长度不一致
#[derive(Debug, PartialEq)]
pub struct BufferSizeError {
    pub dimensions: (u32, u32),
    pub actual: usize,
}

/// 一块矩形像元,行优先
#[derive(Debug, PartialEq, Clone)]
pub struct RasterBlock {
    /// (宽, 高)
    pub dimensions: (u32, u32),
    pub data: PixelData,
}

impl RasterBlock {
    pub fn new(dimensions: (u32, u32), data: PixelData) -> Result<Self, BufferSizeError> {
        let required = dimensions.0 as usize * dimensions.1 as usize;
        if data.len() != required {
            return Err(BufferSizeError {
                dimensions,
                actual: data.len(),
            });
        }
        Ok(Self { dimensions, data })
    }

    /// 全部为无数据值的块
    pub fn nodata(dimensions: (u32, u32), pixel_type: PixelType, nodata: f64) -> Self {
        let len = dimensions.0 as usize * dimensions.1 as usize;
        Self {
            dimensions,
            data: PixelData::filled(pixel_type, len, nodata),
        }
    }

    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    pub fn pixel_type(&self) -> PixelType {
        self.data.pixel_type()
    }

    /// 把 `src` 中 (src_x, src_y) 起、大小 `size` 的矩形复制到本块的 (dst_x, dst_y)
    ///
    /// 调用方保证两个矩形都在各自块内且像元类型相同,类型不同时不做任何事。
    pub fn copy_from(
        &mut self,
        src: &RasterBlock,
        (src_x, src_y): (u32, u32),
        (dst_x, dst_y): (u32, u32),
        (width, height): (u32, u32),
    ) {
        let src_stride = src.dimensions.0 as usize;
        let dst_stride = self.dimensions.0 as usize;
        let w = width as usize;
        for row in 0..height as usize {
            let s = (src_y as usize + row) * src_stride + src_x as usize;
            let d = (dst_y as usize + row) * dst_stride + dst_x as usize;
            match (&mut self.data, &src.data) {
                (PixelData::Int32(dst), PixelData::Int32(source)) => {
                    dst[d..d + w].copy_from_slice(&source[s..s + w])
                }
                (PixelData::Float32(dst), PixelData::Float32(source)) => {
                    dst[d..d + w].copy_from_slice(&source[s..s + w])
                }
                _ => return,
            }
        }
    }

    /// 取一个像元的值,转为 `f64` 便于比较和显示
    pub fn get(&self, x: u32, y: u32) -> Option<f64> {
        if x >= self.dimensions.0 || y >= self.dimensions.1 {
            return None;
        }
        let i = y as usize * self.dimensions.0 as usize + x as usize;
        match &self.data {
            PixelData::Int32(v) => v.get(i).map(|p| *p as f64),
            PixelData::Float32(v) => v.get(i).map(|p| *p as f64),
        }
    }
}

impl Display for RasterBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RasterBlock({}x{}, {:?})",
            self.dimensions.0,
            self.dimensions.1,
            self.pixel_type()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodata_block_keeps_sentinel_bits() {
        let block = RasterBlock::nodata((2, 2), PixelType::Float32, -f32::MAX as f64);
        let PixelData::Float32(values) = &block.data else {
            panic!("expected float data");
        };
        assert!(values.iter().all(|v| v.to_bits() == (-f32::MAX).to_bits()));
    }

    #[test]
    fn copy_from_places_window() {
        let src = RasterBlock::new((2, 2), PixelData::Int32(vec![1, 2, 3, 4])).unwrap();
        let mut dst = RasterBlock::nodata((3, 3), PixelType::Int32, -1.0);
        dst.copy_from(&src, (1, 0), (0, 1), (1, 2));
        assert_eq!(
            dst.data,
            PixelData::Int32(vec![-1, -1, -1, 2, -1, -1, 4, -1, -1])
        );
    }

    #[test]
    fn rejects_wrong_buffer_length() {
        let err = RasterBlock::new((2, 2), PixelData::Float32(vec![0.0; 3])).unwrap_err();
        assert_eq!(err.actual, 3);
    }

    #[test]
    fn little_endian_bytes_round_trip() {
        let data = PixelData::Int32(vec![-2147483647, 0, 42]);
        let bytes = data.to_bytes(Endian::Little);
        assert_eq!(&bytes[..4], &(-2147483647i32).to_le_bytes());
        assert_eq!(
            PixelData::from_bytes(PixelType::Int32, &bytes, Endian::Little),
            Some(data)
        );
    }
}
