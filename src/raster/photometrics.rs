//! 像元解释相关的 TIFF 枚举

use num_enum::{FromPrimitive, IntoPrimitive};

/// PhotometricInterpretation 标签值
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum PhotometricInterpretation {
    WhiteIsZero = 0,
    /// 单波段数据栅格使用此值
    BlackIsZero = 1,
    RGB = 2,

    #[num_enum(default)]
    Unknown = 0xFFFF,
}

/// SampleFormat 标签值
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum SampleFormat {
    /// 无符号整数
    Unsigned = 1,
    /// 有符号整数
    Signed = 2,
    /// IEEE 浮点数
    Float = 3,

    #[num_enum(default)]
    Unknown = 0xFFFF,
}

/// PlanarConfiguration 标签值
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum PlanarConfiguration {
    /// 样本交错存储,单波段时与 Planar 等价
    Chunky = 1,
    Planar = 2,

    #[num_enum(default)]
    Unknown = 0xFFFF,
}
