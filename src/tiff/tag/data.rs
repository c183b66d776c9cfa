//! 标签取值
//!
//! 写出 GeoTIFF 只需要其中几种类型,其余 TIFF 类型在读取时按原始字节保存。

use super::TagType;
use crate::tiff::Endian;

/// 待写入的标签数据
#[derive(Clone, Debug, PartialEq)]
pub enum TagData {
    /// 8位无符号整数
    Byte(Vec<u8>),
    /// ASCII 文本,必须以 NUL 结尾
    Ascii(Vec<u8>),
    /// 16位无符号整数
    Short(Vec<u16>),
    /// 32位无符号整数
    Long(Vec<u32>),
    /// 64位浮点数
    Double(Vec<f64>),
    /// 64位无符号整数,仅 BigTIFF 可用
    Long8(Vec<u64>),
}

impl TagData {
    /// 从字符串创建 ASCII 数据,自动补上结尾的 NUL
    pub fn from_string(s: &str) -> Self {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        Self::Ascii(bytes)
    }

    pub fn from_short(v: u16) -> Self {
        Self::Short(vec![v])
    }

    pub fn from_long(v: u32) -> Self {
        Self::Long(vec![v])
    }

    /// 元素个数(即 IFD 条目中的 count 字段)
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(vec) | Self::Ascii(vec) => vec.len(),
            Self::Short(vec) => vec.len(),
            Self::Long(vec) => vec.len(),
            Self::Double(vec) => vec.len(),
            Self::Long8(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tag_type(&self) -> TagType {
        match self {
            Self::Byte(_) => TagType::Byte,
            Self::Ascii(_) => TagType::Ascii,
            Self::Short(_) => TagType::Short,
            Self::Long(_) => TagType::Long,
            Self::Double(_) => TagType::Double,
            Self::Long8(_) => TagType::Long8,
        }
    }

    /// 按字节序编码
    pub fn bytes(&self, endian: Endian) -> Vec<u8> {
        match self {
            Self::Byte(vec) | Self::Ascii(vec) => vec.clone(),
            Self::Short(vec) => endian.encode_all(vec),
            Self::Long(vec) => endian.encode_all(vec),
            Self::Double(vec) => endian.encode_all(vec),
            Self::Long8(vec) => endian.encode_all(vec),
        }
    }
}
