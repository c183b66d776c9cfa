//! TIFF 标签
//!
//! [`Tag`] 保存编码后的原始字节,写出时直接拷贝,读取时按 [`TagType`] 解码成数值。

use super::Endian;
use eio::FromBytes;
use num_enum::{FromPrimitive, IntoPrimitive};
use num_traits::{cast::NumCast, ToPrimitive};
use std::fmt::Display;

mod data;
mod id;

pub use data::TagData;
pub use id::TagId;

/// 一个 IFD 条目
#[derive(Clone, Debug, PartialEq)]
pub struct Tag {
    /// 标签编号
    pub code: u16,
    /// 字段类型
    pub datatype: TagType,
    /// 元素个数
    pub count: usize,
    /// 已按 `endian` 编码的数据
    pub data: Vec<u8>,
    pub endian: Endian,
}

impl Tag {
    pub fn new(code: u16, endian: Endian, data: TagData) -> Self {
        Self {
            code,
            datatype: data.tag_type(),
            count: data.len(),
            data: data.bytes(endian),
            endian,
        }
    }

    pub fn id(&self) -> Option<TagId> {
        TagId::try_from(self.code).ok()
    }

    /// 只有一个元素时返回该元素
    pub fn value<T: NumCast + Copy>(&self) -> Option<T> {
        match self.values() {
            Some(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// 解码全部元素并转换为 `T`
    pub fn values<T: NumCast>(&self) -> Option<Vec<T>> {
        match self.datatype {
            TagType::Byte | TagType::Ascii | TagType::Undefined => self.decode::<1, u8, T>(),
            TagType::Short => self.decode::<2, u16, T>(),
            TagType::Long | TagType::Ifd => self.decode::<4, u32, T>(),
            TagType::SByte => self.decode::<1, i8, T>(),
            TagType::SShort => self.decode::<2, i16, T>(),
            TagType::SLong => self.decode::<4, i32, T>(),
            TagType::Float => self.decode::<4, f32, T>(),
            TagType::Double => self.decode::<8, f64, T>(),
            TagType::Long8 | TagType::Ifd8 => self.decode::<8, u64, T>(),
            TagType::SLong8 => self.decode::<8, i64, T>(),
            TagType::Rational | TagType::SRational | TagType::Unknown => None,
        }
    }

    /// ASCII 标签转为字符串,去掉结尾的 NUL
    pub fn try_to_string(&self) -> Option<String> {
        match self.datatype {
            TagType::Ascii => String::from_utf8(self.data.clone())
                .ok()
                .map(|s| s.trim_end_matches('\0').to_string()),
            _ => None,
        }
    }

    fn decode<const N: usize, A: FromBytes<N> + ToPrimitive, T: NumCast>(&self) -> Option<Vec<T>> {
        self.endian.decode_all_to_primative::<N, A, T>(&self.data)
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id_string = match self.id() {
            Some(id) => format!("{id:?}"),
            None => format!("Unknown({})", self.code),
        };
        let mut value_string = match (self.try_to_string(), self.values::<f64>()) {
            (Some(s), _) => s.replace('\n', "\\n"),
            (None, Some(v)) if v.len() == 1 => format!("{}", v[0]),
            (None, Some(v)) => format!("{v:?}"),
            (None, None) => "Undefined".to_string(),
        };
        if value_string.len() > 100 {
            let cut = (0..=98)
                .rev()
                .find(|i| value_string.is_char_boundary(*i))
                .unwrap_or(0);
            value_string = format!("{}...", &value_string[..cut]);
        }
        write!(
            f,
            "{} {:?}[{}]: {}",
            id_string, self.datatype, self.count, value_string
        )
    }
}

/// TIFF 字段类型
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum TagType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
    SByte = 6,
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    SRational = 10,
    Float = 11,
    Double = 12,
    Ifd = 13,
    Long8 = 16,
    SLong8 = 17,
    Ifd8 = 18,

    #[num_enum(default)]
    Unknown = 0xFFFF,
}

impl TagType {
    /// 单个元素占用的字节数
    pub const fn size_in_bytes(&self) -> usize {
        match self {
            TagType::Byte | TagType::Ascii | TagType::SByte | TagType::Undefined => 1,
            TagType::Short | TagType::SShort => 2,
            TagType::Long | TagType::SLong | TagType::Float | TagType::Ifd => 4,
            TagType::Rational | TagType::SRational => 8,
            TagType::Double | TagType::Long8 | TagType::SLong8 | TagType::Ifd8 => 8,
            TagType::Unknown => 1,
        }
    }
}
