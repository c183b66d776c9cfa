//! 字节序编解码
//!
//! TIFF 输出固定为小端,而 ArcInfo Grid 的所有二进制文件都是大端,
//! 两边共用这里的 [`Endian`] 做数值与字节之间的转换。

use eio::{FromBytes, ReadExt, ToBytes};
use num_traits::{cast::NumCast, ToPrimitive};
use std::io::{Read, Result, Write};
use std::mem;

/// 字节序
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Endian {
    /// 大端,高位字节在前
    Big,
    /// 小端,低位字节在前
    Little,
}

impl Endian {
    /// 从流中读取 `N` 个字节并解码为 `T`
    pub fn read<const N: usize, T: FromBytes<N>>(&self, stream: &mut impl Read) -> Result<T> {
        let mut buf = [0u8; N];
        stream.read_exact(&mut buf)?;
        self.decode(buf)
    }

    /// 将定长字节数组解码为 `T`
    pub fn decode<const N: usize, T: FromBytes<N>>(&self, bytes: [u8; N]) -> Result<T> {
        match self {
            Endian::Big => bytes.as_slice().read_be(),
            Endian::Little => bytes.as_slice().read_le(),
        }
    }

    /// 从切片的 `offset` 处解码一个值,越界时返回 `None`
    ///
    /// 解析定长布局的文件头时使用,调用方自行决定越界算哪种错误。
    pub fn decode_at<const N: usize, T: FromBytes<N>>(
        &self,
        bytes: &[u8],
        offset: usize,
    ) -> Option<T> {
        let end = offset.checked_add(N)?;
        let arr: [u8; N] = bytes.get(offset..end)?.try_into().ok()?;
        self.decode(arr).ok()
    }

    /// 将字节切片按元素大小切分并逐个解码
    pub fn decode_all<const N: usize, T: FromBytes<N>>(&self, bytes: &[u8]) -> Option<Vec<T>> {
        bytes
            .chunks_exact(mem::size_of::<T>())
            .map(|chunk| {
                chunk
                    .try_into()
                    .ok()
                    .and_then(|arr| self.decode::<N, T>(arr).ok())
            })
            .collect()
    }

    /// 解码字节切片并转换为目标数值类型 `T`
    pub fn decode_all_to_primative<const N: usize, A: FromBytes<N> + ToPrimitive, T: NumCast>(
        &self,
        bytes: &[u8],
    ) -> Option<Vec<T>> {
        self.decode_all::<N, A>(bytes)?
            .into_iter()
            .map(|v| T::from(v))
            .collect()
    }

    /// 将单个值编码为字节数组
    pub fn encode<const N: usize, T: ToBytes<N>>(&self, value: T) -> [u8; N] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }

    /// 将值切片编码为连续的字节
    pub fn encode_all<const N: usize, T: ToBytes<N> + Copy>(&self, values: &[T]) -> Vec<u8> {
        values.iter().flat_map(|v| self.encode(*v)).collect()
    }

    /// 编码并写入输出流
    pub fn write<const N: usize, T: ToBytes<N>>(
        &self,
        stream: &mut impl Write,
        value: T,
    ) -> Result<()> {
        stream.write_all(&self.encode(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_header_fields() {
        let bytes = [0x00, 0x00, 0x01, 0x00, 0x40, 0x3E, 0x00, 0x00, 0, 0, 0, 0];
        assert_eq!(Endian::Big.decode_at::<4, i32>(&bytes, 0), Some(256));
        assert_eq!(Endian::Big.decode_at::<8, f64>(&bytes, 4), Some(30.0));
        assert_eq!(Endian::Big.decode_at::<4, i32>(&bytes, 10), None);
    }

    #[test]
    fn little_endian_round_trip() {
        let bytes = Endian::Little.encode_all(&[1u16, 0x0203]);
        assert_eq!(bytes, vec![1, 0, 3, 2]);
        let back: Vec<u16> = Endian::Little.decode_all::<2, u16>(&bytes).unwrap();
        assert_eq!(back, vec![1, 0x0203]);
    }
}
