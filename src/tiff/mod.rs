//! TIFF 容器格式
//!
//! 负责 TIFF/BigTIFF 文件头与 IFD 的序列化。解析部分用于转换结束后的
//! 校验,以及在测试里把输出重新读回来。

use std::collections::HashMap;
use std::fmt::Display;
use std::io::{self, Read, Seek, Write};

mod endian;
mod error;
mod ifd;
mod tag;

pub use endian::Endian;
pub use error::TiffError;
pub use ifd::Ifd;
pub use tag::{Tag, TagData, TagId, TagType};

/// 经典 TIFF 与 BigTIFF
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum TiffVariant {
    /// 32位偏移
    Normal,
    /// 64位偏移
    Big,
}

impl TiffVariant {
    fn read_offset<R: Read>(&self, endian: Endian, stream: &mut R) -> io::Result<u64> {
        match self {
            TiffVariant::Normal => endian.read::<4, u32>(stream).map(|v| v as u64),
            TiffVariant::Big => endian.read(stream),
        }
    }

    fn write_offset<W: Write>(
        &self,
        endian: Endian,
        stream: &mut W,
        offset: u64,
    ) -> io::Result<()> {
        match self {
            TiffVariant::Normal => endian.write(stream, offset as u32),
            TiffVariant::Big => endian.write(stream, offset),
        }
    }

    /// 偏移字段的字节数
    pub const fn offset_bytesize(&self) -> usize {
        match self {
            TiffVariant::Normal => 4,
            TiffVariant::Big => 8,
        }
    }

    /// 文件头长度,第一个 IFD 紧随其后
    pub const fn header_size(&self) -> u64 {
        match self {
            TiffVariant::Normal => 8,
            TiffVariant::Big => 16,
        }
    }
}

/// 标签编号到其数据在文件中位置的映射
pub type TiffOffsets = HashMap<u16, u64>;

/// 一个 TIFF 文件的结构
#[derive(Clone, Debug)]
pub struct Tiff {
    pub endian: Endian,
    pub variant: TiffVariant,
    pub ifds: Vec<Ifd>,
}

impl Tiff {
    /// 创建只含一个空 IFD 的 TIFF
    pub fn new(endian: Endian, variant: TiffVariant) -> Self {
        Self {
            endian,
            variant,
            ifds: vec![Ifd::new()],
        }
    }

    /// 从流中解析文件头和全部 IFD
    pub fn open<R: Read + Seek>(stream: &mut R) -> Result<Self, TiffError> {
        let mut buf = [0; 4];
        stream.read_exact(&mut buf)?;

        let endian = match &buf[..2] {
            b"II" => Endian::Little,
            b"MM" => Endian::Big,
            _ => return Err(TiffError::BadMagicBytes),
        };

        let variant = match &buf[2..4] {
            b"\0*" | b"*\0" => TiffVariant::Normal,
            b"\0+" | b"+\0" => TiffVariant::Big,
            _ => return Err(TiffError::BadMagicBytes),
        };

        if TiffVariant::Big == variant {
            let offset_bytesize: u16 = endian.read(stream)?;
            let _reserved: u16 = endian.read(stream)?;
            if offset_bytesize != 8 {
                return Err(TiffError::BadMagicBytes);
            }
        }

        let mut ifds = vec![];
        let mut ifd_offset = variant.read_offset(endian, stream)?;
        while ifd_offset != 0 {
            let (ifd, next_offset) = Ifd::parse(stream, ifd_offset, endian, variant)?;
            ifd_offset = next_offset;
            ifds.push(ifd);
        }

        Ok(Self {
            endian,
            variant,
            ifds,
        })
    }

    pub fn ifd0(&self) -> Result<&Ifd, TiffError> {
        self.ifds.first().ok_or(TiffError::NoIfd0)
    }

    pub fn ifd0_mut(&mut self) -> &mut Ifd {
        if self.ifds.is_empty() {
            self.ifds.push(Ifd::new());
        }
        &mut self.ifds[0]
    }

    /// 写出文件头和所有 IFD,返回每个 IFD 的标签数据位置
    ///
    /// IFD 依次紧接在文件头之后,流的初始位置必须是 0。
    pub fn encode<W: Write + Seek>(&self, stream: &mut W) -> Result<Vec<TiffOffsets>, io::Error> {
        let endian = self.endian;

        match endian {
            Endian::Little => stream.write_all(b"II")?,
            Endian::Big => stream.write_all(b"MM")?,
        };

        match self.variant {
            TiffVariant::Normal => endian.write(stream, 0x002A_u16)?,
            TiffVariant::Big => {
                endian.write(stream, 0x002B_u16)?;
                endian.write(stream, 0x0008_u16)?;
                endian.write(stream, 0x0000_u16)?;
            }
        };
        self.variant
            .write_offset(endian, stream, self.variant.header_size())?;

        let mut offsets = vec![];
        for (i, ifd) in self.ifds.iter().enumerate() {
            let is_last = i + 1 == self.ifds.len();
            // 下一个 IFD 紧跟在本 IFD 的附加数据之后,写完本 IFD 才知道位置,先写 0 再回填
            let next_field = ifd_next_field_position(stream, ifd, self.variant)?;
            let ifd_offsets = ifd.encode(stream, endian, self.variant, 0)?;
            if !is_last {
                let here = stream.stream_position()?;
                stream.seek(io::SeekFrom::Start(next_field))?;
                self.variant.write_offset(endian, stream, here)?;
                stream.seek(io::SeekFrom::Start(here))?;
            }
            offsets.push(ifd_offsets);
        }

        Ok(offsets)
    }
}

/// 计算 IFD 中"下一个 IFD 偏移"字段的位置
fn ifd_next_field_position<W: Seek>(
    stream: &mut W,
    ifd: &Ifd,
    variant: TiffVariant,
) -> io::Result<u64> {
    let (count_size, tag_size) = match variant {
        TiffVariant::Normal => (2, 12),
        TiffVariant::Big => (8, 20),
    };
    Ok(stream.stream_position()? + count_size + tag_size * ifd.0.len() as u64)
}

impl Display for Tiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tiff: {{{:?} Endian, {:?} Variant}}",
            self.endian, self.variant
        )?;
        for (i, ifd) in self.ifds.iter().enumerate() {
            write!(f, "\n  IFD {i}:")?;
            for tag in ifd.0.iter() {
                write!(f, "\n    {}", tag)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn big_tiff_header_round_trip() {
        let mut tiff = Tiff::new(Endian::Little, TiffVariant::Big);
        tiff.ifd0_mut()
            .set_tag(TagId::ImageWidth, TagData::from_long(7), Endian::Little);
        tiff.ifd0_mut().set_tag(
            TagId::GDALNoData,
            TagData::from_string("-9999"),
            Endian::Little,
        );

        let mut cursor = Cursor::new(vec![]);
        tiff.encode(&mut cursor).unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(&bytes[..4], b"II+\0");

        let parsed = Tiff::open(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(parsed.variant, TiffVariant::Big);
        let ifd = parsed.ifd0().unwrap();
        assert_eq!(ifd.get_tag_value::<u32>(TagId::ImageWidth).unwrap(), 7);
        assert_eq!(
            ifd.get_tag(TagId::GDALNoData).unwrap().try_to_string(),
            Some("-9999".to_string())
        );
    }

    #[test]
    fn rejects_non_tiff() {
        let err = Tiff::open(&mut Cursor::new(b"GRID1.2\0".to_vec())).unwrap_err();
        assert!(matches!(err, TiffError::BadMagicBytes));
    }

    #[test]
    fn multiple_ifds_are_chained() {
        let mut tiff = Tiff::new(Endian::Little, TiffVariant::Normal);
        tiff.ifd0_mut()
            .set_tag(TagId::ImageWidth, TagData::from_long(1), Endian::Little);
        let mut second = Ifd::new();
        second.set_tag(TagId::ImageWidth, TagData::from_long(2), Endian::Little);
        tiff.ifds.push(second);

        let mut cursor = Cursor::new(vec![]);
        tiff.encode(&mut cursor).unwrap();
        let parsed = Tiff::open(&mut Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(parsed.ifds.len(), 2);
        assert_eq!(
            parsed.ifds[1].get_tag_value::<u32>(TagId::ImageWidth).unwrap(),
            2
        );
    }
}
