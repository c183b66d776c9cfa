//! 图像文件目录(IFD)的读写

use num_traits::NumCast;

use super::{Endian, Tag, TagData, TagId, TagType, TiffError, TiffOffsets, TiffVariant};
use std::{
    collections::HashMap,
    io::{self, Read, Seek, SeekFrom, Write},
};

/// 一个 IFD,即一组标签
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ifd(pub Vec<Tag>);

impl Ifd {
    pub fn new() -> Self {
        Self(vec![])
    }

    /// 从 `offset` 处解析一个 IFD,返回它和下一个 IFD 的偏移
    pub fn parse<R: Read + Seek>(
        stream: &mut R,
        offset: u64,
        endian: Endian,
        variant: TiffVariant,
    ) -> io::Result<(Ifd, u64)> {
        stream.seek(SeekFrom::Start(offset))?;

        let tag_count = match variant {
            TiffVariant::Normal => endian.read::<2, u16>(stream)? as u64,
            TiffVariant::Big => endian.read(stream)?,
        };

        let mut tags = Vec::with_capacity(tag_count as usize);
        for _ in 0..tag_count {
            let code = endian.read(stream)?;
            let datatype: TagType = endian.read::<2, u16>(stream)?.into();
            let count = variant.read_offset(endian, stream)? as usize;

            let data_size = count * datatype.size_in_bytes();
            let offset_size = variant.offset_bytesize();
            let mut data: Vec<u8> = vec![0; data_size.max(offset_size)];

            if data_size > offset_size {
                // 数据放在条目外,条目里只有偏移
                let data_offset = variant.read_offset(endian, stream)?;
                let pos = stream.stream_position()?;
                stream.seek(SeekFrom::Start(data_offset))?;
                data.truncate(data_size);
                stream.read_exact(&mut data)?;
                stream.seek(SeekFrom::Start(pos))?;
            } else {
                stream.read_exact(&mut data)?;
                data.truncate(data_size);
            }

            tags.push(Tag {
                code,
                datatype,
                endian,
                count,
                data,
            });
        }

        let next_ifd_offset = variant.read_offset(endian, stream)?;
        Ok((Ifd(tags), next_ifd_offset))
    }

    pub fn get_tag_by_code(&self, code: u16) -> Option<&Tag> {
        self.0.iter().find(|tag| tag.code == code)
    }

    pub fn get_tag(&self, id: TagId) -> Result<&Tag, TiffError> {
        self.get_tag_by_code(id.into())
            .ok_or(TiffError::MissingTag(id))
    }

    pub fn get_tag_values<T: NumCast>(&self, id: TagId) -> Result<Vec<T>, TiffError> {
        self.get_tag(id)?.values().ok_or(TiffError::BadTag(id))
    }

    pub fn get_tag_value<T: NumCast + Copy>(&self, id: TagId) -> Result<T, TiffError> {
        self.get_tag(id)?.value().ok_or(TiffError::BadTag(id))
    }

    /// 设置标签,同编号的旧值会被替换
    pub fn set_tag<I: Into<u16>>(&mut self, id: I, data: TagData, endian: Endian) {
        let code: u16 = id.into();
        let tag = Tag::new(code, endian, data);
        match self.0.iter().position(|t| t.code == code) {
            Some(index) => self.0[index] = tag,
            None => self.0.push(tag),
        }
    }

    /// 按 TIFF 规范的顺序(标签编号升序)写出 IFD
    ///
    /// 放不进条目的数据紧跟在 IFD 之后写出,每块数据都从偶数偏移开始。
    /// 返回每个标签数据的实际文件位置,供之后回填瓦片偏移使用。
    pub fn encode<W: Write + Seek>(
        &self,
        stream: &mut W,
        endian: Endian,
        variant: TiffVariant,
        next_ifd: u64,
    ) -> Result<TiffOffsets, io::Error> {
        let mut tags: Vec<&Tag> = self.0.iter().collect();
        tags.sort_by_key(|tag| tag.code);

        let tag_count = tags.len();
        match variant {
            TiffVariant::Normal => endian.write(stream, tag_count as u16)?,
            TiffVariant::Big => endian.write(stream, tag_count as u64)?,
        };

        let offset_size = variant.offset_bytesize();
        let tag_size: u64 = match variant {
            TiffVariant::Normal => 12,
            TiffVariant::Big => 20,
        };
        let extra_data_offset =
            stream.stream_position()? + tag_size * tag_count as u64 + offset_size as u64;

        let mut offsets = HashMap::new();
        let mut extra_data: Vec<u8> = vec![];
        for tag in tags {
            endian.write(stream, tag.code)?;
            endian.write(stream, tag.datatype as u16)?;
            variant.write_offset(endian, stream, tag.count as u64)?;

            let offset = if tag.data.len() > offset_size {
                if (extra_data_offset + extra_data.len() as u64) % 2 == 1 {
                    extra_data.push(0);
                }
                let data_offset = extra_data_offset + extra_data.len() as u64;
                variant.write_offset(endian, stream, data_offset)?;
                extra_data.extend_from_slice(&tag.data);
                data_offset
            } else {
                let mut inline = tag.data.clone();
                inline.resize(offset_size, 0);
                let data_offset = stream.stream_position()?;
                stream.write_all(&inline)?;
                data_offset
            };
            offsets.insert(tag.code, offset);
        }

        variant.write_offset(endian, stream, next_ifd)?;
        stream.write_all(&extra_data)?;
        if stream.stream_position()? % 2 == 1 {
            stream.write_all(&[0])?;
        }

        Ok(offsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn encode_then_parse_keeps_tags_sorted() {
        let endian = Endian::Little;
        let mut ifd = Ifd::new();
        ifd.set_tag(TagId::TileWidth, TagData::from_short(256), endian);
        ifd.set_tag(TagId::ImageWidth, TagData::from_long(3), endian);
        ifd.set_tag(
            TagId::ModelPixelScale,
            TagData::Double(vec![30.0, 30.0, 0.0]),
            endian,
        );

        let mut cursor = Cursor::new(vec![0u8; 8]);
        cursor.set_position(8);
        let offsets = ifd
            .encode(&mut cursor, endian, TiffVariant::Normal, 0)
            .unwrap();
        assert_eq!(offsets[&<u16 as From<TagId>>::from(TagId::ModelPixelScale)] % 2, 0);

        let (parsed, next) = Ifd::parse(&mut cursor, 8, endian, TiffVariant::Normal).unwrap();
        assert_eq!(next, 0);
        let codes: Vec<u16> = parsed.0.iter().map(|t| t.code).collect();
        assert_eq!(codes, vec![0x0100, 0x0142, 0x830E]);
        assert_eq!(
            parsed.get_tag_values::<f64>(TagId::ModelPixelScale).unwrap(),
            vec![30.0, 30.0, 0.0]
        );
        assert_eq!(parsed.get_tag_value::<u32>(TagId::TileWidth).unwrap(), 256);
    }

    #[test]
    fn set_tag_replaces_existing_value() {
        let mut ifd = Ifd::new();
        ifd.set_tag(TagId::Compression, TagData::from_short(1), Endian::Little);
        ifd.set_tag(TagId::Compression, TagData::from_short(5), Endian::Little);
        assert_eq!(ifd.0.len(), 1);
        assert_eq!(ifd.get_tag_value::<u16>(TagId::Compression).unwrap(), 5);
    }
}
