//! 读回写出的 GeoTIFF
//!
//! 用于转换结束后的校验:重新解析文件头与 IFD,并能解压任意瓦片。

use crate::compression::{Compression, DecompressError};
use crate::geotags::{GeoTags, GeoTiffError};
use crate::raster::{PixelData, PixelType, RasterBlock, SampleFormat};
use crate::spatial::SpatialReference;
use crate::tiff::{Ifd, TagId, Tiff, TiffError, TiffVariant};
use std::fmt;
use std::io::Cursor;

#[derive(Debug)]
pub enum VerifyError {
    Tiff(TiffError),
    Decompress(DecompressError),
    /// 瓦片坐标越界或数据长度不对
    BadTile { tile: (u32, u32), reason: String },
}

impl From<TiffError> for VerifyError {
    fn from(e: TiffError) -> Self {
        VerifyError::Tiff(e)
    }
}

impl From<DecompressError> for VerifyError {
    fn from(e: DecompressError) -> Self {
        VerifyError::Decompress(e)
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::Tiff(e) => write!(f, "{e}"),
            VerifyError::Decompress(e) => write!(f, "{e}"),
            VerifyError::BadTile { tile, reason } => write!(f, "瓦片 {tile:?} 无效: {reason}"),
        }
    }
}

impl std::error::Error for VerifyError {}

/// 单波段分块 GeoTIFF 的读取器
#[derive(Debug)]
pub struct GeoTiffReader<'a> {
    bytes: &'a [u8],
    tiff: Tiff,
    dimensions: (u32, u32),
    tile_size: (u32, u32),
    compression: Compression,
    pixel_type: PixelType,
    tile_offsets: Vec<u64>,
    tile_byte_counts: Vec<u64>,
}

impl<'a> GeoTiffReader<'a> {
    pub fn open(bytes: &'a [u8]) -> Result<Self, VerifyError> {
        let tiff = Tiff::open(&mut Cursor::new(bytes))?;
        let ifd = tiff.ifd0()?;

        let dimensions = (
            ifd.get_tag_value::<u32>(TagId::ImageWidth)?,
            ifd.get_tag_value::<u32>(TagId::ImageLength)?,
        );
        let tile_size = (
            ifd.get_tag_value::<u32>(TagId::TileWidth)?,
            ifd.get_tag_value::<u32>(TagId::TileLength)?,
        );
        if tile_size.0 == 0 || tile_size.1 == 0 {
            return Err(TiffError::BadTag(TagId::TileWidth).into());
        }
        let compression = Compression::from(ifd.get_tag_value::<u16>(TagId::Compression)?);
        let format = SampleFormat::from(ifd.get_tag_value::<u16>(TagId::SampleFormat)?);
        let bits = ifd.get_tag_value::<u16>(TagId::BitsPerSample)?;
        let pixel_type = PixelType::from_sample_format(format, bits)
            .ok_or(TiffError::BadTag(TagId::SampleFormat))?;

        let tile_offsets = ifd.get_tag_values::<u64>(TagId::TileOffsets)?;
        let tile_byte_counts = ifd.get_tag_values::<u64>(TagId::TileByteCounts)?;
        if tile_offsets.len() != tile_byte_counts.len() {
            return Err(TiffError::BadTag(TagId::TileByteCounts).into());
        }

        let reader = Self {
            bytes,
            dimensions,
            tile_size,
            compression,
            pixel_type,
            tile_offsets,
            tile_byte_counts,
            tiff,
        };
        let (cols, rows) = reader.tile_grid();
        if reader.tile_offsets.len() != cols as usize * rows as usize {
            return Err(TiffError::BadTag(TagId::TileOffsets).into());
        }
        Ok(reader)
    }

    pub fn tiff(&self) -> &Tiff {
        &self.tiff
    }

    fn ifd(&self) -> &Ifd {
        // open 已确认 IFD0 存在
        &self.tiff.ifds[0]
    }

    pub fn variant(&self) -> TiffVariant {
        self.tiff.variant
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    pub fn tile_size(&self) -> (u32, u32) {
        self.tile_size
    }

    pub fn tile_grid(&self) -> (u32, u32) {
        (
            self.dimensions.0.div_ceil(self.tile_size.0),
            self.dimensions.1.div_ceil(self.tile_size.1),
        )
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn geo_tags(&self) -> Result<GeoTags, GeoTiffError> {
        GeoTags::parse(self.ifd())
    }

    pub fn spatial_reference(&self) -> Option<SpatialReference> {
        self.geo_tags()
            .ok()
            .map(|tags| SpatialReference::from_geo_tags(&tags))
    }

    /// GDAL_NODATA 文本
    pub fn nodata(&self) -> Option<String> {
        self.ifd()
            .get_tag(TagId::GDALNoData)
            .ok()
            .and_then(|tag| tag.try_to_string())
    }

    /// GDAL_METADATA 文本
    pub fn metadata(&self) -> Option<String> {
        self.ifd()
            .get_tag(TagId::GDALMetadata)
            .ok()
            .and_then(|tag| tag.try_to_string())
    }

    /// 解压一个瓦片,`coord` 为 (瓦片列, 瓦片行)
    pub fn read_tile(&self, coord: (u32, u32)) -> Result<RasterBlock, VerifyError> {
        let bad = |reason: String| VerifyError::BadTile {
            tile: coord,
            reason,
        };
        let (cols, rows) = self.tile_grid();
        if coord.0 >= cols || coord.1 >= rows {
            return Err(bad(format!("超出 {cols}x{rows} 的瓦片网格")));
        }
        let index = coord.1 as usize * cols as usize + coord.0 as usize;
        let start = self.tile_offsets[index] as usize;
        let end = start.saturating_add(self.tile_byte_counts[index] as usize);
        let compressed = self
            .bytes
            .get(start..end)
            .ok_or_else(|| bad(format!("数据范围 {start}..{end} 超出文件")))?;

        let raw = self.compression.decode(compressed)?;
        let data = PixelData::from_bytes(self.pixel_type, &raw, self.tiff.endian)
            .ok_or_else(|| bad(format!("解压后长度 {} 无效", raw.len())))?;
        RasterBlock::new(self.tile_size, data)
            .map_err(|e| bad(format!("像元数 {} 与瓦片尺寸不符", e.actual)))
    }
}
