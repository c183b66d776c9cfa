//! GeoTIFF 编码
//!
//! [`GeoTiffWriter`] 逐个接收瓦片,压缩后暂存在内存里,全部写完后由
//! [`GeoTiffWriter::finalize`] 一次性生成完整的 TIFF/BigTIFF 字节流:
//!
//! 1. 以全 0 的瓦片偏移编码文件头与 IFD
//! 2. 在 IFD 之后追加所有瓦片数据
//! 3. 回填 TileOffsets 与 TileByteCounts
//!
//! 输出固定为小端、单个 IFD、每个瓦片从偶数偏移开始。写入过程中出错时
//! 直接丢弃 writer,不会留下不完整的输出。

use crate::adf::{GridHeader, GridStatistics};
use crate::geotags::GeoTags;
use crate::raster::{PhotometricInterpretation, PixelType, PlanarConfiguration, RasterBlock};
use crate::spatial::SpatialReference;
use crate::tiff::{Endian, TagData, TagId, Tiff, TiffVariant};
use std::io::{Cursor, Seek, SeekFrom, Write};
use tracing::{debug, info, warn};

mod error;
mod options;
mod verify;

pub use error::{EncodeError, EncodeResult};
pub use options::{BigTiffMode, EncodeOptions, SupportedCompression};
pub use verify::{GeoTiffReader, VerifyError};

const ENDIAN: Endian = Endian::Little;

/// 经典 TIFF 的 32 位偏移能寻址的最大文件长度
pub(crate) const CLASSIC_TIFF_LIMIT: u64 = u32::MAX as u64;

/// 分块 GeoTIFF 写入器
#[derive(Debug)]
pub struct GeoTiffWriter {
    dimensions: (u32, u32),
    pixel_type: PixelType,
    nodata: f64,
    geo: GeoTags,
    options: EncodeOptions,
    statistics: Option<GridStatistics>,
    /// 瓦片网格 (横向, 纵向)
    grid: (u32, u32),
    /// 压缩后的瓦片数据
    body: Vec<u8>,
    /// 每个瓦片在 `body` 中的 (偏移, 长度),行优先
    tiles: Vec<Option<(u64, u64)>>,
    /// 超过此长度时需要 BigTIFF
    classic_limit: u64,
}

impl GeoTiffWriter {
    /// 根据栅格头、空间参考和选项创建写入器
    pub fn create(
        header: &GridHeader,
        spatial_reference: &SpatialReference,
        options: EncodeOptions,
    ) -> EncodeResult<Self> {
        let size = options.tile_size;
        if !size.is_power_of_two() {
            return Err(EncodeError::InvalidTileSize(size));
        }
        if size < 16 {
            warn!("瓦片大小 {size} 小于16,部分TIFF阅读器要求瓦片边长为16的倍数");
        }

        let grid = (
            header.columns.div_ceil(size),
            header.rows.div_ceil(size),
        );
        let tile_count = grid.0 as usize * grid.1 as usize;
        debug!(
            "创建GeoTIFF写入器: {}x{}, 瓦片 {size}, 网格 {}x{}, {}",
            header.columns, header.rows, grid.0, grid.1, options.compression
        );

        Ok(Self {
            dimensions: header.dimensions(),
            pixel_type: header.pixel_type,
            nodata: header.nodata,
            geo: spatial_reference.geo_tags(),
            options,
            statistics: None,
            grid,
            body: vec![],
            tiles: vec![None; tile_count],
            classic_limit: CLASSIC_TIFF_LIMIT,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_classic_limit(mut self, limit: u64) -> Self {
        self.classic_limit = limit;
        self
    }

    /// 附带写入 GDAL 统计元数据
    pub fn with_statistics(mut self, statistics: Option<GridStatistics>) -> Self {
        self.statistics = statistics;
        self
    }

    /// 瓦片网格 (横向, 纵向)
    pub fn tile_grid(&self) -> (u32, u32) {
        self.grid
    }

    pub fn tile_size(&self) -> u32 {
        self.options.tile_size
    }

    /// 已写入的瓦片数
    pub fn tiles_written(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_some()).count()
    }

    /// 压缩并保存一个瓦片,`coord` 为 (瓦片列, 瓦片行)
    pub fn write_tile(&mut self, coord: (u32, u32), block: RasterBlock) -> EncodeResult<()> {
        let size = self.options.tile_size;
        if block.dimensions != (size, size) {
            return Err(EncodeError::TileSizeMismatch {
                expected: (size, size),
                actual: block.dimensions,
            });
        }
        if block.pixel_type() != self.pixel_type {
            return Err(EncodeError::PixelTypeMismatch {
                expected: self.pixel_type,
                actual: block.pixel_type(),
            });
        }
        if coord.0 >= self.grid.0 || coord.1 >= self.grid.1 {
            return Err(EncodeError::TileOutOfRange {
                tile: coord,
                grid: self.grid,
            });
        }
        let index = coord.1 as usize * self.grid.0 as usize + coord.0 as usize;
        if self.tiles[index].is_some() {
            return Err(EncodeError::TileAlreadyWritten(coord));
        }

        let raw = block.data.to_bytes(ENDIAN);
        let compressed = self.options.compression.tag_value().encode(&raw)?;

        if self.body.len() % 2 == 1 {
            self.body.push(0);
        }
        let offset = self.body.len() as u64;
        self.body.extend_from_slice(&compressed);
        self.tiles[index] = Some((offset, compressed.len() as u64));
        Ok(())
    }

    /// 生成完整的 GeoTIFF 字节流
    pub fn finalize(self) -> EncodeResult<Vec<u8>> {
        let missing = self.tiles.iter().filter(|t| t.is_none()).count();
        if missing > 0 {
            return Err(EncodeError::IncompleteRaster { missing });
        }

        let variant = match self.options.big_tiff {
            BigTiffMode::Always => TiffVariant::Big,
            mode => {
                let size = self.encoded_size(TiffVariant::Normal)?;
                match (size <= self.classic_limit, mode) {
                    (true, _) => TiffVariant::Normal,
                    (false, BigTiffMode::Never) => return Err(EncodeError::FileTooLarge(size)),
                    (false, _) => {
                        info!("输出 {size} 字节超过经典TIFF上限,改用BigTIFF");
                        TiffVariant::Big
                    }
                }
            }
        };

        let tiff = self.build_tiff(variant);
        let mut cursor = Cursor::new(Vec::new());
        let offsets = tiff.encode(&mut cursor)?;
        let base = cursor.get_ref().len() as u64;

        let tiles: Vec<(u64, u64)> = self.tiles.iter().flatten().copied().collect();
        if let Some(ifd_offsets) = offsets.first() {
            // 回填瓦片偏移
            if let Some(position) = ifd_offsets.get(&u16::from(TagId::TileOffsets)) {
                cursor.seek(SeekFrom::Start(*position))?;
                let absolute: Vec<u64> = tiles.iter().map(|(offset, _)| base + offset).collect();
                match variant {
                    TiffVariant::Normal => cursor.write_all(&ENDIAN.encode_all(
                        &absolute.iter().map(|v| *v as u32).collect::<Vec<u32>>(),
                    ))?,
                    TiffVariant::Big => cursor.write_all(&ENDIAN.encode_all(&absolute))?,
                }
            }
            // 回填瓦片长度
            if let Some(position) = ifd_offsets.get(&u16::from(TagId::TileByteCounts)) {
                cursor.seek(SeekFrom::Start(*position))?;
                match variant {
                    TiffVariant::Normal => cursor.write_all(&ENDIAN.encode_all(
                        &tiles.iter().map(|(_, len)| *len as u32).collect::<Vec<u32>>(),
                    ))?,
                    TiffVariant::Big => cursor.write_all(&ENDIAN.encode_all(
                        &tiles.iter().map(|(_, len)| *len).collect::<Vec<u64>>(),
                    ))?,
                }
            }
        }

        cursor.seek(SeekFrom::End(0))?;
        cursor.write_all(&self.body)?;
        let bytes = cursor.into_inner();
        info!(
            "GeoTIFF编码完成: {} 字节, {} 个瓦片, {:?}",
            bytes.len(),
            tiles.len(),
            variant
        );
        Ok(bytes)
    }

    /// 按 `variant` 编码后的总字节数
    fn encoded_size(&self, variant: TiffVariant) -> EncodeResult<u64> {
        let mut cursor = Cursor::new(Vec::new());
        self.build_tiff(variant).encode(&mut cursor)?;
        Ok(cursor.get_ref().len() as u64 + self.body.len() as u64)
    }

    /// 构建 IFD,瓦片偏移与长度先填 0
    fn build_tiff(&self, variant: TiffVariant) -> Tiff {
        let tile_count = self.tiles.len();
        let size = self.options.tile_size;
        let mut tiff = Tiff::new(ENDIAN, variant);
        let ifd = tiff.ifd0_mut();

        ifd.set_tag(TagId::ImageWidth, TagData::from_long(self.dimensions.0), ENDIAN);
        ifd.set_tag(TagId::ImageLength, TagData::from_long(self.dimensions.1), ENDIAN);
        ifd.set_tag(
            TagId::BitsPerSample,
            TagData::from_short(self.pixel_type.bits_per_sample()),
            ENDIAN,
        );
        ifd.set_tag(
            TagId::Compression,
            TagData::from_short(self.options.compression.tag_value().into()),
            ENDIAN,
        );
        ifd.set_tag(
            TagId::PhotometricInterpretation,
            TagData::from_short(PhotometricInterpretation::BlackIsZero.into()),
            ENDIAN,
        );
        ifd.set_tag(TagId::SamplesPerPixel, TagData::from_short(1), ENDIAN);
        ifd.set_tag(
            TagId::PlanarConfiguration,
            TagData::from_short(PlanarConfiguration::Chunky.into()),
            ENDIAN,
        );

        let tile_side = match u16::try_from(size) {
            Ok(short) => TagData::from_short(short),
            Err(_) => TagData::from_long(size),
        };
        ifd.set_tag(TagId::TileWidth, tile_side.clone(), ENDIAN);
        ifd.set_tag(TagId::TileLength, tile_side, ENDIAN);
        let placeholder = match variant {
            TiffVariant::Normal => TagData::Long(vec![0; tile_count]),
            TiffVariant::Big => TagData::Long8(vec![0; tile_count]),
        };
        ifd.set_tag(TagId::TileOffsets, placeholder.clone(), ENDIAN);
        ifd.set_tag(TagId::TileByteCounts, placeholder, ENDIAN);
        ifd.set_tag(
            TagId::SampleFormat,
            TagData::from_short(self.pixel_type.sample_format().into()),
            ENDIAN,
        );

        self.geo.add_to_ifd(ifd, ENDIAN);

        if let Some(statistics) = &self.statistics {
            ifd.set_tag(
                TagId::GDALMetadata,
                TagData::from_string(&gdal_metadata(statistics)),
                ENDIAN,
            );
        }
        ifd.set_tag(
            TagId::GDALNoData,
            TagData::from_string(&format_nodata(self.nodata)),
            ENDIAN,
        );

        tiff
    }
}

/// GDAL_NODATA 文本:整数值不带小数,其余用科学计数法保证精确还原
pub fn format_nodata(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:e}")
    }
}

/// GDAL_METADATA 中的统计项
fn gdal_metadata(statistics: &GridStatistics) -> String {
    let items = [
        ("STATISTICS_MAXIMUM", statistics.max),
        ("STATISTICS_MEAN", statistics.mean),
        ("STATISTICS_MINIMUM", statistics.min),
        ("STATISTICS_STDDEV", statistics.stddev),
    ];
    let mut xml = String::from("<GDALMetadata>\n");
    for (name, value) in items {
        xml.push_str(&format!(
            "  <Item name=\"{name}\" sample=\"0\">{value}</Item>\n"
        ));
    }
    xml.push_str("</GDALMetadata>");
    xml
}
