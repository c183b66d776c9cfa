//! TIFF 标签编号
//!
//! 只列出转换器会写出或在校验时读取的标签。
//! GeoTIFF 标签编号见 <https://docs.ogc.org/is/19-008r4/19-008r4.html#_geotiff_tags_for_coordinate_transformations>,
//! GDAL 私有标签见 GDAL GTiff 驱动文档。

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// TIFF 标签编号
#[derive(Debug, PartialEq, Clone, Copy, IntoPrimitive, TryFromPrimitive, Eq, Hash)]
#[repr(u16)]
pub enum TagId {
    /// 图像宽度(像元)
    ImageWidth = 0x0100,
    /// 图像高度(像元),TIFF 规范中称为 ImageLength
    ImageLength = 0x0101,
    BitsPerSample = 0x0102,
    Compression = 0x0103,
    PhotometricInterpretation = 0x0106,
    SamplesPerPixel = 0x0115,
    PlanarConfiguration = 0x011C,
    TileWidth = 0x0142,
    TileLength = 0x0143,
    /// 每个瓦片数据在文件中的起始偏移
    TileOffsets = 0x0144,
    /// 每个瓦片压缩后的字节数
    TileByteCounts = 0x0145,
    SampleFormat = 0x0153,

    // GeoTIFF
    ModelPixelScale = 0x830E,
    ModelTiepoint = 0x8482,
    ModelTransformation = 0x85D8,
    GeoKeyDirectory = 0x87AF,
    GeoDoubleParams = 0x87B0,
    GeoAsciiParams = 0x87B1,

    // GDAL
    /// GDAL 元数据(XML 文本)
    GDALMetadata = 0xA480,
    /// GDAL 无数据值(ASCII 文本)
    GDALNoData = 0xA481,
}
