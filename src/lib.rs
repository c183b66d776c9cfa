//! ArcInfo 二进制栅格(ADF)到分块压缩 GeoTIFF 的转换库
//!
//! 解码 ESRI ArcInfo Grid 的磁盘格式(文件头、范围、瓦片索引,以及游程/位打包的
//! 各种块),编码为带空间参考、分块、压缩的 GeoTIFF(经典 TIFF 或 BigTIFF)。
//!
//! # 示例
//! ```no_run
//! use adftiff::adf::DecodeOptions;
//! use adftiff::encode::{EncodeOptions, SupportedCompression};
//! use adftiff::{io, pipeline};
//!
//! let files = io::load_dir("/data/elevation")?;
//! let options = EncodeOptions::new().with_compression(SupportedCompression::Deflate);
//! let output = pipeline::convert_file_set(files, &DecodeOptions::new(), &options)?;
//! std::fs::write("elevation.tif", &output.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod adf; // ArcInfo Grid 解码
pub mod compression; // 瓦片压缩
pub mod encode; // GeoTIFF 编码
pub mod geotags; // GeoTIFF 地理标签
pub mod io; // 读取数据集目录
pub mod pipeline; // 解码到编码的流水线
pub mod raster; // 像元类型与数据块
pub mod spatial; // 空间参考
pub mod tiff; // TIFF 容器格式

pub use adf::{AdfDataset, AdfError, DecodeOptions, FileSet, GridHeader};
pub use encode::{BigTiffMode, EncodeError, EncodeOptions, GeoTiffWriter, SupportedCompression};
pub use pipeline::{convert, convert_file_set, CancelFlag, ConversionOutput, ConvertError};
pub use raster::{PixelData, PixelType, RasterBlock};
pub use spatial::SpatialReference;
