//! `hdr.adf` 与 `dblbnd.adf`
//!
//! 两个文件都是大端。`hdr.adf` 的布局:
//!
//! | 偏移 | 类型 | 含义 |
//! |-----|------|------|
//! | 0   | 8 字节 | `GRID1.2\0` |
//! | 16  | i32  | 单元类型,1 = 整数,2 = 浮点 |
//! | 20  | i32  | 0 表示整数块经过压缩 |
//! | 256 | f64  | 单元宽 |
//! | 264 | f64  | 单元高 |
//! | 288 | i32  | 每个瓦片文件一行的块数 |
//! | 292 | i32  | 每个瓦片文件一列的块数 |
//! | 296 | i32  | 块宽(单元) |
//! | 304 | i32  | 块高(单元) |
//!
//! `dblbnd.adf` 依次是左下角 x、y 与右上角 x、y 四个 f64。

use super::AdfError;
use crate::raster::PixelType;
use crate::spatial::GeoTransform;
use crate::tiff::Endian;

pub(crate) const HEADER_FILE: &str = "hdr.adf";
pub(crate) const BOUNDS_FILE: &str = "dblbnd.adf";

const MAGIC: &[u8; 8] = b"GRID1.2\0";
const HEADER_LEN: usize = 308;

/// 单个块的最大单元数
const MAX_BLOCK_CELLS: u32 = 1 << 24;
/// 单个瓦片文件的最大块数
const MAX_BLOCKS_PER_FILE: u32 = 1 << 20;
/// 瓦片文件名中列号与行号各占三位
const MAX_TILE_FILES: (u32, u32) = (999, 1000);

/// 整数栅格的默认无数据值
pub const INT_NODATA: f64 = -2147483647.0;
/// 浮点栅格的默认无数据值,即 `-f32::MAX`
pub const FLOAT_NODATA: f64 = -3.4028234663852886e38;

/// 解码选项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeOptions {
    /// 覆盖格式默认的无数据值
    pub nodata: Option<f64>,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }
}

/// 栅格头信息
#[derive(Debug, Clone, PartialEq)]
pub struct GridHeader {
    pub columns: u32,
    pub rows: u32,
    /// (x, y),均为正
    pub cell_size: (f64, f64),
    /// 左下角
    pub origin: (f64, f64),
    /// 右上角的 y,即第一行的上边界
    pub top: f64,
    pub pixel_type: PixelType,
    pub nodata: f64,
    pub block_width: u32,
    pub block_height: u32,
    /// 每个瓦片文件在水平方向包含的块数
    pub blocks_per_row: u32,
    /// 每个瓦片文件在垂直方向包含的块数
    pub blocks_per_column: u32,
    /// 整数块是否压缩
    pub compressed: bool,
}

impl GridHeader {
    /// 解析 `hdr.adf` 与 `dblbnd.adf`
    pub fn parse(hdr: &[u8], bounds: &[u8], options: &DecodeOptions) -> Result<Self, AdfError> {
        if hdr.len() < HEADER_LEN {
            return Err(AdfError::corrupt(
                HEADER_FILE,
                format!("文件长度 {} 字节,至少需要 {HEADER_LEN}", hdr.len()),
            ));
        }
        if &hdr[..8] != MAGIC {
            return Err(AdfError::corrupt(HEADER_FILE, "文件标识不是 GRID1.2"));
        }

        let int_at = |offset| read_at::<4, i32>(hdr, offset, HEADER_FILE);
        let double_at = |offset| read_at::<8, f64>(hdr, offset, HEADER_FILE);

        let pixel_type = match int_at(16)? {
            1 => PixelType::Int32,
            2 => PixelType::Float32,
            other => {
                return Err(AdfError::corrupt(
                    HEADER_FILE,
                    format!("未知的单元类型 {other}"),
                ))
            }
        };
        let compressed = int_at(20)? == 0;

        let cell_size = (double_at(256)?, double_at(264)?);
        if !(cell_size.0.is_finite() && cell_size.0 > 0.0)
            || !(cell_size.1.is_finite() && cell_size.1 > 0.0)
        {
            return Err(AdfError::corrupt(
                HEADER_FILE,
                format!("无效的单元大小 {cell_size:?}"),
            ));
        }

        let positive = |offset: usize, what: &str| -> Result<u32, AdfError> {
            let value = int_at(offset)?;
            u32::try_from(value)
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| AdfError::corrupt(HEADER_FILE, format!("无效的{what} {value}")))
        };
        let blocks_per_row = positive(288, "每行块数")?;
        let blocks_per_column = positive(292, "每列块数")?;
        let block_width = positive(296, "块宽")?;
        let block_height = positive(304, "块高")?;
        if block_width
            .checked_mul(block_height)
            .map_or(true, |cells| cells > MAX_BLOCK_CELLS)
        {
            return Err(AdfError::corrupt(
                HEADER_FILE,
                format!("块大小 {block_width}x{block_height} 超过 {MAX_BLOCK_CELLS} 个单元"),
            ));
        }
        if blocks_per_row
            .checked_mul(blocks_per_column)
            .map_or(true, |blocks| blocks > MAX_BLOCKS_PER_FILE)
        {
            return Err(AdfError::corrupt(
                HEADER_FILE,
                format!(
                    "每个瓦片文件 {blocks_per_row}x{blocks_per_column} 个块,超过 {MAX_BLOCKS_PER_FILE}"
                ),
            ));
        }

        if bounds.len() < 32 {
            return Err(AdfError::corrupt(
                BOUNDS_FILE,
                format!("文件长度 {} 字节,需要 32", bounds.len()),
            ));
        }
        let llx = read_at::<8, f64>(bounds, 0, BOUNDS_FILE)?;
        let lly = read_at::<8, f64>(bounds, 8, BOUNDS_FILE)?;
        let urx = read_at::<8, f64>(bounds, 16, BOUNDS_FILE)?;
        let ury = read_at::<8, f64>(bounds, 24, BOUNDS_FILE)?;
        if ![llx, lly, urx, ury].iter().all(|v| v.is_finite()) {
            return Err(AdfError::corrupt(BOUNDS_FILE, "边界包含非有限值"));
        }

        let columns = cell_count((urx - llx) / cell_size.0)
            .ok_or_else(|| AdfError::corrupt(BOUNDS_FILE, "列数无效"))?;
        let rows = cell_count((ury - lly) / cell_size.1)
            .ok_or_else(|| AdfError::corrupt(BOUNDS_FILE, "行数无效"))?;
        if columns == 0 || rows == 0 {
            return Err(AdfError::corrupt(
                BOUNDS_FILE,
                format!("栅格为空 ({columns}x{rows})"),
            ));
        }

        let nodata = options.nodata.unwrap_or(match pixel_type {
            PixelType::Int32 => INT_NODATA,
            PixelType::Float32 => FLOAT_NODATA,
        });

        let header = Self {
            columns,
            rows,
            cell_size,
            origin: (llx, lly),
            top: ury,
            pixel_type,
            nodata,
            block_width,
            block_height,
            blocks_per_row,
            blocks_per_column,
            compressed,
        };
        let (tiles_x, tiles_y) = header.tile_file_grid();
        if tiles_x > MAX_TILE_FILES.0 || tiles_y > MAX_TILE_FILES.1 {
            return Err(AdfError::corrupt(
                HEADER_FILE,
                format!("需要 {tiles_x}x{tiles_y} 个瓦片文件,超出命名范围"),
            ));
        }
        Ok(header)
    }

    /// 用于内存栅格的头信息,块布局与输出无关
    pub fn new(
        dimensions: (u32, u32),
        cell_size: (f64, f64),
        lower_left: (f64, f64),
        pixel_type: PixelType,
        nodata: f64,
    ) -> Self {
        Self {
            columns: dimensions.0,
            rows: dimensions.1,
            cell_size,
            origin: lower_left,
            top: lower_left.1 + dimensions.1 as f64 * cell_size.1,
            pixel_type,
            nodata,
            block_width: dimensions.0,
            block_height: dimensions.1,
            blocks_per_row: 1,
            blocks_per_column: 1,
            compressed: false,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// 左上角坐标
    pub fn upper_left(&self) -> (f64, f64) {
        (self.origin.0, self.top)
    }

    pub fn geo_transform(&self) -> GeoTransform {
        let (x, y) = self.upper_left();
        GeoTransform::north_up(x, y, self.cell_size.0, self.cell_size.1)
    }

    /// 整个栅格的块数 (横向, 纵向)
    pub fn block_grid(&self) -> (u32, u32) {
        (
            self.columns.div_ceil(self.block_width),
            self.rows.div_ceil(self.block_height),
        )
    }

    /// 瓦片文件的排布 (横向, 纵向)
    pub fn tile_file_grid(&self) -> (u32, u32) {
        let (blocks_x, blocks_y) = self.block_grid();
        (
            blocks_x.div_ceil(self.blocks_per_row),
            blocks_y.div_ceil(self.blocks_per_column),
        )
    }
}

fn read_at<const N: usize, T: eio::FromBytes<N>>(
    bytes: &[u8],
    offset: usize,
    file: &str,
) -> Result<T, AdfError> {
    Endian::Big
        .decode_at(bytes, offset)
        .ok_or_else(|| AdfError::corrupt(file, format!("偏移 {offset} 处数据不足")))
}

fn cell_count(ratio: f64) -> Option<u32> {
    let count = ratio.round();
    (count.is_finite() && count >= 0.0 && count <= u32::MAX as f64).then_some(count as u32)
}
