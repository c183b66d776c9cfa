//! ArcInfo 二进制栅格(ADF)解码
//!
//! 数据集是一个目录,包含:
//!
//! - `hdr.adf`:单元类型、单元大小与块布局
//! - `dblbnd.adf`:范围
//! - `w001001.adf` / `w001001x.adf`:第一个瓦片文件及其索引,更大的栅格还有
//!   `w002001.adf`、`w001000.adf`、`z001001.adf` 等
//! - `prj.adf`(可选):投影
//! - `sta.adf`(可选):统计值
//!
//! 栅格被划分为 `block_width x block_height` 的块,块又按
//! `blocks_per_row x blocks_per_column` 组成瓦片文件,瓦片文件按行优先编号。

use crate::raster::RasterBlock;
use crate::spatial::{parse_crs, CrsDefinition, SpatialReference};
use tracing::{debug, info};

mod block;
mod error;
mod files;
mod header;
mod index;
mod stats;

pub use error::AdfError;
pub use files::FileSet;
pub use header::{DecodeOptions, GridHeader, FLOAT_NODATA, INT_NODATA};
pub use index::{BlockRange, TileFileIndex, TileIndex};
pub use stats::GridStatistics;

use header::{BOUNDS_FILE, HEADER_FILE};
use stats::STATISTICS_FILE;

const PROJECTION_FILE: &str = "prj.adf";

/// 打开数据集前必须存在的文件
pub const REQUIRED_FILES: [&str; 4] = [HEADER_FILE, BOUNDS_FILE, "w001001.adf", "w001001x.adf"];

/// 已打开的数据集
#[derive(Debug)]
pub struct AdfDataset {
    pub header: GridHeader,
    pub spatial_reference: SpatialReference,
    pub index: TileIndex,
    pub statistics: Option<GridStatistics>,
    files: FileSet,
}

impl AdfDataset {
    /// 打开数据集
    ///
    /// 先检查必需文件是否齐全,再解析头信息与索引。
    pub fn open(files: FileSet, options: &DecodeOptions) -> Result<Self, AdfError> {
        if let Some(missing) = REQUIRED_FILES.iter().find(|name| !files.contains(name)) {
            return Err(AdfError::MissingRequiredFile(missing.to_string()));
        }

        let header = GridHeader::parse(
            files.get(HEADER_FILE).unwrap_or_default(),
            files.get(BOUNDS_FILE).unwrap_or_default(),
            options,
        )?;
        let (tiles_x, tiles_y) = header.tile_file_grid();
        let index = TileIndex::build(&files, (tiles_x, tiles_y))?;

        let spatial_reference =
            SpatialReference::new(read_projection(&files), header.geo_transform());
        let statistics = read_statistics(&files);

        info!(
            "打开ArcInfo栅格: {}x{}, {:?}, 块 {}x{}, {} 个瓦片文件",
            header.columns,
            header.rows,
            header.pixel_type,
            header.block_width,
            header.block_height,
            tiles_x * tiles_y
        );

        Ok(Self {
            header,
            spatial_reference,
            index,
            statistics,
            files,
        })
    }

    /// 读取一个块,`coord` 为整个栅格上的 (块列, 块行)
    ///
    /// 缺失的块返回全无数据块。
    pub fn read_tile(&self, coord: (u32, u32)) -> Result<RasterBlock, AdfError> {
        let header = &self.header;
        let (blocks_x, blocks_y) = header.block_grid();
        let (bx, by) = coord;
        if bx >= blocks_x || by >= blocks_y {
            return Err(AdfError::tile(
                "w001001.adf",
                coord,
                format!("块坐标超出 {blocks_x}x{blocks_y} 的块网格"),
            ));
        }

        let dimensions = (header.block_width, header.block_height);
        let tile_file = (bx / header.blocks_per_row, by / header.blocks_per_column);
        let block = (by % header.blocks_per_column) * header.blocks_per_row
            + bx % header.blocks_per_row;

        let Some((name, range)) = self.index.locate(tile_file, block) else {
            debug!("块 {coord:?} 缺失,填充无数据");
            return Ok(RasterBlock::nodata(
                dimensions,
                header.pixel_type,
                header.nodata,
            ));
        };

        let bytes = self.files.get(name).unwrap_or_default();
        let data = block::decode_block(bytes, range, header)
            .map_err(|reason| AdfError::tile(name, coord, reason))?;
        RasterBlock::new(dimensions, data)
            .map_err(|e| AdfError::tile(name, coord, format!("像元数 {} 与块大小不符", e.actual)))
    }

    /// 读取任意窗口,栅格范围以外的部分填充无数据
    pub fn read_window(&self, x: u32, y: u32, width: u32, height: u32) -> Result<RasterBlock, AdfError> {
        let header = &self.header;
        let mut window = RasterBlock::nodata((width, height), header.pixel_type, header.nodata);

        let x_end = x.saturating_add(width).min(header.columns);
        let y_end = y.saturating_add(height).min(header.rows);
        if x >= x_end || y >= y_end {
            return Ok(window);
        }

        let (bw, bh) = (header.block_width, header.block_height);
        // 块边界可能超出 u32,交集在 u64 下计算,结果不超过 x_end/y_end
        let span = |start: u32, size: u32, lo: u32, hi: u32| {
            let begin = (start as u64 * size as u64).max(lo as u64);
            let end = ((start as u64 + 1) * size as u64).min(hi as u64);
            (begin as u32, end as u32)
        };
        for by in y / bh..=(y_end - 1) / bh {
            for bx in x / bw..=(x_end - 1) / bw {
                let block = self.read_tile((bx, by))?;
                // 块与窗口在栅格坐标下的交集
                let (left, right) = span(bx, bw, x, x_end);
                let (top, bottom) = span(by, bh, y, y_end);
                window.copy_from(
                    &block,
                    (left - bx * bw, top - by * bh),
                    (left - x, top - y),
                    (right - left, bottom - top),
                );
            }
        }
        Ok(window)
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }
}

/// 解析 `prj.adf`,文件缺失或为空时返回 `None`
pub fn read_projection(files: &FileSet) -> Option<CrsDefinition> {
    let bytes = files.get(PROJECTION_FILE)?;
    let crs = parse_crs(&String::from_utf8_lossy(bytes));
    match &crs {
        Some(crs) => debug!("投影: {crs}"),
        None => debug!("{PROJECTION_FILE} 为空"),
    }
    crs
}

/// 解析 `sta.adf`
pub fn read_statistics(files: &FileSet) -> Option<GridStatistics> {
    files.get(STATISTICS_FILE).and_then(GridStatistics::parse)
}

#[cfg(test)]
mod tests {
    use super::header::tests::{bounds_bytes, header_bytes};
    use super::*;
    use crate::raster::PixelData;

    /// 把块编码成数据文件与索引文件,块为 `None` 时索引长度为 0
    fn tile_files(blocks: &[Option<Vec<u8>>]) -> (Vec<u8>, Vec<u8>) {
        let mut data = vec![0u8; 100];
        let mut index = vec![0u8; 100];
        index[..4].copy_from_slice(&[0x00, 0x00, 0x27, 0x0A]);
        for block in blocks {
            match block {
                Some(body) => {
                    let offset = (data.len() / 2) as i32;
                    let words = (body.len() / 2) as i32;
                    index.extend_from_slice(&offset.to_be_bytes());
                    index.extend_from_slice(&words.to_be_bytes());
                    data.extend_from_slice(&(words as u16).to_be_bytes());
                    data.extend_from_slice(body);
                }
                None => index.extend_from_slice(&[0; 8]),
            }
        }
        (data, index)
    }

    fn int_dataset(blocks: &[Option<Vec<u8>>], columns: f64, rows: f64) -> FileSet {
        let (data, index) = tile_files(blocks);
        FileSet::new()
            .with_file("hdr.adf", header_bytes(1, true, 1.0, (2, 2)))
            .with_file("dblbnd.adf", bounds_bytes(0.0, 0.0, columns, rows))
            .with_file("w001001.adf", data)
            .with_file("w001001x.adf", index)
    }

    #[test]
    fn missing_file_reported_before_parsing() {
        let mut files = int_dataset(&[], 2.0, 2.0);
        files.remove("dblbnd.adf");
        files.insert("hdr.adf", vec![0; 3]);
        let err = AdfDataset::open(files, &DecodeOptions::new()).unwrap_err();
        assert!(matches!(err, AdfError::MissingRequiredFile(name) if name == "dblbnd.adf"));
    }

    #[test]
    fn window_spans_blocks_and_pads() {
        // 3x3 栅格,2x2 块,共 2x2 个块;右下块缺失。
        // 瓦片文件每行 8 块,所以第二行的块从索引 8 开始
        let mut blocks = vec![None; 9];
        blocks[0] = Some(vec![0x00, 1, 1, 0]);
        blocks[1] = Some(vec![0x00, 1, 2, 0]);
        blocks[8] = Some(vec![0x00, 1, 3, 0]);
        let dataset = AdfDataset::open(int_dataset(&blocks, 3.0, 3.0), &DecodeOptions::new())
            .unwrap();
        assert_eq!(dataset.header.block_grid(), (2, 2));

        let window = dataset.read_window(0, 0, 4, 4).unwrap();
        let n = INT_NODATA as i32;
        assert_eq!(
            window.data,
            PixelData::Int32(vec![
                1, 1, 2, n, //
                1, 1, 2, n, //
                3, 3, n, n, //
                n, n, n, n,
            ])
        );
    }

    #[test]
    fn corrupt_block_names_file_and_tile() {
        let blocks = vec![Some(vec![0xF8, 0, 9, 1])];
        let dataset = AdfDataset::open(int_dataset(&blocks, 2.0, 2.0), &DecodeOptions::new())
            .unwrap();
        let err = dataset.read_tile((0, 0)).unwrap_err();
        assert!(matches!(
            err,
            AdfError::TileDecodeError { ref file, tile: (0, 0), .. } if file == "w001001.adf"
        ));
        assert!(dataset.read_tile((1, 0)).is_err());
    }

    #[test]
    fn projection_is_optional() {
        let files = int_dataset(&[], 2.0, 2.0);
        assert_eq!(read_projection(&files), None);
        let files = files.with_file("prj.adf", b"Projection GEOGRAPHIC\nDatum WGS84\n".to_vec());
        assert_eq!(read_projection(&files).and_then(|crs| crs.epsg), Some(4326));
    }
}
