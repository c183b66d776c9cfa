//! 瓦片索引文件 `wNNN001x.adf` 等
//!
//! 瓦片文件按 (列, 行) 命名:第 0 行为 `wCCC001`,第 1 行为 `wCCC000`,
//! 第 2 行起为 `zCCCRRR`,其中 CCC 是列号加一,RRR 是行号减一。
//!
//! 100 字节的文件头(与 shapefile 索引相同,以 `0x0000270A` 开头)之后,
//! 每个块一对大端 i32:偏移与长度,单位都是 16 位字。

use super::{AdfError, FileSet};
use crate::tiff::Endian;
use tracing::{debug, warn};

const INDEX_HEADER_LEN: usize = 100;
const INDEX_MAGIC: [u8; 4] = [0x00, 0x00, 0x27, 0x0A];

/// 瓦片文件 (列, 行) 的数据文件名与索引文件名
pub(crate) fn tile_file_names(tile: (u32, u32)) -> (String, String) {
    let (tx, ty) = tile;
    let base = match ty {
        0 => format!("w{:03}001", tx + 1),
        1 => format!("w{:03}000", tx + 1),
        _ => format!("z{:03}{:03}", tx + 1, ty - 1),
    };
    (format!("{base}.adf"), format!("{base}x.adf"))
}

/// 块在数据文件中的位置,单位为字节,不含 2 字节的长度前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub offset: u64,
    pub length: u64,
}

/// 一个瓦片文件的块索引
#[derive(Debug, Clone, PartialEq)]
pub struct TileFileIndex {
    pub data_file: String,
    pub blocks: Vec<BlockRange>,
}

/// 全部瓦片文件的索引,打开数据集时建立,之后不再修改
#[derive(Debug, Clone, PartialEq)]
pub struct TileIndex {
    /// 瓦片文件的排布 (横向, 纵向)
    pub grid: (u32, u32),
    /// 按行优先排列,缺失的文件为 `None`
    pub files: Vec<Option<TileFileIndex>>,
}

impl TileIndex {
    /// 为 `grid` 排布的瓦片文件建立索引
    ///
    /// 第一个瓦片文件由调用方保证存在;其余缺失的按全无数据处理。
    pub fn build(files: &FileSet, grid: (u32, u32)) -> Result<Self, AdfError> {
        let (tiles_x, tiles_y) = grid;
        let mut entries = Vec::with_capacity(tiles_x as usize * tiles_y as usize);
        for tile in (0..tiles_y).flat_map(|ty| (0..tiles_x).map(move |tx| (tx, ty))) {
            let (data_file, index_file) = tile_file_names(tile);
            let entry = match (files.contains(&data_file), files.get(&index_file)) {
                (true, Some(bytes)) => Some(TileFileIndex {
                    blocks: parse_index(bytes, &index_file)?,
                    data_file,
                }),
                (false, None) => {
                    debug!("瓦片文件 {data_file} 不存在,按无数据处理");
                    None
                }
                _ => {
                    warn!("瓦片文件 {data_file} 与其索引不成对,按无数据处理");
                    None
                }
            };
            entries.push(entry);
        }
        Ok(Self {
            grid,
            files: entries,
        })
    }

    /// 查找瓦片文件 (列, 行) 中第 `block` 个块的位置
    ///
    /// 文件缺失、超出索引或长度为 0 时返回 `None`。
    pub fn locate(&self, tile: (u32, u32), block: u32) -> Option<(&str, BlockRange)> {
        let (tx, ty) = tile;
        if tx >= self.grid.0 || ty >= self.grid.1 {
            return None;
        }
        let slot = ty as usize * self.grid.0 as usize + tx as usize;
        let index = self.files.get(slot)?.as_ref()?;
        let range = index.blocks.get(block as usize)?;
        (range.length > 0).then_some((index.data_file.as_str(), *range))
    }
}

fn parse_index(bytes: &[u8], file: &str) -> Result<Vec<BlockRange>, AdfError> {
    if bytes.len() < INDEX_HEADER_LEN {
        return Err(AdfError::corrupt(
            file,
            format!("索引文件长度 {} 字节,少于文件头的 {INDEX_HEADER_LEN}", bytes.len()),
        ));
    }
    if bytes[..4] != INDEX_MAGIC {
        return Err(AdfError::corrupt(file, "索引文件标识错误"));
    }

    let blocks: Vec<BlockRange> = bytes[INDEX_HEADER_LEN..]
        .chunks_exact(8)
        .filter_map(|entry| {
            let offset = Endian::Big.decode_at::<4, i32>(entry, 0)?;
            let length = Endian::Big.decode_at::<4, i32>(entry, 4)?;
            Some(match (u64::try_from(offset), u64::try_from(length)) {
                (Ok(offset), Ok(length)) => BlockRange {
                    offset: offset * 2,
                    length: length * 2,
                },
                // 负值视为空块
                _ => BlockRange {
                    offset: 0,
                    length: 0,
                },
            })
        })
        .collect();
    debug!("{file}: {} 个块", blocks.len());
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_bytes(entries: &[(i32, i32)]) -> Vec<u8> {
        let mut bytes = vec![0u8; INDEX_HEADER_LEN];
        bytes[..4].copy_from_slice(&INDEX_MAGIC);
        for (offset, length) in entries {
            bytes.extend_from_slice(&offset.to_be_bytes());
            bytes.extend_from_slice(&length.to_be_bytes());
        }
        bytes
    }

    #[test]
    fn ranges_are_in_bytes() {
        let files = FileSet::new()
            .with_file("w001001.adf", vec![])
            .with_file("w001001x.adf", index_bytes(&[(50, 8), (55, 0)]));
        let index = TileIndex::build(&files, (2, 1)).unwrap();
        assert_eq!(
            index.locate((0, 0), 0),
            Some((
                "w001001.adf",
                BlockRange {
                    offset: 100,
                    length: 16
                }
            ))
        );
        // 长度为 0、超出索引、文件缺失
        assert_eq!(index.locate((0, 0), 1), None);
        assert_eq!(index.locate((0, 0), 2), None);
        assert_eq!(index.locate((1, 0), 0), None);
        assert_eq!(index.locate((0, 1), 0), None);
    }

    #[test]
    fn bad_index_magic() {
        let mut bytes = index_bytes(&[]);
        bytes[3] = 0;
        let files = FileSet::new()
            .with_file("w001001.adf", vec![])
            .with_file("w001001x.adf", bytes);
        assert!(matches!(
            TileIndex::build(&files, (1, 1)),
            Err(AdfError::CorruptHeader { .. })
        ));
    }

    #[test]
    fn tile_file_numbering() {
        let data = |tile| tile_file_names(tile).0;
        assert_eq!(data((0, 0)), "w001001.adf");
        assert_eq!(data((11, 0)), "w012001.adf");
        assert_eq!(data((0, 1)), "w001000.adf");
        assert_eq!(data((2, 2)), "z003001.adf");
        assert_eq!(data((0, 5)), "z001004.adf");
        assert_eq!(tile_file_names((1, 1)).1, "w002000x.adf");
    }

    #[test]
    fn lower_tile_rows_are_indexed() {
        let entry = index_bytes(&[(50, 4)]);
        let files = FileSet::new()
            .with_file("w001001.adf", vec![])
            .with_file("w001001x.adf", entry.clone())
            .with_file("w001000.adf", vec![])
            .with_file("w001000x.adf", entry.clone())
            .with_file("z001001.adf", vec![])
            .with_file("z001001x.adf", entry);
        let index = TileIndex::build(&files, (1, 3)).unwrap();
        assert_eq!(index.locate((0, 1), 0).map(|(name, _)| name), Some("w001000.adf"));
        assert_eq!(index.locate((0, 2), 0).map(|(name, _)| name), Some("z001001.adf"));
    }
}
