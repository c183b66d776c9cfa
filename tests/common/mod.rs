//! 在内存中构造 ArcInfo Grid 数据集

#![allow(dead_code)]

use adftiff::adf::FileSet;

/// 栅格布局
pub struct GridLayout {
    /// 1 = 整数,2 = 浮点
    pub cell_type: i32,
    pub compressed: bool,
    pub cell_size: f64,
    pub lower_left: (f64, f64),
    pub dimensions: (u32, u32),
    pub block: (u32, u32),
    /// 每个瓦片文件的块数 (横向, 纵向)
    pub blocks_per_file: (u32, u32),
}

impl GridLayout {
    pub fn float(dimensions: (u32, u32), block: (u32, u32)) -> Self {
        Self {
            cell_type: 2,
            compressed: false,
            cell_size: 1.0,
            lower_left: (0.0, 0.0),
            dimensions,
            block,
            blocks_per_file: (8, 8),
        }
    }

    pub fn int(dimensions: (u32, u32), block: (u32, u32)) -> Self {
        Self {
            cell_type: 1,
            compressed: true,
            ..Self::float(dimensions, block)
        }
    }

    pub fn block_grid(&self) -> (u32, u32) {
        (
            self.dimensions.0.div_ceil(self.block.0),
            self.dimensions.1.div_ceil(self.block.1),
        )
    }

    pub fn header(&self) -> Vec<u8> {
        let mut hdr = vec![0u8; 308];
        hdr[..8].copy_from_slice(b"GRID1.2\0");
        hdr[16..20].copy_from_slice(&self.cell_type.to_be_bytes());
        let flag: i32 = if self.compressed { 0 } else { 1 };
        hdr[20..24].copy_from_slice(&flag.to_be_bytes());
        hdr[256..264].copy_from_slice(&self.cell_size.to_be_bytes());
        hdr[264..272].copy_from_slice(&self.cell_size.to_be_bytes());
        hdr[288..292].copy_from_slice(&(self.blocks_per_file.0 as i32).to_be_bytes());
        hdr[292..296].copy_from_slice(&(self.blocks_per_file.1 as i32).to_be_bytes());
        hdr[296..300].copy_from_slice(&(self.block.0 as i32).to_be_bytes());
        hdr[304..308].copy_from_slice(&(self.block.1 as i32).to_be_bytes());
        hdr
    }

    pub fn bounds(&self) -> Vec<u8> {
        let (llx, lly) = self.lower_left;
        let urx = llx + self.dimensions.0 as f64 * self.cell_size;
        let ury = lly + self.dimensions.1 as f64 * self.cell_size;
        [llx, lly, urx, ury]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect()
    }

    /// 由块内容生成数据集,`block_body(bx, by)` 返回 `None` 表示空块
    pub fn build(&self, mut block_body: impl FnMut(u32, u32) -> Option<Vec<u8>>) -> FileSet {
        let (blocks_x, blocks_y) = self.block_grid();
        let (per_x, per_y) = self.blocks_per_file;
        let tiles_x = blocks_x.div_ceil(per_x);
        let tiles_y = blocks_y.div_ceil(per_y);

        let mut files = FileSet::new()
            .with_file("hdr.adf", self.header())
            .with_file("dblbnd.adf", self.bounds());

        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let mut data = vec![0u8; 100];
                let mut index = vec![0u8; 100];
                index[..4].copy_from_slice(&[0x00, 0x00, 0x27, 0x0A]);
                for row in 0..per_y {
                    for col in 0..per_x {
                        let (bx, by) = (tx * per_x + col, ty * per_y + row);
                        let body = if bx < blocks_x && by < blocks_y {
                            block_body(bx, by)
                        } else {
                            None
                        };
                        match body {
                            Some(mut body) => {
                                if body.len() % 2 == 1 {
                                    body.push(0);
                                }
                                let offset = (data.len() / 2) as i32;
                                let words = (body.len() / 2) as i32;
                                index.extend_from_slice(&offset.to_be_bytes());
                                index.extend_from_slice(&words.to_be_bytes());
                                data.extend_from_slice(&(words as u16).to_be_bytes());
                                data.extend_from_slice(&body);
                            }
                            None => index.extend_from_slice(&[0; 8]),
                        }
                    }
                }
                let base = tile_file_base(tx, ty);
                files.insert(&format!("{base}.adf"), data);
                files.insert(&format!("{base}x.adf"), index);
            }
        }
        files
    }

    /// 浮点栅格,`values` 行优先,块中栅格以外的单元填 `fill`
    pub fn build_float(&self, values: &[f32], fill: f32) -> FileSet {
        let (bw, bh) = self.block;
        let (columns, rows) = self.dimensions;
        self.build(|bx, by| {
            let mut body = Vec::with_capacity((bw * bh * 4) as usize);
            for y in by * bh..(by + 1) * bh {
                for x in bx * bw..(bx + 1) * bw {
                    let value = if x < columns && y < rows {
                        values[(y * columns + x) as usize]
                    } else {
                        fill
                    };
                    body.extend_from_slice(&value.to_be_bytes());
                }
            }
            Some(body)
        })
    }
}

/// 瓦片文件 (列, 行) 的文件名主干
pub fn tile_file_base(tx: u32, ty: u32) -> String {
    match ty {
        0 => format!("w{:03}001", tx + 1),
        1 => format!("w{:03}000", tx + 1),
        _ => format!("z{:03}{:03}", tx + 1, ty - 1),
    }
}

/// 8 位原始值的压缩整数块
pub fn raw8_block(min: i8, values: &[u8]) -> Vec<u8> {
    let mut body = vec![0x08, 1, min as u8];
    body.extend_from_slice(values);
    body
}

/// 常数块
pub fn constant_block(value: i32) -> Vec<u8> {
    let mut body = vec![0x00, 4];
    body.extend_from_slice(&value.to_be_bytes());
    body
}
