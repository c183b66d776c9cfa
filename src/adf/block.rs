//! 数据块解码
//!
//! 每个块以 2 字节的长度前缀(16 位字)开头。浮点块与未压缩的整数块是大端原始值;
//! 压缩的整数块由类型字节、最小值字节数与最小值组成块头,之后按类型解码,
//! 解码出的值都要加上最小值。

use super::index::BlockRange;
use super::GridHeader;
use crate::raster::{PixelData, PixelType};
use crate::tiff::Endian;

/// 按字节读取块数据,越界时给出原因
struct BlockReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BlockReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        let Some(end) = end else {
            return Err(format!(
                "数据截断:偏移 {} 处需要 {n} 字节,只剩 {}",
                self.pos,
                self.bytes.len().saturating_sub(self.pos)
            ));
        };
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, String> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, String> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn i32(&mut self) -> Result<i32, String> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// 从数据文件中取出并解码一个块,失败时返回原因
pub(crate) fn decode_block(
    file: &[u8],
    range: BlockRange,
    header: &GridHeader,
) -> Result<PixelData, String> {
    let start = usize::try_from(range.offset).map_err(|_| "块偏移过大".to_string())?;
    let length = usize::try_from(range.length).map_err(|_| "块长度过大".to_string())?;

    let mut reader = BlockReader::new(file);
    reader.take(start).map_err(|_| {
        format!("块偏移 {start} 超出数据文件长度 {}", file.len())
    })?;
    let prefix = reader.u16()? as usize * 2;
    if prefix != length {
        return Err(format!("长度前缀 {prefix} 与索引长度 {length} 不符"));
    }
    let body = reader.take(length)?;

    let pixels = header.block_width as usize * header.block_height as usize;
    match (header.pixel_type, header.compressed) {
        (PixelType::Float32, _) => raw_values::<f32>(body, pixels).map(PixelData::Float32),
        (PixelType::Int32, false) => raw_values::<i32>(body, pixels).map(PixelData::Int32),
        (PixelType::Int32, true) => {
            decode_compressed(body, pixels, header.nodata as i32).map(PixelData::Int32)
        }
    }
}

fn raw_values<T: eio::FromBytes<4>>(body: &[u8], pixels: usize) -> Result<Vec<T>, String> {
    let needed = pixels * 4;
    if body.len() < needed {
        return Err(format!("块需要 {needed} 字节,实际 {}", body.len()));
    }
    Endian::Big
        .decode_all::<4, T>(&body[..needed])
        .ok_or_else(|| "无法解码像元值".to_string())
}

/// 解码压缩整数块
pub(crate) fn decode_compressed(body: &[u8], pixels: usize, nodata: i32) -> Result<Vec<i32>, String> {
    let mut reader = BlockReader::new(body);
    let block_type = reader.u8()?;
    let min_size = reader.u8()? as usize;
    if min_size > 4 {
        return Err(format!("最小值长度 {min_size} 超过4字节"));
    }
    let min = sign_extend(reader.take(min_size)?);

    let mut out = Vec::with_capacity(pixels);
    match block_type {
        0x00 => out.resize(pixels, min),
        0x01 => unpack_bits(&mut reader, &mut out, pixels, 1, min)?,
        0x04 => unpack_bits(&mut reader, &mut out, pixels, 4, min)?,
        0x08 => unpack_bits(&mut reader, &mut out, pixels, 8, min)?,
        0x10 => {
            for _ in 0..pixels {
                out.push(min.wrapping_add(reader.u16()? as i32));
            }
        }
        0x20 => {
            for _ in 0..pixels {
                out.push(min.wrapping_add(reader.i32()?));
            }
        }
        0xFC | 0xF8 => run_length(&mut reader, &mut out, pixels, |r| Ok(r.u8()? as i32), min)?,
        0xF0 => run_length(&mut reader, &mut out, pixels, |r| Ok(r.u16()? as i32), min)?,
        0xE0 => run_length(&mut reader, &mut out, pixels, |r| r.i32(), min)?,
        0xDF => {
            while out.len() < pixels {
                let marker = reader.u8()?;
                let (count, value) = if marker < 128 {
                    (marker as usize, min)
                } else {
                    (256 - marker as usize, nodata)
                };
                push_run(&mut out, pixels, count, value)?;
            }
        }
        0xD7 => literal_runs(&mut reader, &mut out, pixels, nodata, |r| {
            Ok(min.wrapping_add(r.u8()? as i32))
        })?,
        0xCF => literal_runs(&mut reader, &mut out, pixels, nodata, |r| {
            Ok(min.wrapping_add(r.u16()? as i32))
        })?,
        0x43 | 0xFF => return Err(format!("不支持CCITT压缩块 (0x{block_type:02X})")),
        other => return Err(format!("未知的块类型 0x{other:02X}")),
    }
    Ok(out)
}

/// 大端有符号整数,1 到 3 字节时按符号扩展
fn sign_extend(bytes: &[u8]) -> i32 {
    let mut value: i64 = 0;
    for byte in bytes {
        value = (value << 8) | *byte as i64;
    }
    if let Some(first) = bytes.first() {
        if first & 0x80 != 0 {
            value -= 1 << (8 * bytes.len());
        }
    }
    value as i32
}

/// 高位在前的定长位打包
fn unpack_bits(
    reader: &mut BlockReader,
    out: &mut Vec<i32>,
    pixels: usize,
    bits: usize,
    min: i32,
) -> Result<(), String> {
    let bytes = reader.take((pixels * bits).div_ceil(8))?;
    let per_byte = 8 / bits;
    let mask = ((1u16 << bits) - 1) as u8;
    for i in 0..pixels {
        let byte = bytes[i / per_byte];
        let shift = 8 - bits * (i % per_byte + 1);
        out.push(min.wrapping_add(((byte >> shift) & mask) as i32));
    }
    Ok(())
}

/// (个数, 值) 形式的游程
fn run_length(
    reader: &mut BlockReader,
    out: &mut Vec<i32>,
    pixels: usize,
    value: impl Fn(&mut BlockReader) -> Result<i32, String>,
    min: i32,
) -> Result<(), String> {
    while out.len() < pixels {
        let count = reader.u8()? as usize;
        let v = value(reader)?;
        push_run(out, pixels, count, min.wrapping_add(v))?;
    }
    Ok(())
}

/// 标记小于 128 时后跟 `marker` 个字面值,否则为 `256 - marker` 个无数据
fn literal_runs(
    reader: &mut BlockReader,
    out: &mut Vec<i32>,
    pixels: usize,
    nodata: i32,
    literal: impl Fn(&mut BlockReader) -> Result<i32, String>,
) -> Result<(), String> {
    while out.len() < pixels {
        let marker = reader.u8()?;
        if marker < 128 {
            let count = marker as usize;
            if out.len() + count > pixels {
                return Err(overrun(out.len(), count, pixels));
            }
            for _ in 0..count {
                out.push(literal(reader)?);
            }
        } else {
            push_run(out, pixels, 256 - marker as usize, nodata)?;
        }
    }
    Ok(())
}

fn push_run(out: &mut Vec<i32>, pixels: usize, count: usize, value: i32) -> Result<(), String> {
    if out.len() + count > pixels {
        return Err(overrun(out.len(), count, pixels));
    }
    out.resize(out.len() + count, value);
    Ok(())
}

fn overrun(filled: usize, count: usize, pixels: usize) -> String {
    format!("游程越界:已有 {filled} 个像元,再写 {count} 个超过块大小 {pixels}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODATA: i32 = -2147483647;

    #[test]
    fn constant_block() {
        assert_eq!(decode_compressed(&[0x00, 1, 7], 4, NODATA).unwrap(), vec![7; 4]);
    }

    #[test]
    fn negative_min_is_sign_extended() {
        // 最小值 0xFF9C = -100
        let out = decode_compressed(&[0x08, 2, 0xFF, 0x9C, 0, 1, 2, 200], 4, NODATA).unwrap();
        assert_eq!(out, vec![-100, -99, -98, 100]);
    }

    #[test]
    fn packed_bits() {
        let out = decode_compressed(&[0x01, 0, 0b1010_0000], 4, NODATA).unwrap();
        assert_eq!(out, vec![1, 0, 1, 0]);
        let out = decode_compressed(&[0x04, 1, 10, 0x12, 0xF0], 4, NODATA).unwrap();
        assert_eq!(out, vec![11, 12, 25, 10]);
    }

    #[test]
    fn raw_16_and_32_bit() {
        let out = decode_compressed(&[0x10, 0, 0x01, 0x00, 0xFF, 0xFF], 2, NODATA).unwrap();
        assert_eq!(out, vec![256, 65535]);
        let mut body = vec![0x20, 0];
        body.extend_from_slice(&(-5i32).to_be_bytes());
        assert_eq!(decode_compressed(&body, 1, NODATA).unwrap(), vec![-5]);
    }

    #[test]
    fn rle_variants() {
        let out = decode_compressed(&[0xF8, 1, 3, 2, 0, 1, 9], 3, NODATA).unwrap();
        assert_eq!(out, vec![3, 3, 12]);
        let out = decode_compressed(&[0xF0, 0, 2, 0x01, 0x00], 2, NODATA).unwrap();
        assert_eq!(out, vec![256, 256]);
        let mut body = vec![0xE0, 0, 3];
        body.extend_from_slice(&(-1i32).to_be_bytes());
        assert_eq!(decode_compressed(&body, 3, NODATA).unwrap(), vec![-1; 3]);
    }

    #[test]
    fn min_and_nodata_runs() {
        // 2 个最小值,然后 256 - 254 = 2 个无数据
        let out = decode_compressed(&[0xDF, 1, 5, 2, 254], 4, NODATA).unwrap();
        assert_eq!(out, vec![5, 5, NODATA, NODATA]);
    }

    #[test]
    fn literal_and_nodata_runs() {
        let out = decode_compressed(&[0xD7, 1, 10, 2, 1, 2, 255], 3, NODATA).unwrap();
        assert_eq!(out, vec![11, 12, NODATA]);
        let out = decode_compressed(&[0xCF, 0, 255, 1, 0x01, 0x00], 2, -9999).unwrap();
        assert_eq!(out, vec![-9999, 256]);
    }

    #[test]
    fn run_past_block_end_is_rejected() {
        let err = decode_compressed(&[0xF8, 0, 5, 1], 4, NODATA).unwrap_err();
        assert!(err.contains("越界"));
    }

    #[test]
    fn truncated_and_unsupported() {
        assert!(decode_compressed(&[0x08, 0, 1, 2], 4, NODATA).is_err());
        assert!(decode_compressed(&[0xFF, 0], 4, NODATA)
            .unwrap_err()
            .contains("CCITT"));
        assert!(decode_compressed(&[0x99, 0], 4, NODATA).is_err());
    }
}
