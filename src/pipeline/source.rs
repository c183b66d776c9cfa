//! 栅格数据源

use crate::adf::{AdfDataset, AdfError, DecodeOptions, FileSet, GridHeader, GridStatistics};
use crate::raster::{BufferSizeError, PixelData, RasterBlock};
use crate::spatial::SpatialReference;
use tracing::debug;

/// 能按窗口读取像元的数据源
pub trait RasterSource {
    fn header(&self) -> &GridHeader;

    fn spatial_reference(&self) -> &SpatialReference;

    fn statistics(&self) -> Option<GridStatistics> {
        None
    }

    /// 读取 (x, y) 起、大小 (width, height) 的窗口,栅格以外填充无数据
    fn read_window(&self, x: u32, y: u32, width: u32, height: u32)
        -> Result<RasterBlock, AdfError>;
}

impl RasterSource for AdfDataset {
    fn header(&self) -> &GridHeader {
        &self.header
    }

    fn spatial_reference(&self) -> &SpatialReference {
        &self.spatial_reference
    }

    fn statistics(&self) -> Option<GridStatistics> {
        self.statistics
    }

    fn read_window(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<RasterBlock, AdfError> {
        AdfDataset::read_window(self, x, y, width, height)
    }
}

/// 已在内存中的栅格
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    header: GridHeader,
    spatial_reference: SpatialReference,
    statistics: Option<GridStatistics>,
    pixels: RasterBlock,
}

impl MemoryRaster {
    /// `data` 的像元数必须等于栅格的行列数之积
    pub fn new(
        header: GridHeader,
        spatial_reference: SpatialReference,
        data: PixelData,
    ) -> Result<Self, BufferSizeError> {
        let pixels = RasterBlock::new(header.dimensions(), data)?;
        Ok(Self {
            header,
            spatial_reference,
            statistics: None,
            pixels,
        })
    }

    pub fn with_statistics(mut self, statistics: GridStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }
}

impl RasterSource for MemoryRaster {
    fn header(&self) -> &GridHeader {
        &self.header
    }

    fn spatial_reference(&self) -> &SpatialReference {
        &self.spatial_reference
    }

    fn statistics(&self) -> Option<GridStatistics> {
        self.statistics
    }

    fn read_window(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<RasterBlock, AdfError> {
        let header = &self.header;
        let mut window = RasterBlock::nodata((width, height), header.pixel_type, header.nodata);
        let right = x.saturating_add(width).min(header.columns);
        let bottom = y.saturating_add(height).min(header.rows);
        if x < right && y < bottom {
            window.copy_from(&self.pixels, (x, y), (0, 0), (right - x, bottom - y));
        }
        Ok(window)
    }
}

/// 解码器实现
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    /// ArcInfo 二进制栅格
    ArcInfoGrid,
}

impl DecoderKind {
    /// 根据文件集合选择解码器,每个任务只选一次
    pub fn select(files: &FileSet) -> Result<Self, AdfError> {
        if files.contains("hdr.adf") {
            Ok(DecoderKind::ArcInfoGrid)
        } else {
            Err(AdfError::MissingRequiredFile("hdr.adf".to_string()))
        }
    }

    pub fn open(
        self,
        files: FileSet,
        options: &DecodeOptions,
    ) -> Result<Box<dyn RasterSource>, AdfError> {
        debug!("使用解码器 {self:?}");
        match self {
            DecoderKind::ArcInfoGrid => Ok(Box::new(AdfDataset::open(files, options)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelType;

    #[test]
    fn memory_window_pads_with_nodata() {
        let header = GridHeader::new((3, 2), (1.0, 1.0), (0.0, 0.0), PixelType::Int32, -1.0);
        let reference = SpatialReference::new(None, header.geo_transform());
        let raster =
            MemoryRaster::new(header, reference, PixelData::Int32(vec![1, 2, 3, 4, 5, 6])).unwrap();
        let window = raster.read_window(2, 0, 2, 2).unwrap();
        assert_eq!(window.data, PixelData::Int32(vec![3, -1, 6, -1]));
    }

    #[test]
    fn select_needs_header() {
        assert!(matches!(
            DecoderKind::select(&FileSet::new()),
            Err(AdfError::MissingRequiredFile(name)) if name == "hdr.adf"
        ));
        let files = FileSet::new().with_file("hdr.adf", vec![]);
        assert_eq!(DecoderKind::select(&files).unwrap(), DecoderKind::ArcInfoGrid);
    }
}
