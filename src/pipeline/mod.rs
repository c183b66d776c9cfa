//! 转换流水线
//!
//! 按行优先顺序逐个读取输出瓦片大小的窗口并交给编码器。任何一步出错都立即
//! 返回并丢弃写入器,错误标明出在解码还是编码阶段。取消只在两个瓦片之间检查,
//! 单个瓦片的解码加编码不会被打断。

use crate::adf::{AdfError, DecodeOptions, FileSet};
use crate::encode::{EncodeError, EncodeOptions, GeoTiffWriter};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, trace, warn};

mod source;

pub use source::{DecoderKind, MemoryRaster, RasterSource};

/// 可在线程间共享的取消标志
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 出错的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Encode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Decode => write!(f, "解码"),
            Stage::Encode => write!(f, "编码"),
        }
    }
}

/// 转换错误
#[derive(Debug)]
pub enum ConvertError {
    Decode(AdfError),
    Encode(EncodeError),
    /// 在两个瓦片之间被取消
    Cancelled,
    /// 后台任务异常退出
    TaskFailed(String),
}

impl ConvertError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ConvertError::Decode(_) => Some(Stage::Decode),
            ConvertError::Encode(_) => Some(Stage::Encode),
            _ => None,
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Decode(e) => write!(f, "解码阶段出错: {e}"),
            ConvertError::Encode(e) => write!(f, "编码阶段出错: {e}"),
            ConvertError::Cancelled => write!(f, "转换已取消"),
            ConvertError::TaskFailed(reason) => write!(f, "转换任务失败: {reason}"),
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::Decode(e) => Some(e),
            ConvertError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AdfError> for ConvertError {
    fn from(e: AdfError) -> Self {
        ConvertError::Decode(e)
    }
}

impl From<EncodeError> for ConvertError {
    fn from(e: EncodeError) -> Self {
        ConvertError::Encode(e)
    }
}

/// 转换结果
#[derive(Debug)]
pub struct ConversionOutput {
    /// 完整的 GeoTIFF 字节流
    pub bytes: Vec<u8>,
    /// 是否写入了坐标系
    pub spatial_ref_set: bool,
    pub tiles_written: usize,
}

/// 把数据源转换为 GeoTIFF
pub fn convert(
    source: &dyn RasterSource,
    options: &EncodeOptions,
    cancel: &CancelFlag,
) -> Result<ConversionOutput, ConvertError> {
    let spatial_reference = source.spatial_reference();
    if !spatial_reference.is_set() {
        warn!("数据集没有投影信息,输出将不含坐标系");
    }

    let mut writer = GeoTiffWriter::create(source.header(), spatial_reference, options.clone())?
        .with_statistics(source.statistics());
    let (cols, rows) = writer.tile_grid();
    let size = writer.tile_size();
    debug!("开始转换: {cols}x{rows} 个瓦片");

    for row in 0..rows {
        for col in 0..cols {
            if cancel.is_cancelled() {
                info!("转换在瓦片 ({col}, {row}) 之前被取消");
                return Err(ConvertError::Cancelled);
            }
            let block = source.read_window(col * size, row * size, size, size)?;
            trace!("瓦片 ({col}, {row}): {block}");
            writer.write_tile((col, row), block)?;
        }
    }

    let tiles_written = writer.tiles_written();
    let bytes = writer.finalize()?;
    Ok(ConversionOutput {
        bytes,
        spatial_ref_set: spatial_reference.is_set(),
        tiles_written,
    })
}

/// 打开文件集合并转换
pub fn convert_file_set(
    files: FileSet,
    decode: &DecodeOptions,
    options: &EncodeOptions,
) -> Result<ConversionOutput, ConvertError> {
    convert_file_set_with_cancel(files, decode, options, &CancelFlag::new())
}

fn convert_file_set_with_cancel(
    files: FileSet,
    decode: &DecodeOptions,
    options: &EncodeOptions,
    cancel: &CancelFlag,
) -> Result<ConversionOutput, ConvertError> {
    let source = DecoderKind::select(&files)?.open(files, decode)?;
    convert(source.as_ref(), options, cancel)
}

/// 一个独立的转换任务
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub files: FileSet,
    pub decode: DecodeOptions,
    pub encode: EncodeOptions,
}

/// 每个任务一个线程并行转换,结果与任务顺序一致
pub fn convert_many(
    jobs: Vec<ConversionJob>,
    cancel: &CancelFlag,
) -> Vec<Result<ConversionOutput, ConvertError>> {
    thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                scope.spawn(move || {
                    convert_file_set_with_cancel(job.files, &job.decode, &job.encode, cancel)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(ConvertError::TaskFailed("转换线程崩溃".to_string())))
            })
            .collect()
    })
}

#[cfg(feature = "async")]
pub use not_sync::*;

#[cfg(feature = "async")]
mod not_sync {
    use super::*;
    use crate::io::load_dir_async;
    use std::path::Path;

    /// 异步读取目录,在阻塞线程池中转换
    pub async fn convert_dir_async(
        path: impl AsRef<Path>,
        decode: DecodeOptions,
        options: EncodeOptions,
    ) -> Result<ConversionOutput, ConvertError> {
        let files = load_dir_async(path).await?;
        tokio::task::spawn_blocking(move || convert_file_set(files, &decode, &options))
            .await
            .map_err(|e| ConvertError::TaskFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adf::GridHeader;
    use crate::raster::{PixelData, PixelType};
    use crate::spatial::SpatialReference;

    fn memory_raster() -> MemoryRaster {
        let header = GridHeader::new((5, 3), (10.0, 10.0), (0.0, 0.0), PixelType::Int32, -1.0);
        let reference = SpatialReference::new(None, header.geo_transform());
        MemoryRaster::new(header, reference, PixelData::Int32((0..15).collect())).unwrap()
    }

    #[test]
    fn converts_memory_raster() {
        let options = EncodeOptions::new().with_tile_size(4);
        let output = convert(&memory_raster(), &options, &CancelFlag::new()).unwrap();
        assert_eq!(output.tiles_written, 2);
        assert!(!output.spatial_ref_set);
    }

    #[test]
    fn cancelled_before_first_tile() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = convert(&memory_raster(), &EncodeOptions::new(), &cancel).unwrap_err();
        assert!(matches!(err, ConvertError::Cancelled));
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn encode_errors_are_tagged() {
        let options = EncodeOptions::new().with_tile_size(6);
        let err = convert(&memory_raster(), &options, &CancelFlag::new()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Encode));
    }

    #[test]
    fn many_jobs_keep_order() {
        let jobs = vec![
            ConversionJob {
                files: FileSet::new(),
                decode: DecodeOptions::new(),
                encode: EncodeOptions::new(),
            };
            2
        ];
        let results = convert_many(jobs, &CancelFlag::new());
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(ConvertError::Decode(AdfError::MissingRequiredFile(_))))));
    }
}
