//! `sta.adf` 统计信息

use crate::tiff::Endian;
use tracing::warn;

pub(crate) const STATISTICS_FILE: &str = "sta.adf";

/// 栅格统计值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
}

impl GridStatistics {
    /// 依次读取最小值、最大值、均值、标准差四个大端 f64
    ///
    /// 文件过短或数值不合理时返回 `None`,统计信息缺失不影响转换。
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let value = |offset| Endian::Big.decode_at::<8, f64>(bytes, offset);
        let stats = Self {
            min: value(0)?,
            max: value(8)?,
            mean: value(16)?,
            stddev: value(24)?,
        };
        let finite = [stats.min, stats.max, stats.mean, stats.stddev]
            .iter()
            .all(|v| v.is_finite());
        if !finite || stats.min > stats.max {
            warn!("{STATISTICS_FILE} 中的统计值无效,忽略");
            return None;
        }
        Some(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_four_doubles() {
        let bytes: Vec<u8> = [1.0f64, 9.0, 4.5, 2.0]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect();
        let stats = GridStatistics::parse(&bytes).unwrap();
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.stddev, 2.0);
        assert_eq!(GridStatistics::parse(&bytes[..24]), None);
    }
}
