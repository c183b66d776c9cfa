//! 坐标计算用的基础类型

/// 平面上的点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D<T> {
    pub x: T,
    pub y: T,
}

/// 闭区间 [min, max]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

/// 轴对齐的矩形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region<T> {
    pub x: Interval<T>,
    pub y: Interval<T>,
}

impl<T: Copy> Region<T> {
    pub fn new(min_x: T, min_y: T, max_x: T, max_y: T) -> Self {
        Self {
            x: Interval { min: min_x, max: max_x },
            y: Interval { min: min_y, max: max_y },
        }
    }
}

impl Region<f64> {
    /// 扩展到包含 `point`
    pub fn extend(self, point: &Point2D<f64>) -> Self {
        Self::new(
            self.x.min.min(point.x),
            self.y.min.min(point.y),
            self.x.max.max(point.x),
            self.y.max.max(point.y),
        )
    }

    /// 不包含任何点的区域,用作 [`Region::extend`] 的起点
    pub fn empty() -> Self {
        Self::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN)
    }
}
