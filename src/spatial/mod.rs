//! 空间参考
//!
//! [`SpatialReference`] 由解码器根据 `dblbnd.adf`、`hdr.adf` 与 `prj.adf` 构建,
//! 之后只读。编码器从它生成 GeoTIFF 的变换标签与 GeoKey 目录;
//! 校验时再从输出文件的标签还原回来比较。
//!
//! 经纬度范围通过 proj4rs 计算,只有识别出 EPSG 代码的坐标系才能计算。

use crate::geotags::{GeoKeyId, GeoModel, GeoTags, USER_DEFINED};
use primatives::{Point2D, Region};
use proj4rs::errors::Error as Proj4Error;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use std::fmt::{self, Display};

pub mod primatives;
mod prj;

pub use prj::parse_crs;

/// GDAL 顺序的仿射变换
///
/// `[原点x, 像元宽, 行旋转, 原点y, 列旋转, 像元高(北向上时为负)]`,
/// 原点是左上角像元的左上角。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// 北向上、无旋转的变换
    pub fn north_up(origin_x: f64, origin_y: f64, cell_x: f64, cell_y: f64) -> Self {
        Self([origin_x, cell_x, 0.0, origin_y, 0.0, -cell_y])
    }

    /// 左上角坐标
    pub fn origin(&self) -> (f64, f64) {
        (self.0[0], self.0[3])
    }

    /// 像元大小,均为正值
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.0[1].abs(), self.0[5].abs())
    }

    /// 栅格坐标 (列, 行) 到模型坐标
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let [x0, a, b, y0, c, d] = self.0;
        (x0 + col * a + row * b, y0 + col * c + row * d)
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0
    }
}

/// 坐标系种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    Projected,
    Geographic,
    /// 有投影文件但无法归类
    UserDefined,
}

/// 坐标系定义的原文
#[derive(Debug, Clone, PartialEq)]
pub enum CrsSource {
    Wkt(String),
    EsriKeywords(String),
    Unrecognized(String),
}

impl CrsSource {
    pub fn text(&self) -> &str {
        match self {
            CrsSource::Wkt(s) | CrsSource::EsriKeywords(s) | CrsSource::Unrecognized(s) => s,
        }
    }
}

/// 投影坐标系的长度单位,取值为 EPSG 单位代码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum LinearUnit {
    Metre = 9001,
    Foot = 9002,
    UsSurveyFoot = 9003,
}

impl LinearUnit {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "metre" | "meter" | "meters" | "metres" | "m" => Some(LinearUnit::Metre),
            "foot" | "feet" | "ft" | "international foot" => Some(LinearUnit::Foot),
            "us survey foot" | "foot_us" | "us_survey_feet" | "survey feet" => {
                Some(LinearUnit::UsSurveyFoot)
            }
            _ => None,
        }
    }

    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// EPSG 单位代码
    pub fn from_code(code: u16) -> Option<Self> {
        [LinearUnit::Metre, LinearUnit::Foot, LinearUnit::UsSurveyFoot]
            .into_iter()
            .find(|unit| unit.code() == code)
    }
}

/// 从投影文件识别出的坐标系
#[derive(Debug, Clone, PartialEq)]
pub struct CrsDefinition {
    pub kind: CrsKind,
    pub name: String,
    pub epsg: Option<u16>,
    pub linear_unit: Option<LinearUnit>,
    pub source: CrsSource,
}

impl Display for CrsDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(epsg) => write!(f, "{} (EPSG:{epsg})", self.name),
            None => write!(f, "{} ({:?})", self.name, self.kind),
        }
    }
}

/// 投影计算错误
#[derive(Debug)]
pub enum ProjectionError {
    /// 坐标系未知或没有 EPSG 代码
    NoEpsgCode,
    Proj4Error(Proj4Error),
}

impl From<Proj4Error> for ProjectionError {
    fn from(e: Proj4Error) -> Self {
        ProjectionError::Proj4Error(e)
    }
}

impl Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionError::NoEpsgCode => write!(f, "坐标系没有EPSG代码"),
            ProjectionError::Proj4Error(e) => write!(f, "Proj4错误: {e:?}"),
        }
    }
}

impl std::error::Error for ProjectionError {}

/// 坐标系加仿射变换
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialReference {
    pub crs: Option<CrsDefinition>,
    pub transform: GeoTransform,
}

impl SpatialReference {
    pub fn new(crs: Option<CrsDefinition>, transform: GeoTransform) -> Self {
        Self { crs, transform }
    }

    /// 是否已知坐标系
    pub fn is_set(&self) -> bool {
        self.crs.is_some()
    }

    pub fn epsg(&self) -> Option<u16> {
        self.crs.as_ref().and_then(|crs| crs.epsg)
    }

    /// 生成 GeoTIFF 标签
    ///
    /// 轴对齐时写 ModelTiepoint + ModelPixelScale,否则写 ModelTransformation。
    /// 栅格类型总是 PixelIsArea;坐标系未知时不写模型类型。
    pub fn geo_tags(&self) -> GeoTags {
        let model = if self.transform.is_axis_aligned() {
            GeoModel::scaled(self.transform.origin(), self.transform.pixel_size())
        } else {
            GeoModel::from_affine(self.transform.0)
        };
        let mut tags = GeoTags::new(model);
        tags.set_short(GeoKeyId::GTRasterTypeGeoKey, 1);

        let Some(crs) = &self.crs else {
            return tags;
        };
        let code = crs.epsg.unwrap_or(USER_DEFINED);
        match crs.kind {
            CrsKind::Projected => {
                tags.set_short(GeoKeyId::GTModelTypeGeoKey, 1);
                tags.set_short(GeoKeyId::ProjectedCSTypeGeoKey, code);
                if let Some(unit) = crs.linear_unit {
                    tags.set_short(GeoKeyId::ProjLinearUnitsGeoKey, unit.code());
                }
                tags.set_text(GeoKeyId::GTCitationGeoKey, &crs.name);
            }
            CrsKind::Geographic => {
                tags.set_short(GeoKeyId::GTModelTypeGeoKey, 2);
                tags.set_short(GeoKeyId::GeographicTypeGeoKey, code);
                // 9102 = 角度单位"度"
                tags.set_short(GeoKeyId::GeogAngularUnitsGeoKey, 9102);
                tags.set_text(GeoKeyId::GeogCitationGeoKey, &crs.name);
            }
            CrsKind::UserDefined => {
                tags.set_short(GeoKeyId::GTModelTypeGeoKey, USER_DEFINED);
                tags.set_text(GeoKeyId::GTCitationGeoKey, &crs.name);
            }
        }
        tags
    }

    /// 从 GeoTIFF 标签还原,用于校验输出
    ///
    /// 只能还原出种类、名称与 EPSG 代码,原始投影文本不会写进 GeoTIFF。
    pub fn from_geo_tags(tags: &GeoTags) -> Self {
        let transform = GeoTransform(tags.model.to_affine());
        let name = |id| tags.text(id).unwrap_or_default().to_string();
        let epsg = |id| tags.short(id).filter(|code| *code != USER_DEFINED);
        let restored = |kind, epsg, name, linear_unit| CrsDefinition {
            kind,
            epsg,
            name,
            linear_unit,
            source: CrsSource::Unrecognized(String::new()),
        };

        let crs = tags.short(GeoKeyId::GTModelTypeGeoKey).map(|model_type| match model_type {
            1 => restored(
                CrsKind::Projected,
                epsg(GeoKeyId::ProjectedCSTypeGeoKey),
                name(GeoKeyId::GTCitationGeoKey),
                tags.short(GeoKeyId::ProjLinearUnitsGeoKey)
                    .and_then(LinearUnit::from_code),
            ),
            2 => restored(
                CrsKind::Geographic,
                epsg(GeoKeyId::GeographicTypeGeoKey),
                name(GeoKeyId::GeogCitationGeoKey),
                None,
            ),
            _ => restored(CrsKind::UserDefined, None, name(GeoKeyId::GTCitationGeoKey), None),
        });

        Self { crs, transform }
    }

    /// 对应的 proj4rs 投影
    pub fn proj(&self) -> Result<Proj, ProjectionError> {
        let epsg = self.epsg().ok_or(ProjectionError::NoEpsgCode)?;
        Ok(Proj::from_epsg_code(epsg)?)
    }

    /// 栅格范围的经纬度边界(度)
    ///
    /// 采样四角与四边中点。proj4rs 的地理坐标以弧度表示。
    pub fn bounds_lat_lon_deg(&self, dimensions: (u32, u32)) -> Result<Region<f64>, ProjectionError> {
        let from = self.proj()?;
        let to = Proj::from_epsg_code(4326)?;
        let unit_gain = match self.crs.as_ref().map(|crs| crs.kind) {
            Some(CrsKind::Geographic) => 1_f64.to_radians(),
            _ => 1.0,
        };

        let (w, h) = (dimensions.0 as f64, dimensions.1 as f64);
        let mut region = Region::empty();
        for [u, v] in [
            [0.0, 0.0],
            [0.5, 0.0],
            [1.0, 0.0],
            [1.0, 0.5],
            [1.0, 1.0],
            [0.5, 1.0],
            [0.0, 1.0],
            [0.0, 0.5],
        ] {
            let (x, y) = self.transform.apply(u * w, v * h);
            let mut point = (x * unit_gain, y * unit_gain, 0.0);
            transform(&from, &to, &mut point)?;
            region = region.extend(&Point2D {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            });
        }
        Ok(region)
    }
}

impl Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.crs {
            Some(crs) => write!(f, "{crs}")?,
            None => write!(f, "unset")?,
        }
        write!(f, ", transform {:?}", self.transform.0)
    }
}
