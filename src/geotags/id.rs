//! GeoKey 编号
//!
//! 编号取自 OGC GeoTIFF 1.1 (OGC 19-008r4) 的 GeoKey 汇总表:
//! <https://docs.ogc.org/is/19-008r4/19-008r4.html#_summary_of_geokey_ids_and_names>

use num_enum::IntoPrimitive;

/// GeoKey 编号
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, Hash)]
#[repr(u16)]
pub enum GeoKeyId {
    /// 模型类型:1 = 投影坐标系,2 = 地理坐标系,32767 = 用户定义
    GTModelTypeGeoKey = 1024,
    /// 栅格类型:1 = PixelIsArea,2 = PixelIsPoint
    GTRasterTypeGeoKey = 1025,
    /// 坐标系的文字说明
    GTCitationGeoKey = 1026,

    /// 地理坐标系 EPSG 代码
    GeographicTypeGeoKey = 2048,
    GeogCitationGeoKey = 2049,
    GeogAngularUnitsGeoKey = 2054,

    /// 投影坐标系 EPSG 代码
    ProjectedCSTypeGeoKey = 3072,
    ProjLinearUnitsGeoKey = 3076,
}

/// 用户自定义值,用于无法映射到 EPSG 的坐标系
pub const USER_DEFINED: u16 = 32767;
