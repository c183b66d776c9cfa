//! GeoTIFF 地理标签
//!
//! 栅格到模型坐标的变换有两种写法:轴对齐时用 ModelTiepoint + ModelPixelScale,
//! 带旋转时用 ModelTransformation。坐标系信息放在 GeoKey 目录里。
//!
//! - [OGC GeoTIFF 1.1](https://docs.ogc.org/is/19-008r4/19-008r4.html)

use crate::tiff::{Endian, Ifd, TagData, TagId};
use keys::GeoKey;

mod error;
mod id;
mod keys;
mod value;

pub use error::GeoTiffError;
pub use id::{GeoKeyId, USER_DEFINED};
pub use keys::GeoKeyDirectory;
pub use value::GeoKeyValue;

/// 一组 GeoTIFF 标签
#[derive(Clone, Debug, PartialEq)]
pub struct GeoTags {
    pub directory: GeoKeyDirectory,
    pub model: GeoModel,
}

/// 栅格坐标到模型坐标的变换
#[derive(Clone, Debug, PartialEq)]
pub enum GeoModel {
    /// 4x4 仿射矩阵,用于带旋转的栅格
    Transformed(GeoModelTransformed),
    /// 控制点加像元比例,用于轴对齐的栅格
    Scaled(GeoModelScaled),
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeoModelTransformed {
    /// 行优先的 4x4 矩阵
    pub transformation: [f64; 16],
    pub tiepoint: Option<[f64; 6]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeoModelScaled {
    /// [ScaleX, ScaleY, ScaleZ]
    pub pixel_scale: [f64; 3],
    /// [I, J, K, X, Y, Z]
    pub tiepoint: [f64; 6],
}

impl GeoModel {
    /// 左上角像元 (0, 0) 落在 `origin`,像元大小为 `cell_size`(均为正数)
    pub fn scaled(origin: (f64, f64), cell_size: (f64, f64)) -> Self {
        GeoModel::Scaled(GeoModelScaled {
            pixel_scale: [cell_size.0, cell_size.1, 0.0],
            tiepoint: [0.0, 0.0, 0.0, origin.0, origin.1, 0.0],
        })
    }

    /// 由 GDAL 顺序的六个仿射系数构造矩阵形式
    pub fn from_affine(a: [f64; 6]) -> Self {
        GeoModel::Transformed(GeoModelTransformed {
            transformation: [
                a[1], a[2], 0.0, a[0], //
                a[4], a[5], 0.0, a[3], //
                0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
            tiepoint: None,
        })
    }

    /// 还原为 GDAL 顺序的六个仿射系数
    ///
    /// 控制点不在 (0, 0) 时按像元比例外推到左上角。
    pub fn to_affine(&self) -> [f64; 6] {
        match self {
            GeoModel::Scaled(GeoModelScaled {
                pixel_scale: s,
                tiepoint: t,
            }) => [t[3] - t[0] * s[0], s[0], 0.0, t[4] + t[1] * s[1], 0.0, -s[1]],
            GeoModel::Transformed(model) => {
                let m = model.transformation;
                [m[3], m[0], m[1], m[7], m[4], m[5]]
            }
        }
    }
}

impl GeoTags {
    /// 只有变换、GeoKey 目录为空
    pub fn new(model: GeoModel) -> Self {
        Self {
            directory: GeoKeyDirectory::new(),
            model,
        }
    }

    /// 从 IFD 读出地理标签
    pub fn parse(ifd: &Ifd) -> Result<Self, GeoTiffError> {
        let tiepoint = read_doubles(ifd, TagId::ModelTiepoint).ok();
        let pixel_scale = read_doubles(ifd, TagId::ModelPixelScale).ok();
        let transformation = read_doubles(ifd, TagId::ModelTransformation).ok();

        let model = match (tiepoint, pixel_scale, transformation) {
            (Some(tiepoint), Some(pixel_scale), _) => GeoModel::Scaled(GeoModelScaled {
                tiepoint,
                pixel_scale,
            }),
            (tiepoint, _, Some(transformation)) => GeoModel::Transformed(GeoModelTransformed {
                tiepoint,
                transformation,
            }),
            _ => return Err(GeoTiffError::MissingTag(TagId::ModelPixelScale)),
        };

        let directory = GeoKeyDirectory::parse(ifd)?;
        Ok(Self { model, directory })
    }

    /// 写入变换标签和 GeoKey 目录
    pub fn add_to_ifd(&self, ifd: &mut Ifd, endian: Endian) {
        let mut doubles = |id: TagId, values: &[f64]| {
            ifd.set_tag(id, TagData::Double(values.to_vec()), endian)
        };
        match &self.model {
            GeoModel::Transformed(model) => {
                doubles(TagId::ModelTransformation, &model.transformation[..]);
                if let Some(tiepoint) = &model.tiepoint {
                    doubles(TagId::ModelTiepoint, &tiepoint[..]);
                }
            }
            GeoModel::Scaled(model) => {
                doubles(TagId::ModelTiepoint, &model.tiepoint[..]);
                doubles(TagId::ModelPixelScale, &model.pixel_scale[..]);
            }
        }
        self.directory.add_to_ifd(ifd, endian);
    }

    /// 设置一个 Short 键,已存在则覆盖
    pub fn set_short(&mut self, id: GeoKeyId, value: u16) {
        self.set_key(id, GeoKeyValue::Short(vec![value]));
    }

    /// 设置一个文本键,已存在则覆盖
    pub fn set_text(&mut self, id: GeoKeyId, value: &str) {
        self.set_key(id, GeoKeyValue::Ascii(value.to_string()));
    }

    fn set_key(&mut self, id: GeoKeyId, value: GeoKeyValue) {
        let code: u16 = id.into();
        let keys = &mut self.directory.keys;
        match keys.iter_mut().find(|key| key.code == code) {
            Some(key) => key.value = value,
            None => keys.push(GeoKey { code, value }),
        }
    }

    pub fn short(&self, id: GeoKeyId) -> Option<u16> {
        self.directory.get(id).and_then(|v| v.as_number())
    }

    pub fn text(&self, id: GeoKeyId) -> Option<&str> {
        self.directory.get(id).and_then(|v| v.as_string())
    }
}

fn read_doubles<const N: usize>(ifd: &Ifd, id: TagId) -> Result<[f64; N], GeoTiffError> {
    ifd.get_tag(id)
        .map_err(|_| GeoTiffError::MissingTag(id))?
        .values::<f64>()
        .ok_or(GeoTiffError::BadTag(id))?
        .try_into()
        .map_err(|_| GeoTiffError::BadTag(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affine_round_trip_through_both_models() {
        let north_up = [500000.0, 30.0, 0.0, 4500090.0, 0.0, -30.0];
        assert_eq!(GeoModel::scaled((500000.0, 4500090.0), (30.0, 30.0)).to_affine(), north_up);

        let rotated = [10.0, 1.0, 0.5, 20.0, 0.5, -1.0];
        assert_eq!(GeoModel::from_affine(rotated).to_affine(), rotated);
    }

    #[test]
    fn keys_are_replaced_in_place() {
        let mut tags = GeoTags::new(GeoModel::from_affine([0.0, 1.0, 0.0, 0.0, 0.0, -1.0]));
        tags.set_short(GeoKeyId::GTModelTypeGeoKey, 2);
        tags.set_text(GeoKeyId::GTCitationGeoKey, "WGS 84");
        tags.set_short(GeoKeyId::GTModelTypeGeoKey, 1);
        assert_eq!(tags.directory.keys.len(), 2);
        assert_eq!(tags.short(GeoKeyId::GTModelTypeGeoKey), Some(1));
        assert_eq!(tags.text(GeoKeyId::GTCitationGeoKey), Some("WGS 84"));
    }

    #[test]
    fn parse_reads_back_written_tags() {
        let mut tags = GeoTags::new(GeoModel::scaled((1.0, 2.0), (0.5, 0.5)));
        tags.set_short(GeoKeyId::GTRasterTypeGeoKey, 1);
        let mut ifd = Ifd::new();
        tags.add_to_ifd(&mut ifd, Endian::Little);
        assert_eq!(GeoTags::parse(&ifd).unwrap(), tags);
    }
}
