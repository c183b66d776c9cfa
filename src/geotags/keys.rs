//! GeoKeyDirectory 的解析与序列化
//!
//! 目录是一串 u16:四个头部值(版本、修订号、次修订号、键数),之后每个键四个值
//! (键编号、存放位置、个数、值或偏移)。存放位置为 0 表示值就在目录里。
//! 参见 <https://docs.ogc.org/is/19-008r4/19-008r4.html#_requirements_class_geokeydirectorytag>

use super::{GeoKeyId, GeoKeyValue, GeoTiffError};
use crate::tiff::{Endian, Ifd, TagData, TagId, TagType};

/// GeoKey 目录
#[derive(Clone, Debug, PartialEq)]
pub struct GeoKeyDirectory {
    pub version: u16,
    pub revision: (u16, u16),
    pub keys: Vec<GeoKey>,
}

/// 一个键值对
#[derive(Clone, Debug, PartialEq)]
pub struct GeoKey {
    pub code: u16,
    pub value: GeoKeyValue,
}

impl Default for GeoKeyDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoKeyDirectory {
    /// 版本 1,修订 1.1
    pub fn new() -> Self {
        Self {
            version: 1,
            revision: (1, 1),
            keys: vec![],
        }
    }

    pub fn get(&self, id: GeoKeyId) -> Option<&GeoKeyValue> {
        let code: u16 = id.into();
        self.keys.iter().find(|key| key.code == code).map(|key| &key.value)
    }

    /// 从 IFD 中的 GeoKeyDirectory 及参数标签解析
    pub fn parse(ifd: &Ifd) -> Result<Self, GeoTiffError> {
        let directory_values: Vec<u16> = ifd
            .get_tag(TagId::GeoKeyDirectory)
            .map_err(|_| GeoTiffError::MissingTag(TagId::GeoKeyDirectory))?
            .values()
            .ok_or(GeoTiffError::BadTag(TagId::GeoKeyDirectory))?;
        if directory_values.len() < 4 {
            return Err(GeoTiffError::BadTag(TagId::GeoKeyDirectory));
        }

        let version = directory_values[0];
        let revision = directory_values[1];
        let minor_revision = directory_values[2];
        let key_count = directory_values[3] as usize;

        if directory_values.len() < 4 + key_count * 4 {
            return Err(GeoTiffError::BadTag(TagId::GeoKeyDirectory));
        }

        let keys = (0..key_count)
            .map(|i| {
                let entry = &directory_values[(i + 1) * 4..(i + 2) * 4];
                let (code, location, count, offset) = (entry[0], entry[1], entry[2], entry[3]);

                let value = if location == 0 {
                    GeoKeyValue::Short(vec![offset])
                } else {
                    let start = offset as usize;
                    let end = start + count as usize;
                    ifd.get_tag_by_code(location)
                        .and_then(|tag| match tag.datatype {
                            TagType::Ascii => tag
                                .try_to_string()
                                .and_then(|s| s.get(start..end).map(str::to_string))
                                .map(|s| {
                                    GeoKeyValue::Ascii(
                                        s.trim_end_matches(|c| c == '|' || c == '\0').to_string(),
                                    )
                                }),
                            TagType::Short => tag
                                .values::<u16>()
                                .and_then(|v| v.get(start..end).map(<[u16]>::to_vec))
                                .map(GeoKeyValue::Short),
                            TagType::Double => tag
                                .values::<f64>()
                                .and_then(|v| v.get(start..end).map(<[f64]>::to_vec))
                                .map(GeoKeyValue::Double),
                            _ => None,
                        })
                        .unwrap_or(GeoKeyValue::Undefined)
                };

                GeoKey { code, value }
            })
            .collect();

        Ok(Self {
            version,
            revision: (revision, minor_revision),
            keys,
        })
    }

    /// 写入 GeoKeyDirectory,以及需要时的 GeoAsciiParams / GeoDoubleParams
    pub fn add_to_ifd(&self, ifd: &mut Ifd, endian: Endian) {
        let (key_directory, ascii_params, double_params) = self.unparse();

        ifd.set_tag(
            TagId::GeoKeyDirectory,
            TagData::Short(key_directory),
            endian,
        );
        if !ascii_params.is_empty() {
            ifd.set_tag(TagId::GeoAsciiParams, TagData::Ascii(ascii_params), endian);
        }
        if !double_params.is_empty() {
            ifd.set_tag(
                TagId::GeoDoubleParams,
                TagData::Double(double_params),
                endian,
            );
        }
    }

    /// 序列化为 (目录, ASCII 参数, Double 参数)
    ///
    /// 键按编号升序排列;每段 ASCII 以 `|` 结尾,整体再以 NUL 结尾。
    pub fn unparse(&self) -> (Vec<u16>, Vec<u8>, Vec<f64>) {
        let mut keys: Vec<&GeoKey> = self.keys.iter().collect();
        keys.sort_by_key(|key| key.code);

        let mut directory = vec![
            self.version,
            self.revision.0,
            self.revision.1,
            keys.len() as u16,
        ];
        let mut shorts = vec![];
        let mut asciis = vec![];
        let mut doubles = vec![];
        let dir_size = 4 * (keys.len() + 1) as u16;

        for key in keys {
            directory.push(key.code);
            match &key.value {
                GeoKeyValue::Short(vec) => match vec.len() {
                    0 => directory.extend([0, 0, 0]),
                    1 => directory.extend([0, 1, vec[0]]),
                    n => {
                        directory.push(TagId::GeoKeyDirectory.into());
                        directory.push(n as u16);
                        directory.push(dir_size + shorts.len() as u16);
                        shorts.extend(vec);
                    }
                },
                GeoKeyValue::Ascii(s) => {
                    directory.push(TagId::GeoAsciiParams.into());
                    directory.push(s.len() as u16 + 1);
                    directory.push(asciis.len() as u16);
                    asciis.extend(s.bytes());
                    asciis.push(b'|');
                }
                GeoKeyValue::Double(vec) => {
                    directory.push(TagId::GeoDoubleParams.into());
                    directory.push(vec.len() as u16);
                    directory.push(doubles.len() as u16);
                    doubles.extend(vec);
                }
                GeoKeyValue::Undefined => directory.extend([0, 0, 0]),
            }
        }
        if !asciis.is_empty() {
            asciis.push(0);
        }

        ([directory, shorts].concat(), asciis, doubles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_round_trips_through_ifd() {
        let mut directory = GeoKeyDirectory::new();
        directory.keys.push(GeoKey {
            code: GeoKeyId::ProjectedCSTypeGeoKey.into(),
            value: GeoKeyValue::Short(vec![32610]),
        });
        directory.keys.push(GeoKey {
            code: GeoKeyId::GTModelTypeGeoKey.into(),
            value: GeoKeyValue::Short(vec![1]),
        });
        directory.keys.push(GeoKey {
            code: GeoKeyId::GTCitationGeoKey.into(),
            value: GeoKeyValue::Ascii("WGS 84 / UTM zone 10N".into()),
        });

        let mut ifd = Ifd::new();
        directory.add_to_ifd(&mut ifd, Endian::Little);
        let parsed = GeoKeyDirectory::parse(&ifd).unwrap();

        let codes: Vec<u16> = parsed.keys.iter().map(|k| k.code).collect();
        assert_eq!(codes, vec![1024, 1026, 3072]);
        assert_eq!(
            parsed.get(GeoKeyId::GTCitationGeoKey),
            Some(&GeoKeyValue::Ascii("WGS 84 / UTM zone 10N".into()))
        );
        assert_eq!(
            parsed
                .get(GeoKeyId::ProjectedCSTypeGeoKey)
                .and_then(|v| v.as_number::<u16>()),
            Some(32610)
        );
    }

    #[test]
    fn short_directory_is_rejected() {
        let mut ifd = Ifd::new();
        ifd.set_tag(
            TagId::GeoKeyDirectory,
            TagData::Short(vec![1, 1, 1, 3, 1024, 0, 1, 1]),
            Endian::Little,
        );
        assert!(matches!(
            GeoKeyDirectory::parse(&ifd),
            Err(GeoTiffError::BadTag(TagId::GeoKeyDirectory))
        ));
    }
}
