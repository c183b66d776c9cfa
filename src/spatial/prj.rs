//! 投影文件解析
//!
//! `prj.adf` 有两种写法:OGC WKT,或 ArcInfo 的关键字格式:
//!
//! ```text
//! Projection    UTM
//! Zone          10
//! Datum         NAD83
//! Units         METERS
//! Parameters
//! ```
//!
//! 能识别出 EPSG 代码时记录下来,否则保留名称与原文作为自定义坐标系。

use super::{CrsDefinition, CrsKind, CrsSource, LinearUnit};
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;
use tracing::debug;

/// 解析投影文本,空文本返回 `None`
pub fn parse_crs(text: &str) -> Option<CrsDefinition> {
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if text.is_empty() {
        return None;
    }

    if let Some(definition) = parse_wkt(text) {
        return Some(definition);
    }
    if let Some(definition) = parse_esri_keywords(text) {
        return Some(definition);
    }

    debug!("无法识别的投影文本,按自定义坐标系处理");
    Some(CrsDefinition {
        kind: CrsKind::UserDefined,
        name: text.lines().next().unwrap_or(text).trim().to_string(),
        epsg: None,
        linear_unit: None,
        source: CrsSource::Unrecognized(text.to_string()),
    })
}

// ---- WKT ----

#[derive(Debug, PartialEq)]
enum WktArg {
    Quoted(String),
    Bare(String),
    Node(WktNode),
}

#[derive(Debug, PartialEq)]
struct WktNode {
    keyword: String,
    args: Vec<WktArg>,
}

impl WktNode {
    fn name(&self) -> Option<&str> {
        match self.args.first() {
            Some(WktArg::Quoted(s)) => Some(s),
            _ => None,
        }
    }

    fn children(&self) -> impl Iterator<Item = &WktNode> {
        self.args.iter().filter_map(|arg| match arg {
            WktArg::Node(node) => Some(node),
            _ => None,
        })
    }

    /// 本节点直属的 EPSG 权威代码,WKT1 写作 AUTHORITY,WKT2 写作 ID
    fn epsg(&self) -> Option<u16> {
        self.children()
            .filter(|child| matches!(child.keyword.as_str(), "AUTHORITY" | "ID"))
            .find_map(|child| match child.args.as_slice() {
                [WktArg::Quoted(authority), code, ..] if authority.eq_ignore_ascii_case("EPSG") => {
                    match code {
                        WktArg::Quoted(s) | WktArg::Bare(s) => s.trim().parse().ok(),
                        WktArg::Node(_) => None,
                    }
                }
                _ => None,
            })
    }
}

struct WktParser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> WktParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if matches!(c, ',' | '[' | ']' | '(' | ')' | '"') || c.is_whitespace() {
                break;
            }
            word.push(c);
            self.chars.next();
        }
        word
    }

    fn open_bracket(&mut self) -> bool {
        self.skip_whitespace();
        if matches!(self.chars.peek(), Some('[') | Some('(')) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn node(&mut self) -> Option<WktNode> {
        self.skip_whitespace();
        let keyword = self.word();
        if keyword.is_empty() || !self.open_bracket() {
            return None;
        }
        let args = self.args()?;
        Some(WktNode { keyword, args })
    }

    /// 读取到与已消费左括号匹配的右括号为止
    fn args(&mut self) -> Option<Vec<WktArg>> {
        let mut args = vec![];
        loop {
            self.skip_whitespace();
            match *self.chars.peek()? {
                ']' | ')' => {
                    self.chars.next();
                    return Some(args);
                }
                ',' => {
                    self.chars.next();
                }
                '"' => {
                    self.chars.next();
                    let mut s = String::new();
                    loop {
                        match self.chars.next()? {
                            // 连续两个引号转义为一个引号
                            '"' if self.chars.peek() == Some(&'"') => {
                                self.chars.next();
                                s.push('"');
                            }
                            '"' => break,
                            c => s.push(c),
                        }
                    }
                    args.push(WktArg::Quoted(s));
                }
                _ => {
                    let word = self.word();
                    if word.is_empty() {
                        return None;
                    }
                    if self.open_bracket() {
                        let child_args = self.args()?;
                        args.push(WktArg::Node(WktNode {
                            keyword: word.to_ascii_uppercase(),
                            args: child_args,
                        }));
                    } else {
                        args.push(WktArg::Bare(word));
                    }
                }
            }
        }
    }
}

fn parse_wkt(text: &str) -> Option<CrsDefinition> {
    let mut root = WktParser::new(text).node()?;
    root.keyword = root.keyword.to_ascii_uppercase();
    let kind = match root.keyword.as_str() {
        "PROJCS" | "PROJCRS" | "PROJECTEDCRS" => CrsKind::Projected,
        "GEOGCS" | "GEOGCRS" | "GEOGRAPHICCRS" | "GEODCRS" => CrsKind::Geographic,
        _ => return None,
    };

    let linear_unit = match kind {
        CrsKind::Projected => root
            .children()
            .filter(|child| matches!(child.keyword.as_str(), "UNIT" | "LENGTHUNIT"))
            .find_map(|unit| unit.name().and_then(LinearUnit::from_name)),
        _ => None,
    };

    Some(CrsDefinition {
        kind,
        name: root.name().unwrap_or("unnamed").to_string(),
        epsg: root.epsg(),
        linear_unit,
        source: CrsSource::Wkt(text.to_string()),
    })
}

// ---- ArcInfo 关键字格式 ----

fn parse_esri_keywords(text: &str) -> Option<CrsDefinition> {
    let mut fields: HashMap<String, String> = HashMap::new();
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else { continue };
        let key = key.to_ascii_lowercase();
        if key == "parameters" {
            break;
        }
        let value = parts.collect::<Vec<_>>().join(" ");
        fields.entry(key).or_insert(value);
    }

    let projection = fields.get("projection")?.to_ascii_uppercase();
    let datum = fields
        .get("datum")
        .map(|d| d.to_ascii_uppercase())
        .unwrap_or_default();
    let linear_unit = fields.get("units").and_then(|u| LinearUnit::from_name(u));
    let source = CrsSource::EsriKeywords(text.to_string());

    let datum_name = match datum.as_str() {
        "WGS84" => "WGS 84",
        "NAD83" => "NAD83",
        "NAD27" => "NAD27",
        _ => "",
    };

    let definition = match projection.as_str() {
        "GEOGRAPHIC" => CrsDefinition {
            kind: CrsKind::Geographic,
            epsg: match datum.as_str() {
                "WGS84" => Some(4326),
                "NAD83" => Some(4269),
                "NAD27" => Some(4267),
                _ => None,
            },
            name: if datum_name.is_empty() {
                format!("Geographic / {datum}")
            } else {
                datum_name.to_string()
            },
            linear_unit: None,
            source,
        },
        "UTM" => {
            let zone: Option<i32> = fields.get("zone").and_then(|z| z.parse().ok());
            let epsg = zone.and_then(|zone| utm_epsg(&datum, zone));
            let name = match (zone, datum_name.is_empty()) {
                (Some(zone), false) => format!(
                    "{datum_name} / UTM zone {}{}",
                    zone.unsigned_abs(),
                    if zone < 0 { "S" } else { "N" }
                ),
                (Some(zone), true) => format!("UTM zone {zone} / {datum}"),
                (None, _) => format!("UTM / {datum}"),
            };
            CrsDefinition {
                kind: CrsKind::Projected,
                epsg,
                name,
                linear_unit: linear_unit.or(Some(LinearUnit::Metre)),
                source,
            }
        }
        other => CrsDefinition {
            kind: CrsKind::Projected,
            epsg: None,
            name: if datum.is_empty() {
                other.to_string()
            } else {
                format!("{other} / {datum}")
            },
            linear_unit,
            source,
        },
    };
    debug!(name = %definition.name, epsg = ?definition.epsg, "解析ArcInfo投影文件");
    Some(definition)
}

/// UTM 分带到 EPSG 代码,负的分带号表示南半球
fn utm_epsg(datum: &str, zone: i32) -> Option<u16> {
    let abs = zone.unsigned_abs() as u16;
    if !(1..=60).contains(&abs) {
        return None;
    }
    match (datum, zone > 0) {
        ("WGS84", true) => Some(32600 + abs),
        ("WGS84", false) => Some(32700 + abs),
        ("NAD83", true) if abs <= 23 => Some(26900 + abs),
        ("NAD27", true) if abs <= 22 => Some(26700 + abs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTM_WKT: &str = r#"PROJCS["WGS 84 / UTM zone 10N",
        GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],
        PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]],
        PROJECTION["Transverse_Mercator"],PARAMETER["central_meridian",-123],
        UNIT["metre",1,AUTHORITY["EPSG","9001"]],AUTHORITY["EPSG","32610"]]"#;

    #[test]
    fn wkt_takes_outermost_authority() {
        let crs = parse_crs(UTM_WKT).unwrap();
        assert_eq!(crs.kind, CrsKind::Projected);
        assert_eq!(crs.name, "WGS 84 / UTM zone 10N");
        assert_eq!(crs.epsg, Some(32610));
        assert_eq!(crs.linear_unit, Some(LinearUnit::Metre));
    }

    #[test]
    fn wkt2_id_is_recognised() {
        let crs = parse_crs(r#"GEOGCRS["WGS 84",DATUM["World Geodetic System 1984"],ID["EPSG",4326]]"#)
            .unwrap();
        assert_eq!(crs.kind, CrsKind::Geographic);
        assert_eq!(crs.epsg, Some(4326));
    }

    #[test]
    fn esri_utm_keywords() {
        let text = "Projection    UTM\nZone          10\nDatum         NAD83\nSpheroid      GRS80\nUnits         METERS\nZunits        NO\nParameters\n";
        let crs = parse_crs(text).unwrap();
        assert_eq!(crs.kind, CrsKind::Projected);
        assert_eq!(crs.epsg, Some(26910));
        assert_eq!(crs.name, "NAD83 / UTM zone 10N");
    }

    #[test]
    fn esri_southern_wgs84_zone() {
        let crs = parse_crs("Projection UTM\nZone -23\nDatum WGS84\n").unwrap();
        assert_eq!(crs.epsg, Some(32723));
    }

    #[test]
    fn esri_custom_projection_keeps_no_code() {
        let text = "Projection    ALBERS\nDatum         NAD83\nUnits         METERS\nParameters\n 29 30  0.0\n";
        let crs = parse_crs(text).unwrap();
        assert_eq!(crs.kind, CrsKind::Projected);
        assert_eq!(crs.epsg, None);
        assert_eq!(crs.name, "ALBERS / NAD83");
    }

    #[test]
    fn blank_file_means_unknown() {
        assert_eq!(parse_crs("  \n\0"), None);
    }
}
