//! GeoKey 取值

use num_traits::NumCast;

/// GeoKey 的值
///
/// 单个 Short 直接存放在目录里,Ascii 与 Double 分别存放在
/// GeoAsciiParams 与 GeoDoubleParams 标签中。
#[derive(Clone, Debug, PartialEq)]
pub enum GeoKeyValue {
    Short(Vec<u16>),
    Ascii(String),
    Double(Vec<f64>),
    /// 引用了不存在或无法解析的参数标签
    Undefined,
}

impl GeoKeyValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            GeoKeyValue::Ascii(s) => Some(s),
            _ => None,
        }
    }

    /// 只有一个数值时转换为 `T`,数组或文本返回 `None`
    pub fn as_number<T: NumCast>(&self) -> Option<T> {
        match self {
            GeoKeyValue::Short(v) if v.len() == 1 => T::from(v[0]),
            GeoKeyValue::Double(v) if v.len() == 1 => T::from(v[0]),
            _ => None,
        }
    }
}
