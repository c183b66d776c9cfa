//! 数据集文件集合

use std::collections::BTreeMap;

/// 一个 ArcInfo Grid 数据集的全部文件,文件名到内容
///
/// 文件名不区分大小写,统一按小写保存。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSet {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, bytes: Vec<u8>) {
        self.files.insert(name.to_ascii_lowercase(), bytes);
    }

    pub fn with_file(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(&name.to_ascii_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<(String, Vec<u8>)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for (name, bytes) in iter {
            set.insert(&name, bytes);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        let files = FileSet::new().with_file("HDR.ADF", vec![1, 2]);
        assert!(files.contains("hdr.adf"));
        assert_eq!(files.get("Hdr.Adf"), Some(&[1u8, 2][..]));
        assert_eq!(files.names().collect::<Vec<_>>(), vec!["hdr.adf"]);
    }
}
