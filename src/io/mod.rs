//! 从文件系统读取数据集
//!
//! 输入可以是数据集目录,也可以是目录中的某个文件(例如 `hdr.adf`),
//! 后者按其所在目录处理。只读取扩展名为 `.adf` 的文件。

use crate::adf::{AdfError, FileSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 确定数据集目录
pub fn dataset_dir(path: &Path) -> Result<PathBuf, AdfError> {
    let metadata = fs::metadata(path).map_err(|source| AdfError::IoFailure {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.is_dir() {
        Ok(path.to_path_buf())
    } else {
        Ok(path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf())
    }
}

fn is_adf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("adf"))
}

fn io_failure(path: &Path) -> impl FnOnce(std::io::Error) -> AdfError {
    let path = path.to_path_buf();
    move |source| AdfError::IoFailure { path, source }
}

/// 读取目录中的全部 `.adf` 文件
pub fn load_dir(path: impl AsRef<Path>) -> Result<FileSet, AdfError> {
    let dir = dataset_dir(path.as_ref())?;
    let mut files = FileSet::new();
    for entry in fs::read_dir(&dir).map_err(io_failure(&dir))? {
        let entry = entry.map_err(io_failure(&dir))?;
        let file_path = entry.path();
        if !file_path.is_file() || !is_adf(&file_path) {
            continue;
        }
        let bytes = fs::read(&file_path).map_err(io_failure(&file_path))?;
        if let Some(name) = file_path.file_name().and_then(|n| n.to_str()) {
            debug!("读取 {name}: {} 字节", bytes.len());
            files.insert(name, bytes);
        }
    }
    Ok(files)
}

#[cfg(feature = "async")]
pub use not_sync::*;

#[cfg(feature = "async")]
mod not_sync {
    use super::*;
    use futures::future::try_join_all;

    /// [`load_dir`] 的异步版本,各文件并发读取
    pub async fn load_dir_async(path: impl AsRef<Path>) -> Result<FileSet, AdfError> {
        let path = path.as_ref().to_path_buf();
        let dir = tokio::fs::metadata(&path)
            .await
            .map_err(|source| AdfError::IoFailure {
                path: path.clone(),
                source,
            })
            .map(|metadata| {
                if metadata.is_dir() {
                    path.clone()
                } else {
                    path.parent()
                        .filter(|parent| !parent.as_os_str().is_empty())
                        .unwrap_or(Path::new("."))
                        .to_path_buf()
                }
            })?;

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|source| AdfError::IoFailure {
                path: dir.clone(),
                source,
            })?;
        let mut paths = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| AdfError::IoFailure {
                path: dir.clone(),
                source,
            })?
        {
            let file_path = entry.path();
            if is_adf(&file_path) && file_path.is_file() {
                paths.push(file_path);
            }
        }

        let contents = try_join_all(paths.into_iter().map(|file_path| async move {
            tokio::fs::read(&file_path)
                .await
                .map(|bytes| (file_path.clone(), bytes))
                .map_err(|source| AdfError::IoFailure {
                    path: file_path,
                    source,
                })
        }))
        .await?;

        Ok(contents
            .into_iter()
            .filter_map(|(file_path, bytes)| {
                let name = file_path.file_name()?.to_str()?.to_string();
                debug!("读取 {name}: {} 字节", bytes.len());
                Some((name, bytes))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("adftiff-io-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn file_path_uses_parent_directory() {
        let dir = temp_dir("parent");
        fs::write(dir.join("HDR.ADF"), b"abc").unwrap();
        fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let files = load_dir(dir.join("HDR.ADF")).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files.get("hdr.adf"), Some(&b"abc"[..]));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_path_is_io_failure() {
        let err = load_dir("/nonexistent/adftiff/grid").unwrap_err();
        assert!(matches!(err, AdfError::IoFailure { .. }));
    }
}
