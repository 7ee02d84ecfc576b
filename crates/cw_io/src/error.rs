// crates/cw_io/src/error.rs

//! CSV 与文件系统错误到 [`CwError`] 的映射
//!
//! 带位置的 CSV 错误映射为 [`CwError::Parse`]，其余映射为 [`CwError::Io`]。

use std::path::Path;

use cw_foundation::CwError;

/// 映射 CSV 错误
pub fn csv_error(path: &Path, err: csv::Error) -> CwError {
    let line = err.position().map(|p| p.line() as usize);
    match (line, err.into_kind()) {
        (_, csv::ErrorKind::Io(source)) => {
            CwError::io_with_source(format!("读取 {} 失败", path.display()), source)
        }
        (Some(line), kind) => CwError::parse(path, line, format!("{kind:?}")),
        (None, kind) => CwError::parse(path, 0, format!("{kind:?}")),
    }
}

/// 映射文件系统错误
pub fn io_error(path: &Path, action: &str, err: std::io::Error) -> CwError {
    CwError::io_with_source(format!("{action} {} 失败", path.display()), err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_path() {
        let err = io_error(
            Path::new("/data/steps"),
            "读取目录",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/data/steps"));
        assert!(matches!(err, CwError::Io { source: Some(_), .. }));
    }

    #[test]
    fn test_csv_error_has_line() {
        let data = "a,b\n1,2\n3\n";
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes());
        let err = reader
            .records()
            .find_map(Result::err)
            .expect("unequal lengths");
        let mapped = csv_error(Path::new("x.csv"), err);
        assert!(matches!(mapped, CwError::Parse { line: 3, .. }));
    }
}
