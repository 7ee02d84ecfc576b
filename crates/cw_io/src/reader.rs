// crates/cw_io/src/reader.rs

//! 带表头 CSV 的公共读取工具
//!
//! 列名按不区分大小写匹配；空单元格视为缺失值。

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use cw_foundation::{CatchmentId, CwError, CwResult};

use crate::error::{csv_error, io_error};

/// 打开带表头的 CSV 文件
pub(crate) fn open(path: &Path) -> CwResult<csv::Reader<BufReader<File>>> {
    let file = File::open(path).map_err(|e| io_error(path, "打开", e))?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file)))
}

/// 表头索引
pub(crate) struct Header {
    path: PathBuf,
    names: Vec<String>,
}

impl Header {
    /// 读取表头
    pub(crate) fn read<R: std::io::Read>(path: &Path, reader: &mut csv::Reader<R>) -> CwResult<Self> {
        let names = reader
            .headers()
            .map_err(|e| csv_error(path, e))?
            .iter()
            .map(str::to_string)
            .collect();
        Ok(Self {
            path: path.to_path_buf(),
            names,
        })
    }

    /// 可选列
    pub(crate) fn optional(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    /// 必需列
    pub(crate) fn required(&self, name: &str) -> CwResult<usize> {
        self.optional(name).ok_or_else(|| {
            CwError::parse(
                &self.path,
                1,
                format!("缺少列 '{name}'，现有列: {}", self.names.join(",")),
            )
        })
    }
}

/// 单行记录及其行号
pub(crate) struct Row<'a> {
    path: &'a Path,
    record: csv::StringRecord,
    line: usize,
}

impl<'a> Row<'a> {
    pub(crate) fn new(path: &'a Path, record: csv::StringRecord, fallback_line: usize) -> Self {
        let line = record
            .position()
            .map_or(fallback_line, |p| p.line() as usize);
        Self { path, record, line }
    }

    /// 行号（表头为第 1 行）
    pub(crate) fn line(&self) -> usize {
        self.line
    }

    fn cell(&self, idx: usize) -> Option<&str> {
        self.record.get(idx).filter(|s| !s.is_empty())
    }

    fn error(&self, message: String) -> CwError {
        CwError::parse(self.path, self.line, message)
    }

    /// 必需的 ID 单元格
    pub(crate) fn id(&self, idx: usize, field: &str) -> CwResult<CatchmentId> {
        self.cell(idx)
            .map(parse_id)
            .ok_or_else(|| self.error(format!("{field} 为空")))
    }

    /// 可选的浮点单元格
    pub(crate) fn opt_f64(&self, idx: Option<usize>, field: &str) -> CwResult<Option<f64>> {
        let Some(raw) = idx.and_then(|i| self.cell(i)) else {
            return Ok(None);
        };
        raw.parse::<f64>()
            .map(Some)
            .map_err(|_| self.error(format!("{field} 不是数值: '{raw}'")))
    }

    /// 必需的浮点单元格
    pub(crate) fn f64(&self, idx: usize, field: &str) -> CwResult<f64> {
        self.opt_f64(Some(idx), field)?
            .ok_or_else(|| self.error(format!("{field} 为空")))
    }

    /// 可选的非负整数单元格（接受 `3.0` 形式）
    pub(crate) fn opt_u32(&self, idx: Option<usize>, field: &str) -> CwResult<Option<u32>> {
        let Some(raw) = idx.and_then(|i| self.cell(i)) else {
            return Ok(None);
        };
        if let Ok(v) = raw.parse::<u32>() {
            return Ok(Some(v));
        }
        match raw.parse::<f64>() {
            Ok(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(Some(v as u32)),
            _ => Err(self.error(format!("{field} 不是非负整数: '{raw}'"))),
        }
    }
}

/// 解析 ID 单元格
///
/// 由数据库表导出的整数 ID 常带有 `.0` 后缀，这里去掉以便与其它表比较。
pub(crate) fn parse_id(raw: &str) -> CatchmentId {
    match raw.strip_suffix(".0") {
        Some(int) if !int.is_empty() && int.trim_start_matches('-').bytes().all(|b| b.is_ascii_digit()) => {
            CatchmentId::new(int)
        }
        _ => CatchmentId::new(raw),
    }
}
