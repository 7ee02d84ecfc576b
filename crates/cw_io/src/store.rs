// crates/cw_io/src/store.rs

//! 目录存储
//!
//! 每个时间步一个 `step_<n>.csv`：
//! - [`CsvStepStore`]: `<dir>/step_<n>.csv` 源数据，只读
//! - [`CsvAggregateStore`]: `<root>/<group>/step_<n>.csv` 聚合结果，可读写
//!
//! 不同时间步写入不同文件，并行写入无需加锁。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cw_aggregate::{
    AggregateSink, AggregateSource, AggregatedRecord, AggregatedTable, SourceRow, StepSource,
    StepTable,
};
use cw_config::StepColumns;
use cw_foundation::{CwError, CwResult};

use crate::error::{csv_error, io_error};
use crate::reader::{open, Header, Row};

const STEP_PREFIX: &str = "step_";
const STEP_EXT: &str = ".csv";

/// 时间步文件名
pub fn step_file_name(step: usize) -> String {
    format!("{STEP_PREFIX}{step}{STEP_EXT}")
}

fn parse_step_file_name(name: &str) -> Option<usize> {
    name.strip_prefix(STEP_PREFIX)?
        .strip_suffix(STEP_EXT)?
        .parse()
        .ok()
}

/// 目录中的时间步索引（升序）
fn scan_steps(dir: &Path) -> CwResult<Vec<usize>> {
    let mut steps = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_error(dir, "读取目录", e))? {
        let entry = entry.map_err(|e| io_error(dir, "读取目录", e))?;
        if let Some(step) = entry.file_name().to_str().and_then(parse_step_file_name) {
            steps.push(step);
        }
    }
    steps.sort_unstable();
    Ok(steps)
}

// ============================================================================
// 源数据目录
// ============================================================================

/// CSV 源数据目录
#[derive(Debug, Clone)]
pub struct CsvStepStore {
    dir: PathBuf,
    columns: StepColumns,
    steps: usize,
}

impl CsvStepStore {
    /// 打开目录
    ///
    /// 时间步必须连续编号 `0..N`。
    pub fn open(dir: impl Into<PathBuf>, columns: StepColumns) -> CwResult<Self> {
        let dir = dir.into();
        let steps = scan_steps(&dir)?;
        if let Some((pos, step)) = steps.iter().enumerate().find(|(i, s)| *i != **s) {
            return Err(CwError::invalid_input(format!(
                "{} 中时间步不连续: 期望 {pos}, 找到 {step}",
                dir.display()
            )));
        }
        info!("打开时间步目录 {}: {} 步", dir.display(), steps.len());
        Ok(Self {
            dir,
            columns,
            steps: steps.len(),
        })
    }

    /// 目录
    pub fn directory(&self) -> &Path {
        &self.dir
    }
}

impl StepSource for CsvStepStore {
    fn step_count(&self) -> usize {
        self.steps
    }

    fn read_step(&self, step: usize) -> CwResult<StepTable> {
        if step >= self.steps {
            return Err(CwError::invalid_input(format!("时间步 {step} 不存在")));
        }
        let path = self.dir.join(step_file_name(step));
        let c = &self.columns;

        let mut reader = open(&path)?;
        let header = Header::read(&path, &mut reader)?;
        let id_idx = header.required(&c.catchment)?;
        let q_idx = header.required(&c.discharge)?;
        let load_idx = header.required(&c.load)?;
        let local_idx = header.optional(&c.local_discharge);

        let mut rows = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| csv_error(&path, e))?;
            let row = Row::new(&path, record, row_idx + 2);
            let mut source = SourceRow::new(
                row.id(id_idx, &c.catchment)?,
                row.f64(q_idx, &c.discharge)?,
                row.f64(load_idx, &c.load)?,
            );
            source.local_discharge = row.opt_f64(local_idx, &c.local_discharge)?;
            rows.push(source);
        }
        debug!("读取 {}: {} 行", path.display(), rows.len());
        StepTable::new(step, rows)
    }
}

// ============================================================================
// 聚合结果目录
// ============================================================================

/// 落盘的聚合行
///
/// 本地流量始终占一列，缺失时为空单元格，保证各行列数一致。
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    unit: String,
    step: usize,
    discharge: f64,
    load_aggregated: f64,
    local_discharge_aggregated: Option<f64>,
}

impl From<&AggregatedRecord> for StoredRecord {
    fn from(r: &AggregatedRecord) -> Self {
        Self {
            unit: r.unit.clone(),
            step: r.step,
            discharge: r.discharge,
            load_aggregated: r.load_aggregated,
            local_discharge_aggregated: r.local_discharge_aggregated,
        }
    }
}

impl From<StoredRecord> for AggregatedRecord {
    fn from(r: StoredRecord) -> Self {
        Self {
            unit: r.unit,
            step: r.step,
            discharge: r.discharge,
            load_aggregated: r.load_aggregated,
            local_discharge_aggregated: r.local_discharge_aggregated,
        }
    }
}

/// CSV 聚合结果目录
#[derive(Debug, Clone)]
pub struct CsvAggregateStore {
    root: PathBuf,
}

impl CsvAggregateStore {
    /// 创建存储，目录不存在时创建
    pub fn new(root: impl Into<PathBuf>) -> CwResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| io_error(&root, "创建目录", e))?;
        Ok(Self { root })
    }

    /// 分组目录
    pub fn group_dir(&self, group: &str) -> PathBuf {
        self.root.join(group)
    }

    /// 根目录
    pub fn directory(&self) -> &Path {
        &self.root
    }
}

impl AggregateSink for CsvAggregateStore {
    fn clear_group(&self, group: &str) -> CwResult<()> {
        let dir = self.group_dir(group);
        if !dir.is_dir() {
            return Ok(());
        }
        let stale = scan_steps(&dir)?;
        for step in &stale {
            let path = dir.join(step_file_name(*step));
            std::fs::remove_file(&path).map_err(|e| io_error(&path, "删除", e))?;
        }
        if !stale.is_empty() {
            debug!(group, removed = stale.len(), "清除旧的聚合时间步");
        }
        Ok(())
    }

    fn write_step(&self, group: &str, table: &AggregatedTable) -> CwResult<()> {
        let dir = self.group_dir(group);
        std::fs::create_dir_all(&dir).map_err(|e| io_error(&dir, "创建目录", e))?;
        let path = dir.join(step_file_name(table.step));

        let mut writer = csv::Writer::from_path(&path).map_err(|e| csv_error(&path, e))?;
        if table.records.is_empty() {
            writer
                .write_record(["unit", "step", "discharge", "load_aggregated", "local_discharge_aggregated"])
                .map_err(|e| csv_error(&path, e))?;
        }
        for record in &table.records {
            writer
                .serialize(StoredRecord::from(record))
                .map_err(|e| csv_error(&path, e))?;
        }
        writer.flush().map_err(|e| io_error(&path, "写入", e))?;
        Ok(())
    }
}

impl AggregateSource for CsvAggregateStore {
    fn step_count(&self, group: &str) -> CwResult<usize> {
        let dir = self.group_dir(group);
        if !dir.is_dir() {
            return Err(CwError::invalid_input(format!("聚合分组 {group} 不存在")));
        }
        Ok(scan_steps(&dir)?.last().map_or(0, |last| last + 1))
    }

    fn read_step(&self, group: &str, step: usize) -> CwResult<AggregatedTable> {
        let path = self.group_dir(group).join(step_file_name(step));
        if !path.is_file() {
            return Err(CwError::invalid_input(format!("聚合分组 {group} 缺少时间步 {step}")));
        }
        let mut reader = open(&path)?;
        let records = reader
            .deserialize::<StoredRecord>()
            .map(|r| r.map(AggregatedRecord::from).map_err(|e| csv_error(&path, e)))
            .collect::<CwResult<Vec<_>>>()?;
        Ok(AggregatedTable { step, records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_file_names() {
        assert_eq!(step_file_name(12), "step_12.csv");
        assert_eq!(parse_step_file_name("step_12.csv"), Some(12));
        assert_eq!(parse_step_file_name("step_x.csv"), None);
        assert_eq!(parse_step_file_name("steps.csv"), None);
    }

    #[test]
    fn test_step_store_reads_optional_local_discharge() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("step_0.csv"),
            "catchment,discharge,load,local_discharge\na,1.5,2,0.5\nb,3,4,\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("step_1.csv"), "catchment,discharge,load\na,1,1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = CsvStepStore::open(dir.path(), StepColumns::default()).unwrap();
        assert_eq!(store.step_count(), 2);

        let t0 = store.read_step(0).unwrap();
        assert_eq!(t0.get(&"a".into()).unwrap().local_discharge, Some(0.5));
        assert_eq!(t0.get(&"b".into()).unwrap().local_discharge, None);
        let t1 = store.read_step(1).unwrap();
        assert!(!t1.has_local_discharge());
        assert!(store.read_step(2).is_err());
    }

    #[test]
    fn test_step_store_rejects_gap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("step_0.csv"), "catchment,discharge,load\n").unwrap();
        std::fs::write(dir.path().join("step_2.csv"), "catchment,discharge,load\n").unwrap();
        assert!(CsvStepStore::open(dir.path(), StepColumns::default()).is_err());
    }

    #[test]
    fn test_step_store_negative_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("step_0.csv"), "catchment,discharge,load\na,1,-2\n").unwrap();
        let store = CsvStepStore::open(dir.path(), StepColumns::default()).unwrap();
        assert!(matches!(
            store.read_step(0),
            Err(CwError::InvalidValue { field: "load", .. })
        ));
    }

    #[test]
    fn test_aggregate_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvAggregateStore::new(dir.path().join("agg")).unwrap();
        let table = AggregatedTable {
            step: 1,
            records: vec![
                AggregatedRecord {
                    unit: "C1".into(),
                    step: 1,
                    discharge: 2.0,
                    load_aggregated: 3.0,
                    local_discharge_aggregated: None,
                },
                AggregatedRecord {
                    unit: "C2".into(),
                    step: 1,
                    discharge: 4.0,
                    load_aggregated: 5.0,
                    local_discharge_aggregated: None,
                },
            ],
        };
        store.write_step("lateral_input", &table).unwrap();
        store.write_step("lateral_input", &AggregatedTable::new(0)).unwrap();

        assert_eq!(store.step_count("lateral_input").unwrap(), 2);
        assert_eq!(store.read_step("lateral_input", 1).unwrap(), table);
        assert!(store.read_step("lateral_input", 0).unwrap().is_empty());
        assert!(store.step_count("upstream_input").is_err());
    }

    #[test]
    fn test_clear_group_keeps_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvAggregateStore::new(dir.path()).unwrap();
        store.write_step("outlets", &AggregatedTable::new(0)).unwrap();
        store.write_step("outlets", &AggregatedTable::new(1)).unwrap();
        std::fs::write(store.group_dir("outlets").join("readme.txt"), "keep").unwrap();

        store.clear_group("outlets").unwrap();
        assert_eq!(store.step_count("outlets").unwrap(), 0);
        assert!(store.group_dir("outlets").join("readme.txt").is_file());
        store.clear_group("missing").unwrap();
    }
}
