// crates/cw_aggregate/src/table.rs

//! 时间步表
//!
//! - [`StepTable`]: 单个时间步的流域源数据（流量、负荷、可选的本地流量）
//! - [`AggregatedTable`]: 单个时间步的聚合结果，每个单元一条记录

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use cw_foundation::{CatchmentId, CwError, CwResult};

/// 单个流域在某时间步的源数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    /// 流域 ID
    pub catchment: CatchmentId,
    /// 流量 [m³/s]
    pub discharge: f64,
    /// 负荷
    pub load: f64,
    /// 本地流量 [m³/s]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_discharge: Option<f64>,
}

impl SourceRow {
    /// 创建源数据行
    pub fn new(catchment: impl Into<CatchmentId>, discharge: f64, load: f64) -> Self {
        Self {
            catchment: catchment.into(),
            discharge,
            load,
            local_discharge: None,
        }
    }

    /// 设置本地流量
    pub fn with_local_discharge(mut self, local_discharge: f64) -> Self {
        self.local_discharge = Some(local_discharge);
        self
    }

    fn validate(&self) -> CwResult<()> {
        let id = self.catchment.as_str();
        CwError::check_non_negative("discharge", id, self.discharge)?;
        CwError::check_non_negative("load", id, self.load)?;
        if let Some(q) = self.local_discharge {
            CwError::check_non_negative("local_discharge", id, q)?;
        }
        Ok(())
    }
}

/// 单个时间步的源数据表
///
/// 构建时检查数值有效且流域 ID 不重复，之后只读。
#[derive(Debug, Clone, Default)]
pub struct StepTable {
    step: usize,
    rows: Vec<SourceRow>,
    index: HashMap<CatchmentId, usize>,
}

impl StepTable {
    /// 创建并检查时间步表
    pub fn new(step: usize, rows: Vec<SourceRow>) -> CwResult<Self> {
        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            row.validate()?;
            if index.insert(row.catchment.clone(), i).is_some() {
                return Err(CwError::invalid_input(format!(
                    "时间步 {step} 中流域 {} 出现多次",
                    row.catchment
                )));
            }
        }
        Ok(Self { step, rows, index })
    }

    /// 时间步索引
    #[inline]
    pub fn step(&self) -> usize {
        self.step
    }

    /// 按流域查询
    #[inline]
    pub fn get(&self, id: &CatchmentId) -> Option<&SourceRow> {
        self.index.get(id).map(|&i| &self.rows[i])
    }

    /// 所有行
    #[inline]
    pub fn rows(&self) -> &[SourceRow] {
        &self.rows
    }

    /// 是否含本地流量列
    pub fn has_local_discharge(&self) -> bool {
        self.rows.iter().any(|r| r.local_discharge.is_some())
    }

    /// 替换部分流域的负荷
    pub(crate) fn replace_loads(&mut self, loads: &HashMap<CatchmentId, f64>) {
        for row in &mut self.rows {
            if let Some(load) = loads.get(&row.catchment) {
                row.load = *load;
            }
        }
    }

    /// 行数
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 聚合记录：单元在某时间步的流量与负荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    /// 单元名称（分区名或出口 ID）
    pub unit: String,
    /// 时间步
    pub step: usize,
    /// 流量
    pub discharge: f64,
    /// 聚合负荷
    pub load_aggregated: f64,
    /// 聚合本地流量
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_discharge_aggregated: Option<f64>,
}

/// 单个时间步的聚合结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedTable {
    /// 时间步
    pub step: usize,
    /// 聚合记录
    pub records: Vec<AggregatedRecord>,
}

impl AggregatedTable {
    /// 创建空表
    pub fn new(step: usize) -> Self {
        Self {
            step,
            records: Vec::new(),
        }
    }

    /// 记录数
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_table_lookup() {
        let table = StepTable::new(
            3,
            vec![SourceRow::new("a", 1.0, 2.0), SourceRow::new("b", 0.0, 0.5)],
        )
        .unwrap();
        assert_eq!(table.step(), 3);
        assert_eq!(table.get(&"b".into()).unwrap().load, 0.5);
        assert!(table.get(&"c".into()).is_none());
        assert!(!table.has_local_discharge());
    }

    #[test]
    fn test_negative_discharge_rejected() {
        let err = StepTable::new(0, vec![SourceRow::new("a", -1.0, 0.0)]).unwrap_err();
        assert!(matches!(err, CwError::InvalidValue { field: "discharge", .. }));
    }

    #[test]
    fn test_nan_load_rejected() {
        assert!(StepTable::new(0, vec![SourceRow::new("a", 1.0, f64::NAN)]).is_err());
    }

    #[test]
    fn test_duplicate_row_rejected() {
        let rows = vec![SourceRow::new("a", 1.0, 1.0), SourceRow::new("a", 2.0, 2.0)];
        let err = StepTable::new(0, rows).unwrap_err();
        assert!(matches!(err, CwError::InvalidInput { .. }));
    }

    #[test]
    fn test_local_discharge_validated() {
        let row = SourceRow::new("a", 1.0, 1.0).with_local_discharge(-0.1);
        assert!(StepTable::new(0, vec![row]).is_err());
    }
}
