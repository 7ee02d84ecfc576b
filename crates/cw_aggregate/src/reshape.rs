// crates/cw_aggregate/src/reshape.rs

//! 按单元重排
//!
//! 把“每个时间步一张表”转换为“每个单元一张表”，行为时间序列。
//! 每个时间步只读取一次，按单元分发。同一时间步同一单元出现多行为错误；
//! 单元在某时间步缺失时跳过该时间步并发出警告。

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cw_foundation::{CwError, CwResult};

use crate::runner::build_pool;
use crate::store::AggregateSource;
use crate::table::AggregatedTable;

/// 单元时间序列中的一行
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    /// 时间步
    pub timestep: usize,
    /// 流量
    pub discharge: f64,
    /// 聚合负荷
    pub load_aggregated: f64,
    /// 聚合本地流量
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_discharge_aggregated: Option<f64>,
}

/// 单元时间序列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitSeries {
    /// 单元名称
    pub unit: String,
    /// 按时间步升序排列的行
    pub rows: Vec<SeriesRow>,
}

/// 把按时间步排列的聚合表重排为各单元的时间序列
///
/// `tables` 的顺序即时间顺序；返回顺序与 `units` 一致。
pub fn pivot(tables: &[AggregatedTable], units: &[String]) -> CwResult<Vec<UnitSeries>> {
    let index: HashMap<&str, usize> = units
        .iter()
        .enumerate()
        .map(|(i, u)| (u.as_str(), i))
        .collect();
    let mut series: Vec<UnitSeries> = units
        .iter()
        .map(|u| UnitSeries {
            unit: u.clone(),
            rows: Vec::with_capacity(tables.len()),
        })
        .collect();

    let mut counts = vec![0usize; units.len()];
    for table in tables {
        counts.iter_mut().for_each(|c| *c = 0);
        for record in &table.records {
            let Some(&i) = index.get(record.unit.as_str()) else {
                continue;
            };
            counts[i] += 1;
            if counts[i] > 1 {
                let total = table.records.iter().filter(|r| r.unit == record.unit).count();
                return Err(CwError::duplicate_aggregation(table.step, record.unit.as_str(), total));
            }
            series[i].rows.push(SeriesRow {
                timestep: table.step,
                discharge: record.discharge,
                load_aggregated: record.load_aggregated,
                local_discharge_aggregated: record.local_discharge_aggregated,
            });
        }
        for (i, &c) in counts.iter().enumerate() {
            if c == 0 {
                warn!(unit = %units[i], step = table.step, "单元在时间步中没有聚合记录");
            }
        }
    }
    Ok(series)
}

/// 重排转换器
pub struct ReshapeConverter {
    num_threads: usize,
}

impl ReshapeConverter {
    /// 创建转换器（0 表示 rayon 默认线程数）
    pub fn new(num_threads: usize) -> Self {
        Self { num_threads }
    }

    /// 读取一个分组的全部时间步并重排
    ///
    /// 时间步并行读取，按索引组装后再重排，结果与读取完成顺序无关。
    pub fn convert(
        &self,
        source: &dyn AggregateSource,
        group: &str,
        units: &[String],
    ) -> CwResult<Vec<UnitSeries>> {
        let steps = source.step_count(group)?;
        let pool = build_pool(self.num_threads)?;
        let tables: Vec<AggregatedTable> = pool.install(|| {
            (0..steps)
                .into_par_iter()
                .map(|step| source.read_step(group, step))
                .collect::<CwResult<Vec<_>>>()
        })?;

        let series = pivot(&tables, units)?;
        info!("重排 {}: {} 个单元 × {} 步", group, series.len(), steps);
        Ok(series)
    }
}
