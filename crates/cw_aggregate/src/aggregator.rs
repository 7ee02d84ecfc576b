// crates/cw_aggregate/src/aggregator.rs

//! 时间步聚合
//!
//! 负荷总是在成员集合上求和。流量的处理取决于汇入方式：
//!
//! - 上游汇入：出口流量已经代表整个上游的累积流量，只读取出口本身的一行，
//!   求和会重复计算
//! - 侧向汇入：相互独立的入流可以相加
//!
//! 出口在某时间步缺失时返回 `DataCompleteness` 错误，不以 0 代替。

use tracing::trace;

use cw_foundation::{CatchmentId, CwError, CwResult, KahanSum};
use cw_network::{LinkSet, UpstreamSet};

use crate::table::{AggregatedRecord, AggregatedTable, StepTable};

/// 单元在某时间步的聚合值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    /// 流量
    pub discharge: f64,
    /// 负荷
    pub load: f64,
    /// 本地流量（源表没有该列时为 None）
    pub local_discharge: Option<f64>,
}

/// 流量取值规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DischargeRule {
    /// 在各出口处读取并相加，出口缺失为错误
    AtOutlets(Vec<CatchmentId>),
    /// 在成员集合上求和
    Summed,
}

/// 聚合单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationUnit {
    /// 单元名称
    pub name: String,
    /// 流量规则
    pub discharge: DischargeRule,
    /// 负荷成员集合
    pub members: Vec<CatchmentId>,
}

impl AggregationUnit {
    /// 计算单元在某时间步的聚合值
    pub fn evaluate(&self, table: &StepTable) -> CwResult<Totals> {
        let with_local = table.has_local_discharge();
        let mut load = KahanSum::new();
        let mut local = KahanSum::new();
        let mut summed_discharge = KahanSum::new();
        let mut absent = 0usize;

        for id in &self.members {
            match table.get(id) {
                Some(row) => {
                    load.add(row.load);
                    summed_discharge.add(row.discharge);
                    if let Some(q) = row.local_discharge {
                        local.add(q);
                    }
                }
                None => absent += 1,
            }
        }
        if absent > 0 {
            trace!(unit = %self.name, step = table.step(), absent, "成员流域在时间步中缺失");
        }

        let discharge = match &self.discharge {
            DischargeRule::Summed => summed_discharge.value(),
            DischargeRule::AtOutlets(outlets) => {
                let mut sum = KahanSum::new();
                for outlet in outlets {
                    let row = table.get(outlet).ok_or_else(|| {
                        CwError::data_completeness(table.step(), outlet.as_str(), self.name.clone())
                    })?;
                    sum.add(row.discharge);
                }
                sum.value()
            }
        };

        Ok(Totals {
            discharge,
            load: load.value(),
            local_discharge: with_local.then_some(local.value()),
        })
    }
}

/// 上游聚合：流量取出口一行，负荷在 `ids` 上求和
pub fn aggregate_upstream(table: &StepTable, outlet: &CatchmentId, ids: &[CatchmentId]) -> CwResult<Totals> {
    AggregationUnit {
        name: outlet.to_string(),
        discharge: DischargeRule::AtOutlets(vec![outlet.clone()]),
        members: ids.to_vec(),
    }
    .evaluate(table)
}

/// 侧向聚合：流量与负荷都在 `ids` 上求和
pub fn aggregate_lateral(table: &StepTable, ids: &[CatchmentId]) -> CwResult<Totals> {
    AggregationUnit {
        name: "lateral".to_string(),
        discharge: DischargeRule::Summed,
        members: ids.to_vec(),
    }
    .evaluate(table)
}

/// 聚合计划：一组单元，每个时间步整体求值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationPlan {
    units: Vec<AggregationUnit>,
}

impl AggregationPlan {
    /// 由单元列表创建
    pub fn new(units: Vec<AggregationUnit>) -> Self {
        Self { units }
    }

    /// 独立出口的上游聚合
    pub fn upstream_outlets(sets: &[UpstreamSet]) -> Self {
        Self::new(
            sets.iter()
                .map(|s| AggregationUnit {
                    name: s.outlet.to_string(),
                    discharge: DischargeRule::AtOutlets(vec![s.outlet.clone()]),
                    members: s.ids.clone(),
                })
                .collect(),
        )
    }

    /// 分区上游输入：流量取首部各支流出口，负荷在上游输入集合上求和
    pub fn compartment_upstream(links: &LinkSet) -> Self {
        Self::new(
            links
                .inputs()
                .iter()
                .map(|x| AggregationUnit {
                    name: x.compartment.clone(),
                    discharge: DischargeRule::AtOutlets(x.upstream_tributaries.clone()),
                    members: x.upstream_input.clone(),
                })
                .collect(),
        )
    }

    /// 分区侧向输入：流量取沿程各支流出口，负荷在侧向输入集合上求和
    pub fn compartment_lateral(links: &LinkSet) -> Self {
        Self::new(
            links
                .inputs()
                .iter()
                .map(|x| AggregationUnit {
                    name: x.compartment.clone(),
                    discharge: DischargeRule::AtOutlets(x.lateral_tributaries.clone()),
                    members: x.lateral_input.clone(),
                })
                .collect(),
        )
    }

    /// 单元列表
    #[inline]
    pub fn units(&self) -> &[AggregationUnit] {
        &self.units
    }

    /// 单元名称
    pub fn unit_names(&self) -> Vec<String> {
        self.units.iter().map(|u| u.name.clone()).collect()
    }

    /// 单元数
    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 对一个时间步求值
    pub fn evaluate(&self, table: &StepTable) -> CwResult<AggregatedTable> {
        let mut out = AggregatedTable::new(table.step());
        out.records.reserve(self.units.len());
        for unit in &self.units {
            let totals = unit.evaluate(table)?;
            out.records.push(AggregatedRecord {
                unit: unit.name.clone(),
                step: table.step(),
                discharge: totals.discharge,
                load_aggregated: totals.load,
                local_discharge_aggregated: totals.local_discharge,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::SourceRow;

    fn xyz() -> StepTable {
        StepTable::new(
            0,
            vec![
                SourceRow::new("x", 5.0, 1.0),
                SourceRow::new("y", 5.0, 2.0),
                SourceRow::new("z", 20.0, 3.0),
            ],
        )
        .unwrap()
    }

    fn ids(names: &[&str]) -> Vec<CatchmentId> {
        names.iter().map(|s| CatchmentId::from(*s)).collect()
    }

    #[test]
    fn test_upstream_reads_outlet_discharge() {
        let totals = aggregate_upstream(&xyz(), &"z".into(), &ids(&["x", "y", "z"])).unwrap();
        assert_eq!(totals.load, 6.0);
        assert_eq!(totals.discharge, 20.0);
        assert_eq!(totals.local_discharge, None);
    }

    #[test]
    fn test_lateral_sums_discharge() {
        let totals = aggregate_lateral(&xyz(), &ids(&["x", "y", "z"])).unwrap();
        assert_eq!(totals.load, 6.0);
        assert_eq!(totals.discharge, 30.0);
    }

    #[test]
    fn test_missing_outlet_is_fatal() {
        let err = aggregate_upstream(&xyz(), &"q".into(), &ids(&["x", "q"])).unwrap_err();
        match err {
            CwError::DataCompleteness { step, id, .. } => {
                assert_eq!(step, 0);
                assert_eq!(id, "q");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_members_are_skipped() {
        let totals = aggregate_lateral(&xyz(), &ids(&["x", "nope"])).unwrap();
        assert_eq!(totals.load, 1.0);
    }

    #[test]
    fn test_local_discharge_summed_over_members() {
        let table = StepTable::new(
            4,
            vec![
                SourceRow::new("a", 3.0, 1.0).with_local_discharge(1.0),
                SourceRow::new("b", 2.0, 1.0).with_local_discharge(2.0),
            ],
        )
        .unwrap();
        let totals = aggregate_upstream(&table, &"a".into(), &ids(&["a", "b"])).unwrap();
        assert_eq!(totals.local_discharge, Some(3.0));
        assert_eq!(totals.discharge, 3.0);
    }

    #[test]
    fn test_no_outlets_gives_zero_discharge() {
        let unit = AggregationUnit {
            name: "Cx".into(),
            discharge: DischargeRule::AtOutlets(Vec::new()),
            members: ids(&["x"]),
        };
        let totals = unit.evaluate(&xyz()).unwrap();
        assert_eq!(totals.discharge, 0.0);
        assert_eq!(totals.load, 1.0);
    }

    #[test]
    fn test_plan_evaluate() {
        let plan = AggregationPlan::new(vec![
            AggregationUnit {
                name: "up".into(),
                discharge: DischargeRule::AtOutlets(ids(&["z"])),
                members: ids(&["x", "y", "z"]),
            },
            AggregationUnit {
                name: "lat".into(),
                discharge: DischargeRule::Summed,
                members: ids(&["x", "y", "z"]),
            },
        ]);
        let table = plan.evaluate(&xyz()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].discharge, 20.0);
        assert_eq!(table.records[1].discharge, 30.0);
        assert_eq!(plan.unit_names(), vec!["up".to_string(), "lat".to_string()]);
    }
}
