// crates/cw_aggregate/src/lib.rs

//! Crosswater Aggregate Layer
//!
//! 按时间步聚合流域的流量与负荷，并重排为每个单元一张时间序列表。
//!
//! # 模块概览
//!
//! - [`table`]: 时间步源数据表与聚合记录
//! - [`aggregator`]: 上游/侧向聚合规则与聚合计划
//! - [`store`]: 源数据与聚合结果的存储抽象、内存实现
//! - [`runner`]: 有界线程池上的时间步并行驱动
//! - [`reshape`]: 按单元重排
//! - [`buffer`]: 湖泊负荷缓冲
//!
//! # 使用示例
//!
//! ```
//! use cw_aggregate::aggregator::aggregate_upstream;
//! use cw_aggregate::table::{SourceRow, StepTable};
//! use cw_foundation::CatchmentId;
//!
//! let table = StepTable::new(0, vec![
//!     SourceRow::new("x", 5.0, 1.0),
//!     SourceRow::new("z", 20.0, 3.0),
//! ]).unwrap();
//! let ids: Vec<CatchmentId> = vec!["x".into(), "z".into()];
//! let totals = aggregate_upstream(&table, &"z".into(), &ids).unwrap();
//! assert_eq!(totals.discharge, 20.0);
//! assert_eq!(totals.load, 4.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod buffer;
pub mod reshape;
pub mod runner;
pub mod store;
pub mod table;

pub use aggregator::{
    aggregate_lateral, aggregate_upstream, AggregationPlan, AggregationUnit, DischargeRule, Totals,
};
pub use buffer::{lake_catchments, LakeBufferedSource};
pub use reshape::{pivot, ReshapeConverter, SeriesRow, UnitSeries};
pub use runner::{NamedPlan, RunSummary, RunnerConfig, TimestepRunner};
pub use store::{
    AggregateSink, AggregateSource, MemoryAggregateStore, MemoryStepStore, StepSource,
};
pub use table::{AggregatedRecord, AggregatedTable, SourceRow, StepTable};

/// 分区上游输入分组名
pub const GROUP_UPSTREAM_INPUT: &str = "upstream_input";
/// 分区侧向输入分组名
pub const GROUP_LATERAL_INPUT: &str = "lateral_input";
/// 独立出口上游聚合分组名
pub const GROUP_OUTLETS: &str = "outlets";
