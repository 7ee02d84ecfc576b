// crates/cw_aggregate/src/runner.rs

//! 时间步并行驱动
//!
//! 各时间步的聚合只读取该时间步的源数据，彼此独立，
//! 因此在有界线程池上并行执行：
//!
//! - 结果按时间步索引写入，最终组装与完成顺序无关
//! - 任一时间步出错即停止派发剩余时间步，返回第一个错误

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use cw_foundation::{CwError, CwResult};

use crate::aggregator::AggregationPlan;
use crate::store::{AggregateSink, StepSource};

/// 运行器配置
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// 线程数（0 表示 rayon 默认）
    pub num_threads: usize,
}

/// 命名的聚合计划（分组名即输出表名）
#[derive(Debug, Clone)]
pub struct NamedPlan {
    /// 分组名
    pub group: String,
    /// 聚合计划
    pub plan: AggregationPlan,
}

impl NamedPlan {
    /// 创建命名计划
    pub fn new(group: impl Into<String>, plan: AggregationPlan) -> Self {
        Self {
            group: group.into(),
            plan,
        }
    }
}

/// 运行摘要
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// 时间步数
    pub steps: usize,
    /// 写出的记录数
    pub records: usize,
    /// 耗时
    pub elapsed: Duration,
}

/// 按有界线程数构建线程池
pub(crate) fn build_pool(num_threads: usize) -> CwResult<ThreadPool> {
    let mut builder = ThreadPoolBuilder::new();
    if num_threads > 0 {
        builder = builder.num_threads(num_threads);
    }
    builder
        .build()
        .map_err(|e| CwError::configuration(format!("创建线程池失败: {e}")))
}

/// 时间步聚合运行器
pub struct TimestepRunner {
    pool: ThreadPool,
}

impl TimestepRunner {
    /// 创建运行器
    pub fn new(config: &RunnerConfig) -> CwResult<Self> {
        Ok(Self {
            pool: build_pool(config.num_threads)?,
        })
    }

    /// 线程数
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// 对所有时间步执行全部计划，结果写入 `sink`
    pub fn run(
        &self,
        source: &dyn StepSource,
        plans: &[NamedPlan],
        sink: &dyn AggregateSink,
    ) -> CwResult<RunSummary> {
        let steps = source.step_count();
        let start = Instant::now();
        let records = AtomicUsize::new(0);
        let done = AtomicUsize::new(0);

        info!(
            "=== 时间步聚合: {} 步, {} 组, {} 线程 ===",
            steps,
            plans.len(),
            self.num_threads()
        );

        for named in plans {
            sink.clear_group(&named.group)?;
        }

        self.pool.install(|| {
            (0..steps).into_par_iter().try_for_each(|step| -> CwResult<()> {
                let table = source.read_step(step)?;
                for named in plans {
                    let out = named.plan.evaluate(&table)?;
                    records.fetch_add(out.len(), Ordering::Relaxed);
                    sink.write_step(&named.group, &out)?;
                }
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(step, completed = n, total = steps, "时间步聚合完成");
                Ok(())
            })
        })?;

        let summary = RunSummary {
            steps,
            records: records.into_inner(),
            elapsed: start.elapsed(),
        };
        info!(
            "聚合完成: {} 步, {} 条记录, 耗时 {:.2?}",
            summary.steps, summary.records, summary.elapsed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{AggregationUnit, DischargeRule};
    use crate::store::{AggregateSource, MemoryAggregateStore, MemoryStepStore};
    use crate::table::{SourceRow, StepTable};
    use cw_foundation::CatchmentId;

    fn plan(outlet: &str, members: &[&str]) -> AggregationPlan {
        AggregationPlan::new(vec![AggregationUnit {
            name: outlet.to_string(),
            discharge: DischargeRule::AtOutlets(vec![CatchmentId::from(outlet)]),
            members: members.iter().map(|s| CatchmentId::from(*s)).collect(),
        }])
    }

    fn source(steps: usize) -> MemoryStepStore {
        let tables = (0..steps)
            .map(|i| {
                StepTable::new(
                    i,
                    vec![
                        SourceRow::new("a", 1.0, i as f64),
                        SourceRow::new("b", 2.0, 1.0),
                    ],
                )
                .unwrap()
            })
            .collect();
        MemoryStepStore::new(tables).unwrap()
    }

    #[test]
    fn test_run_writes_every_step() {
        let runner = TimestepRunner::new(&RunnerConfig { num_threads: 2 }).unwrap();
        let sink = MemoryAggregateStore::new();
        let plans = vec![NamedPlan::new("upstream", plan("b", &["a", "b"]))];

        let summary = runner.run(&source(10), &plans, &sink).unwrap();
        assert_eq!(summary.steps, 10);
        assert_eq!(summary.records, 10);
        assert_eq!(sink.step_count("upstream").unwrap(), 10);

        let step7 = sink.read_step("upstream", 7).unwrap();
        assert_eq!(step7.records[0].load_aggregated, 8.0);
        assert_eq!(step7.records[0].discharge, 2.0);
    }

    #[test]
    fn test_run_propagates_missing_outlet() {
        let runner = TimestepRunner::new(&RunnerConfig::default()).unwrap();
        let sink = MemoryAggregateStore::new();
        let plans = vec![NamedPlan::new("upstream", plan("zz", &["a"]))];

        let err = runner.run(&source(4), &plans, &sink).unwrap_err();
        assert!(matches!(err, CwError::DataCompleteness { .. }));
    }
}
