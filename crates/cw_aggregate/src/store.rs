// crates/cw_aggregate/src/store.rs

//! 时间步存储抽象
//!
//! - [`StepSource`]: 按时间步读取源数据，必须支持并发读取
//! - [`AggregateSink`]: 按 `(分组, 时间步)` 写入聚合结果，写入顺序任意
//! - [`AggregateSource`]: 读回聚合结果，供重排使用
//!
//! 内存实现用于测试和小数据集，目录实现见 `cw_io`。

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use cw_foundation::{CwError, CwResult};

use crate::table::{AggregatedTable, StepTable};

/// 源数据存储
pub trait StepSource: Send + Sync {
    /// 时间步数
    fn step_count(&self) -> usize;

    /// 读取时间步
    fn read_step(&self, step: usize) -> CwResult<StepTable>;
}

/// 聚合结果写入端
pub trait AggregateSink: Send + Sync {
    /// 清空分组中已有的时间步，每次运行开始前调用
    fn clear_group(&self, group: &str) -> CwResult<()>;

    /// 写入一个分组的一个时间步
    fn write_step(&self, group: &str, table: &AggregatedTable) -> CwResult<()>;
}

/// 聚合结果读取端
pub trait AggregateSource: Send + Sync {
    /// 分组中的时间步数
    fn step_count(&self, group: &str) -> CwResult<usize>;

    /// 读取一个分组的一个时间步
    fn read_step(&self, group: &str, step: usize) -> CwResult<AggregatedTable>;
}

// ============================================================================
// 内存源数据存储
// ============================================================================

/// 内存源数据存储
#[derive(Debug, Default)]
pub struct MemoryStepStore {
    steps: Vec<StepTable>,
}

impl MemoryStepStore {
    /// 由时间步表创建，表的时间步必须为 0..N 且与位置一致
    pub fn new(steps: Vec<StepTable>) -> CwResult<Self> {
        for (i, table) in steps.iter().enumerate() {
            if table.step() != i {
                return Err(CwError::invalid_input(format!(
                    "第 {i} 个时间步表的时间步为 {}",
                    table.step()
                )));
            }
        }
        Ok(Self { steps })
    }
}

impl StepSource for MemoryStepStore {
    fn step_count(&self) -> usize {
        self.steps.len()
    }

    fn read_step(&self, step: usize) -> CwResult<StepTable> {
        self.steps
            .get(step)
            .cloned()
            .ok_or_else(|| CwError::invalid_input(format!("时间步 {step} 不存在")))
    }
}

// ============================================================================
// 内存聚合结果存储
// ============================================================================

/// 内存聚合结果存储
#[derive(Debug, Default)]
pub struct MemoryAggregateStore {
    groups: RwLock<HashMap<String, BTreeMap<usize, AggregatedTable>>>,
}

impl MemoryAggregateStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 分组名称
    pub fn groups(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl AggregateSink for MemoryAggregateStore {
    fn clear_group(&self, group: &str) -> CwResult<()> {
        self.groups.write().remove(group);
        Ok(())
    }

    fn write_step(&self, group: &str, table: &AggregatedTable) -> CwResult<()> {
        self.groups
            .write()
            .entry(group.to_string())
            .or_default()
            .insert(table.step, table.clone());
        Ok(())
    }
}

impl AggregateSource for MemoryAggregateStore {
    fn step_count(&self, group: &str) -> CwResult<usize> {
        let groups = self.groups.read();
        let steps = groups
            .get(group)
            .ok_or_else(|| CwError::invalid_input(format!("聚合分组 {group} 不存在")))?;
        Ok(steps.keys().next_back().map_or(0, |last| last + 1))
    }

    fn read_step(&self, group: &str, step: usize) -> CwResult<AggregatedTable> {
        self.groups
            .read()
            .get(group)
            .and_then(|steps| steps.get(&step))
            .cloned()
            .ok_or_else(|| CwError::invalid_input(format!("聚合分组 {group} 缺少时间步 {step}")))
    }
}
