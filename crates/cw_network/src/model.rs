// crates/cw_network/src/model.rs

//! 河网模型
//!
//! 一次性构建支流出口、分区和分区连接，构建完成后只读。

use tracing::info;

use cw_foundation::CwResult;

use crate::closure::DEFAULT_MAX_ITERATIONS;
use crate::links::LinkSet;
use crate::network::{CatchmentTable, SegmentTable};
use crate::partition::{Compartment, Partition, Partitioner};
use crate::tributary::Tributaries;

/// 河网模型构建参数
#[derive(Debug, Clone, Copy)]
pub struct ModelOptions {
    /// 目标分区数
    pub nr_compartments: usize,
    /// 上游闭包最大前沿扩展次数
    pub max_iterations: usize,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            nr_compartments: 1,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// 河网模型
#[derive(Debug, Clone)]
pub struct RiverNetwork {
    /// 支流出口
    pub tributaries: Tributaries,
    /// 分区
    pub partition: Partition,
    /// 分区连接与输入
    pub links: LinkSet,
}

impl RiverNetwork {
    /// 构建河网模型
    pub fn build(
        catchments: &CatchmentTable,
        segments: &SegmentTable,
        options: ModelOptions,
    ) -> CwResult<Self> {
        info!("=== 构建河网模型 ===");
        let network = segments.network();
        let tributaries = Tributaries::resolve(catchments, network, options.max_iterations)?;
        let partition = Partitioner::new(catchments, network, &tributaries)
            .with_segments(segments)
            .partition(options.nr_compartments)?;
        let links = LinkSet::build(catchments, network, &partition, &tributaries)?;
        Ok(Self {
            tributaries,
            partition,
            links,
        })
    }

    /// 下游分区
    pub fn next_compartment(&self, comp: &Compartment) -> Option<&Compartment> {
        self.links
            .next_compartment(&comp.name)
            .and_then(|name| self.partition.get(name))
    }
}
