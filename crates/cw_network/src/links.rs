// crates/cw_network/src/links.rs

//! 分区连接与输入集合
//!
//! 由分区结果和支流出口导出：
//!
//! - 分区之间的有向连接 `L<首河段>`：尾河段下游所在的分区
//! - 每个分区首部汇入的支流（上游输入）与沿程汇入的支流（侧向输入）
//! - 对应的流域 ID 集合，侧向输入同时包含分区自身的河段

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::info;

use cw_foundation::{CatchmentId, CwResult};

use crate::connectivity::{ConnectionMap, Direction};
use crate::network::{CatchmentTable, NetworkIds};
use crate::partition::{Compartment, Partition};
use crate::tributary::{Tributaries, Tributary};

/// 连接名称前缀
pub const LINK_PREFIX: &str = "L";

/// 分区间的有向连接
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompartmentLink {
    /// 连接名称
    pub name: String,
    /// 上游分区
    pub from: String,
    /// 下游分区
    pub to: String,
}

/// 单个分区的输入
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompartmentInputs {
    /// 分区名称
    pub compartment: String,
    /// 在首河段汇入的支流出口
    pub upstream_tributaries: Vec<CatchmentId>,
    /// 沿程汇入的支流出口
    pub lateral_tributaries: Vec<CatchmentId>,
    /// 上游输入流域集合
    pub upstream_input: Vec<CatchmentId>,
    /// 侧向输入流域集合（含分区自身河段）
    pub lateral_input: Vec<CatchmentId>,
}

/// 分区连接与输入
#[derive(Debug, Clone, Default)]
pub struct LinkSet {
    links: Vec<CompartmentLink>,
    inputs: Vec<CompartmentInputs>,
    index: HashMap<String, usize>,
}

impl LinkSet {
    /// 构建连接与输入集合
    pub fn build(
        table: &CatchmentTable,
        network: &NetworkIds,
        partition: &Partition,
        tributaries: &Tributaries,
    ) -> CwResult<Self> {
        let down = ConnectionMap::build(table.edges(), Direction::Downstream, Some(network.as_set()));

        let mut by_inlet: HashMap<&CatchmentId, Vec<&Tributary>> = HashMap::new();
        for trib in tributaries.iter() {
            by_inlet.entry(&trib.inlet).or_default().push(trib);
        }

        let mut links = Vec::new();
        let mut inputs = Vec::with_capacity(partition.len());
        for comp in partition.iter() {
            if let Some(link) = Self::link_of(comp, &down, partition) {
                links.push(link);
            }

            let upstream: Vec<&Tributary> = by_inlet.get(comp.head()).cloned().unwrap_or_default();
            let lateral: Vec<&Tributary> = comp
                .lateral_ids()
                .iter()
                .filter_map(|id| by_inlet.get(id))
                .flatten()
                .copied()
                .collect();

            let upstream_input = union_ids(upstream.iter().map(|t| t.ids.as_slice()));
            let lateral_input = union_ids(
                lateral
                    .iter()
                    .map(|t| t.ids.as_slice())
                    .chain(std::iter::once(comp.ids.as_slice())),
            );

            inputs.push(CompartmentInputs {
                compartment: comp.name.clone(),
                upstream_tributaries: upstream.iter().map(|t| t.outlet.clone()).collect(),
                lateral_tributaries: lateral.iter().map(|t| t.outlet.clone()).collect(),
                upstream_input,
                lateral_input,
            });
        }

        info!("分区连接: {} 条", links.len());
        Ok(Self::from_parts(links, inputs))
    }

    fn from_parts(links: Vec<CompartmentLink>, inputs: Vec<CompartmentInputs>) -> Self {
        let index = inputs
            .iter()
            .enumerate()
            .map(|(i, x)| (x.compartment.clone(), i))
            .collect();
        Self {
            links,
            inputs,
            index,
        }
    }

    fn link_of(comp: &Compartment, down: &ConnectionMap, partition: &Partition) -> Option<CompartmentLink> {
        let next = down.downstream_of(comp.tail())?;
        let to = partition.owner_of(next)?;
        Some(CompartmentLink {
            name: comp.head().prefixed(LINK_PREFIX),
            from: comp.name.clone(),
            to: to.name.clone(),
        })
    }

    /// 分区连接
    #[inline]
    pub fn links(&self) -> &[CompartmentLink] {
        &self.links
    }

    /// 各分区输入（与分区顺序一致）
    #[inline]
    pub fn inputs(&self) -> &[CompartmentInputs] {
        &self.inputs
    }

    /// 按分区名称查询输入
    pub fn input_of(&self, compartment: &str) -> Option<&CompartmentInputs> {
        self.index.get(compartment).map(|&i| &self.inputs[i])
    }

    /// 下游分区名称
    pub fn next_compartment(&self, compartment: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.from == compartment)
            .map(|l| l.to.as_str())
    }

    /// 上游输入成员表 `(流域, 分区)`
    pub fn upstream_membership(&self) -> Vec<(CatchmentId, String)> {
        self.inputs
            .iter()
            .flat_map(|x| x.upstream_input.iter().map(move |id| (id.clone(), x.compartment.clone())))
            .collect()
    }

    /// 侧向输入成员表 `(流域, 分区)`
    pub fn lateral_membership(&self) -> Vec<(CatchmentId, String)> {
        self.inputs
            .iter()
            .flat_map(|x| x.lateral_input.iter().map(move |id| (id.clone(), x.compartment.clone())))
            .collect()
    }
}

/// 合并多个 ID 列表，去重并保持首次出现顺序
fn union_ids<'a, I>(lists: I) -> Vec<CatchmentId>
where
    I: IntoIterator<Item = &'a [CatchmentId]>,
{
    let mut seen: HashSet<&CatchmentId> = HashSet::new();
    let mut out = Vec::new();
    for list in lists {
        for id in list {
            if seen.insert(id) {
                out.push(id.clone());
            }
        }
    }
    out
}
