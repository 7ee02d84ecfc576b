// crates/cw_network/src/partition.rs

//! 河段分区
//!
//! 把简化河段网络划分为连续的“分区”（compartment）：每个分区是从一个首河段
//! 向下游延伸、内部不含汇流点的一段河段序列。
//!
//! # 首河段选取
//!
//! 1. 汇流点：网络内直接上游邻居 ≥ 2 的河段
//! 2. 源头：网络内没有上游邻居的河段
//! 3. 自然分区数为 `2 × 汇流点数 + 1`，目标分区数超出部分 `nr_div`
//!    由面积最大的支流入口补足（入口已是首河段的跳过）
//!
//! 目标分区数小于自然分区数时降级：发出警告，按自然分区数处理。
//!
//! # 示例
//!
//! ```
//! use cw_foundation::Edge;
//! use cw_network::network::{CatchmentTable, NetworkIds};
//! use cw_network::partition::Partitioner;
//! use cw_network::tributary::Tributaries;
//!
//! let edges = vec![
//!     Edge::new("a", "c"),
//!     Edge::new("b", "c"),
//!     Edge::new("c", "d"),
//!     Edge::new("d", "-9999"),
//! ];
//! let table = CatchmentTable::new(edges);
//! let network = NetworkIds::new(["a", "b", "c", "d"]).unwrap();
//! let tribs = Tributaries::resolve(&table, &network, 100).unwrap();
//!
//! let partition = Partitioner::new(&table, &network, &tribs).partition(3).unwrap();
//! assert_eq!(partition.len(), 3);
//! assert_eq!(partition.get("Cc").unwrap().ids.len(), 2);
//! ```

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use cw_foundation::{CatchmentId, CwError, CwResult, KahanSum};

use crate::connectivity::{ConnectionMap, Direction};
use crate::network::{CatchmentTable, NetworkIds, SegmentTable};
use crate::tributary::Tributaries;

/// 分区名称前缀
pub const COMPARTMENT_PREFIX: &str = "C";

/// 首河段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadKind {
    /// 汇流点
    Junction,
    /// 源头
    Headwater,
    /// 大支流入口
    TributaryInlet,
}

/// 分区
#[derive(Debug, Clone, PartialEq)]
pub struct Compartment {
    /// 名称（`"C" + 首河段 ID`）
    pub name: String,
    /// 首河段类型
    pub kind: HeadKind,
    /// 河段序列（首河段在前，自上游向下游）
    pub ids: Vec<CatchmentId>,
    /// 河段长度之和（无河段长度时为 None）
    pub length: Option<f64>,
}

impl Compartment {
    /// 首河段
    #[inline]
    pub fn head(&self) -> &CatchmentId {
        &self.ids[0]
    }

    /// 尾河段
    #[inline]
    pub fn tail(&self) -> &CatchmentId {
        &self.ids[self.ids.len() - 1]
    }

    /// 首河段之后的河段
    #[inline]
    pub fn lateral_ids(&self) -> &[CatchmentId] {
        &self.ids[1..]
    }
}

/// 分区数规划
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DivisionPlan {
    /// 请求的目标分区数
    pub requested: usize,
    /// 实际采用的目标分区数
    pub effective: usize,
    /// 额外拆分数
    pub nr_div: usize,
    /// 是否发生降级
    pub clamped: bool,
}

impl DivisionPlan {
    /// 按汇流点数计算拆分数
    pub fn new(requested: usize, junctions: usize) -> Self {
        let natural = 2 * junctions + 1;
        if requested < natural {
            Self {
                requested,
                effective: natural,
                nr_div: 0,
                clamped: true,
            }
        } else {
            Self {
                requested,
                effective: requested,
                nr_div: requested - natural,
                clamped: false,
            }
        }
    }
}

/// 网络内汇流点（保持网络顺序）
pub fn find_junctions(up_network: &ConnectionMap, network: &NetworkIds) -> Vec<CatchmentId> {
    network
        .iter()
        .filter(|id| network_upstream_count(up_network, network, id) >= 2)
        .cloned()
        .collect()
}

/// 网络内源头（保持网络顺序）
pub fn find_headwaters(up_network: &ConnectionMap, network: &NetworkIds) -> Vec<CatchmentId> {
    network
        .iter()
        .filter(|id| network_upstream_count(up_network, network, id) == 0)
        .cloned()
        .collect()
}

fn network_upstream_count(up_network: &ConnectionMap, network: &NetworkIds, id: &CatchmentId) -> usize {
    up_network
        .neighbors(id)
        .iter()
        .filter(|up| network.contains(up))
        .count()
}

/// 分区结果
#[derive(Debug, Clone, Default)]
pub struct Partition {
    compartments: Vec<Compartment>,
    owner: HashMap<CatchmentId, usize>,
    names: HashMap<String, usize>,
    junctions: Vec<CatchmentId>,
    headwaters: Vec<CatchmentId>,
    inlets: Vec<CatchmentId>,
    plan: Option<DivisionPlan>,
}

impl Partition {
    /// 分区（按首河段在网络中的顺序）
    #[inline]
    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    /// 按名称查询
    pub fn get(&self, name: &str) -> Option<&Compartment> {
        self.names.get(name).map(|&i| &self.compartments[i])
    }

    /// 河段所属分区
    pub fn owner_of(&self, id: &CatchmentId) -> Option<&Compartment> {
        self.owner.get(id).map(|&i| &self.compartments[i])
    }

    /// 汇流点
    pub fn junctions(&self) -> &[CatchmentId] {
        &self.junctions
    }

    /// 源头
    pub fn headwaters(&self) -> &[CatchmentId] {
        &self.headwaters
    }

    /// 被选中的支流入口
    pub fn inlets(&self) -> &[CatchmentId] {
        &self.inlets
    }

    /// 分区数规划
    pub fn plan(&self) -> Option<DivisionPlan> {
        self.plan
    }

    /// `名称 → 河段序列` 映射
    pub fn to_map(&self) -> HashMap<String, Vec<CatchmentId>> {
        self.compartments
            .iter()
            .map(|c| (c.name.clone(), c.ids.clone()))
            .collect()
    }

    /// 迭代分区
    pub fn iter(&self) -> std::slice::Iter<'_, Compartment> {
        self.compartments.iter()
    }

    /// 分区数量
    #[inline]
    pub fn len(&self) -> usize {
        self.compartments.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
    }
}

/// 分区构建器
pub struct Partitioner<'a> {
    table: &'a CatchmentTable,
    network: &'a NetworkIds,
    tributaries: &'a Tributaries,
    segments: Option<&'a SegmentTable>,
}

impl<'a> Partitioner<'a> {
    /// 创建分区构建器
    pub fn new(table: &'a CatchmentTable, network: &'a NetworkIds, tributaries: &'a Tributaries) -> Self {
        Self {
            table,
            network,
            tributaries,
            segments: None,
        }
    }

    /// 提供河段长度，用于计算分区长度
    pub fn with_segments(mut self, segments: &'a SegmentTable) -> Self {
        self.segments = Some(segments);
        self
    }

    /// 执行分区
    pub fn partition(&self, nr_target: usize) -> CwResult<Partition> {
        if nr_target == 0 {
            return Err(CwError::configuration("目标分区数必须至少为 1"));
        }
        let network = self.network;
        if network.is_empty() {
            return Ok(Partition::default());
        }

        let active = network.as_set();
        let up = ConnectionMap::build(self.table.edges(), Direction::Upstream, Some(active));
        let down = ConnectionMap::build(self.table.edges(), Direction::Downstream, Some(active));

        let junctions = find_junctions(&up, network);
        let headwaters = find_headwaters(&up, network);

        let plan = DivisionPlan::new(nr_target, junctions.len());
        if plan.clamped {
            warn!(
                requested = plan.requested,
                junctions = junctions.len(),
                "目标分区数小于自然分区数，按 {} 处理",
                plan.effective
            );
        }

        let mut kinds: HashMap<&CatchmentId, HeadKind> = HashMap::new();
        for id in &junctions {
            kinds.insert(id, HeadKind::Junction);
        }
        for id in &headwaters {
            kinds.insert(id, HeadKind::Headwater);
        }

        // 只取面积最大的 nr_div 条支流，入口已是首河段时不再顺延补选
        let mut inlets = Vec::new();
        for trib in self.tributaries.ranked_by_area().into_iter().take(plan.nr_div) {
            if !network.contains(&trib.inlet) {
                continue;
            }
            if kinds.contains_key(&trib.inlet) {
                debug!(outlet = %trib.outlet, inlet = %trib.inlet, "支流入口已是首河段");
                continue;
            }
            kinds.insert(&trib.inlet, HeadKind::TributaryInlet);
            inlets.push(trib.inlet.clone());
        }
        if inlets.len() < plan.nr_div {
            warn!(
                requested = plan.nr_div,
                selected = inlets.len(),
                "部分支流入口与已有首河段重合，分区数少于目标"
            );
        }

        let heads: HashSet<&CatchmentId> = kinds.keys().copied().collect();
        let mut compartments = Vec::with_capacity(heads.len());
        for head in network.iter().filter(|id| heads.contains(id)) {
            let ids = self.walk_downstream(head, &down, &heads)?;
            compartments.push(Compartment {
                name: head.prefixed(COMPARTMENT_PREFIX),
                kind: kinds[head],
                length: self.compartment_length(&ids),
                ids,
            });
        }

        let partition = Self::assemble(compartments, network, junctions, headwaters, inlets, plan)?;
        info!(
            "分区完成: {} 个分区, {} 个汇流点, {} 个源头, {} 个支流入口",
            partition.len(),
            partition.junctions.len(),
            partition.headwaters.len(),
            partition.inlets.len()
        );
        Ok(partition)
    }

    /// 从首河段向下游行走，直到下一个首河段、终端出口或离开网络
    fn walk_downstream(
        &self,
        head: &CatchmentId,
        down: &ConnectionMap,
        heads: &HashSet<&CatchmentId>,
    ) -> CwResult<Vec<CatchmentId>> {
        let mut ids = vec![head.clone()];
        let mut current = head;
        loop {
            let next = down.downstream_of(current).ok_or_else(|| {
                CwError::malformed_network(format!("河段 {current} 不在流域表中"))
            })?;
            if !self.network.contains(next) || heads.contains(next) {
                break;
            }
            if ids.len() >= self.network.len() {
                return Err(CwError::malformed_network(format!(
                    "自首河段 {head} 向下游行走未终止（存在环）"
                )));
            }
            ids.push(next.clone());
            current = next;
        }
        Ok(ids)
    }

    fn compartment_length(&self, ids: &[CatchmentId]) -> Option<f64> {
        let segments = self.segments?;
        let mut sum = KahanSum::new();
        for id in ids {
            match segments.length(id) {
                Some(l) => sum.add(l),
                None => warn!(segment = %id, "河段缺少长度，分区长度中跳过"),
            }
        }
        Some(sum.value())
    }

    /// 组装结果并检查每个河段恰好属于一个分区
    fn assemble(
        compartments: Vec<Compartment>,
        network: &NetworkIds,
        junctions: Vec<CatchmentId>,
        headwaters: Vec<CatchmentId>,
        inlets: Vec<CatchmentId>,
        plan: DivisionPlan,
    ) -> CwResult<Partition> {
        let mut owner = HashMap::with_capacity(network.len());
        let mut duplicated = 0usize;
        for (i, comp) in compartments.iter().enumerate() {
            for id in &comp.ids {
                if owner.insert(id.clone(), i).is_some() {
                    duplicated += 1;
                }
            }
        }
        let missing = network.iter().filter(|id| !owner.contains_key(*id)).count();
        if missing > 0 || duplicated > 0 {
            return Err(CwError::partition_invariant(
                "分区并集与河段网络不一致",
                missing,
                duplicated,
            ));
        }

        let names = compartments
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        Ok(Partition {
            compartments,
            owner,
            names,
            junctions,
            headwaters,
            inlets,
            plan: Some(plan),
        })
    }
}
