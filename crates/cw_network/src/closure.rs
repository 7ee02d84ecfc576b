// crates/cw_network/src/closure.rs

//! 上游闭包
//!
//! 从出口出发沿上游邻接映射做广度优先扩展，得到所有最终汇入该出口的流域。
//!
//! # 算法
//!
//! ```text
//! ids      = [outlet]
//! frontier = [outlet]
//! while frontier 非空:
//!     next = frontier 中每个 id 的上游邻居
//!     ids += next
//!     frontier = next
//! ```
//!
//! 合法输入是以终端出口为根的森林，每个 ID 至多访问一次。
//! 再次访问某个 ID 说明存在环（或重复边），返回 `MalformedNetwork`。
//! 前沿扩展次数超过 `max_iterations` 同样视为网络畸形。

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::debug;

use cw_foundation::{CatchmentId, CwError, CwResult};

use crate::connectivity::{ConnectionMap, Direction};

/// 默认最大前沿扩展次数
pub const DEFAULT_MAX_ITERATIONS: usize = 100_000;

/// 单个出口的上游集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamSet {
    /// 出口 ID
    pub outlet: CatchmentId,
    /// 上游 ID（出口在首位，按层序排列）
    pub ids: Vec<CatchmentId>,
}

impl UpstreamSet {
    /// 流域数量（含出口）
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// 是否为空（合法结果至少包含出口本身）
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// 是否包含某 ID
    pub fn contains(&self, id: &CatchmentId) -> bool {
        self.ids.iter().any(|x| x == id)
    }
}

/// 上游闭包计算器
///
/// 持有上游邻接映射的借用，本身不缓存任何结果。
#[derive(Debug, Clone, Copy)]
pub struct UpstreamClosure<'a> {
    up: &'a ConnectionMap,
    max_iterations: usize,
}

impl<'a> UpstreamClosure<'a> {
    /// 创建计算器，映射必须是上游方向
    pub fn new(up: &'a ConnectionMap) -> CwResult<Self> {
        if up.direction() != Direction::Upstream {
            return Err(CwError::configuration(
                "上游闭包需要上游方向的连接映射",
            ));
        }
        Ok(Self {
            up,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        })
    }

    /// 设置最大前沿扩展次数
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// 计算单个出口的上游 ID 列表（出口在首位）
    pub fn upstream_ids(&self, outlet: &CatchmentId) -> CwResult<Vec<CatchmentId>> {
        let mut ids = vec![outlet.clone()];
        let mut visited: HashSet<&CatchmentId> = HashSet::new();
        visited.insert(outlet);

        let mut frontier: Vec<&CatchmentId> = vec![outlet];
        let mut iterations = 0usize;

        while !frontier.is_empty() {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(CwError::malformed_network(format!(
                    "出口 {outlet} 的上游扩展超过 {} 次迭代",
                    self.max_iterations
                )));
            }

            let mut next = Vec::new();
            for id in frontier {
                for up in self.up.neighbors(id) {
                    if !visited.insert(up) {
                        return Err(CwError::malformed_network(format!(
                            "出口 {outlet} 上游重复访问 {up}（存在环或重复边）"
                        )));
                    }
                    next.push(up);
                }
            }
            ids.extend(next.iter().map(|id| (*id).clone()));
            frontier = next;
        }

        debug!(outlet = %outlet, count = ids.len(), iterations, "upstream closure");
        Ok(ids)
    }

    /// 计算单个出口的上游集合
    pub fn upstream_set(&self, outlet: &CatchmentId) -> CwResult<UpstreamSet> {
        Ok(UpstreamSet {
            outlet: outlet.clone(),
            ids: self.upstream_ids(outlet)?,
        })
    }

    /// 批量计算多个出口的上游集合
    ///
    /// 出口之间相互独立，并行计算；结果顺序与输入一致，遇到第一个错误即返回。
    pub fn upstream_dict(&self, outlets: &[CatchmentId]) -> CwResult<Vec<UpstreamSet>> {
        outlets
            .par_iter()
            .map(|outlet| self.upstream_set(outlet))
            .collect()
    }
}
