// crates/cw_network/src/tributary.rs

//! 支流出口解析
//!
//! 支流出口是紧邻简化河段网络、直接汇入网络的非网络流域。
//! 对每个支流出口计算其完整上游闭包和总汇水面积。

use std::collections::HashMap;

use tracing::{info, warn};

use cw_foundation::{CatchmentId, CwResult, KahanSum};

use crate::closure::UpstreamClosure;
use crate::connectivity::{ConnectionMap, Direction};
use crate::network::{CatchmentTable, NetworkIds};

/// 支流出口
#[derive(Debug, Clone, PartialEq)]
pub struct Tributary {
    /// 出口流域 ID（不在网络中）
    pub outlet: CatchmentId,
    /// 出口汇入的网络河段（入口）
    pub inlet: CatchmentId,
    /// 上游闭包（出口在首位）
    pub ids: Vec<CatchmentId>,
    /// 总汇水面积（缺少面积的流域不计入）
    pub area: f64,
}

/// 找出所有支流出口
///
/// `up_network` 是以网络 ID 为活动集合构建的上游映射。
/// 返回 `(出口, 入口)`，按网络 ID 顺序、再按连接边顺序排列。
pub fn tributary_outlets(
    up_network: &ConnectionMap,
    network: &NetworkIds,
) -> Vec<(CatchmentId, CatchmentId)> {
    let mut outlets = Vec::new();
    for inlet in network {
        for id in up_network.neighbors(inlet) {
            if !network.contains(id) {
                outlets.push((id.clone(), inlet.clone()));
            }
        }
    }
    outlets
}

/// 已解析的支流出口集合
#[derive(Debug, Clone, Default)]
pub struct Tributaries {
    items: Vec<Tributary>,
    index: HashMap<CatchmentId, usize>,
}

impl Tributaries {
    /// 解析支流出口、上游闭包和面积
    pub fn resolve(
        table: &CatchmentTable,
        network: &NetworkIds,
        max_iterations: usize,
    ) -> CwResult<Self> {
        let up_full = ConnectionMap::build(table.edges(), Direction::Upstream, None);
        let up_network =
            ConnectionMap::build(table.edges(), Direction::Upstream, Some(network.as_set()));

        let pairs = tributary_outlets(&up_network, network);
        let outlets: Vec<CatchmentId> = pairs.iter().map(|(o, _)| o.clone()).collect();

        let closure = UpstreamClosure::new(&up_full)?.with_max_iterations(max_iterations);
        let sets = closure.upstream_dict(&outlets)?;

        let mut items = Vec::with_capacity(pairs.len());
        for ((outlet, inlet), set) in pairs.into_iter().zip(sets) {
            let mut area = KahanSum::new();
            let mut missing = 0usize;
            for id in &set.ids {
                match table.area(id) {
                    Some(a) => area.add(a),
                    None => missing += 1,
                }
            }
            if missing > 0 {
                warn!(outlet = %outlet, missing, "支流上游部分流域缺少面积，已跳过");
            }
            items.push(Tributary {
                outlet,
                inlet,
                ids: set.ids,
                area: area.value(),
            });
        }

        info!("解析支流出口: {} 个", items.len());
        Ok(Self::from_items(items))
    }

    /// 由已有条目创建
    pub fn from_items(items: Vec<Tributary>) -> Self {
        let index = items
            .iter()
            .enumerate()
            .map(|(i, t)| (t.outlet.clone(), i))
            .collect();
        Self { items, index }
    }

    /// 按出口查询
    pub fn get(&self, outlet: &CatchmentId) -> Option<&Tributary> {
        self.index.get(outlet).map(|&i| &self.items[i])
    }

    /// 按发现顺序迭代
    pub fn iter(&self) -> std::slice::Iter<'_, Tributary> {
        self.items.iter()
    }

    /// 出口 ID 列表
    pub fn outlets(&self) -> Vec<CatchmentId> {
        self.items.iter().map(|t| t.outlet.clone()).collect()
    }

    /// 按面积降序排列（面积相同时保持发现顺序）
    pub fn ranked_by_area(&self) -> Vec<&Tributary> {
        let mut ranked: Vec<&Tributary> = self.items.iter().collect();
        ranked.sort_by(|a, b| b.area.total_cmp(&a.area));
        ranked
    }

    /// 出口数量
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_foundation::Edge;

    // 网络: n1 -> n2 -> -9999
    // 支流: t1 -> n1, t2 -> n2, u -> t2
    fn fixture() -> (CatchmentTable, NetworkIds) {
        let edges = vec![
            Edge::new("n1", "n2"),
            Edge::new("n2", "-9999"),
            Edge::new("t1", "n1"),
            Edge::new("t2", "n2"),
            Edge::new("u", "t2"),
        ];
        let areas = HashMap::from([
            ("t1".into(), 3.0),
            ("t2".into(), 1.0),
            ("u".into(), 4.0),
        ]);
        let table = CatchmentTable::with_areas(edges, areas).unwrap();
        let network = NetworkIds::new(["n1", "n2"]).unwrap();
        (table, network)
    }

    #[test]
    fn test_resolve_outlets_and_areas() {
        let (table, network) = fixture();
        let tribs = Tributaries::resolve(&table, &network, 100).unwrap();

        assert_eq!(tribs.len(), 2);
        let t2 = tribs.get(&"t2".into()).unwrap();
        assert_eq!(t2.inlet.as_str(), "n2");
        assert_eq!(t2.ids.len(), 2);
        assert!((t2.area - 5.0).abs() < 1e-12);

        for t in tribs.iter() {
            assert!(!network.contains(&t.outlet));
        }
    }

    #[test]
    fn test_ranked_by_area_stable() {
        let items = ["a", "b", "c"]
            .iter()
            .zip([1.0, 2.0, 1.0])
            .map(|(id, area)| Tributary {
                outlet: (*id).into(),
                inlet: "n".into(),
                ids: vec![(*id).into()],
                area,
            })
            .collect();
        let tribs = Tributaries::from_items(items);
        let ranked: Vec<&str> = tribs.ranked_by_area().iter().map(|t| t.outlet.as_str()).collect();
        assert_eq!(ranked, ["b", "a", "c"]);
    }

    #[test]
    fn test_missing_area_skipped() {
        let edges = vec![Edge::new("n", "-9999"), Edge::new("t", "n")];
        let table = CatchmentTable::new(edges);
        let network = NetworkIds::new(["n"]).unwrap();
        let tribs = Tributaries::resolve(&table, &network, 100).unwrap();
        assert_eq!(tribs.get(&"t".into()).unwrap().area, 0.0);
    }
}
