// crates/cw_network/src/counts.rs

//! 连接数统计
//!
//! 统计邻接映射中“邻居数量 → 节点数量”的直方图，用于检查网络形态：
//! 上游方向上邻居数 ≥ 2 的节点即为汇流点，数量异常多通常说明输入表有误。

use std::collections::BTreeMap;
use std::fmt;

use crate::connectivity::{ConnectionMap, Direction};

/// 连接数直方图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCounts {
    direction: Direction,
    counts: BTreeMap<usize, usize>,
}

impl ConnectionCounts {
    /// 从邻接映射统计
    pub fn from_map(map: &ConnectionMap) -> Self {
        let mut counts = BTreeMap::new();
        for (_, neighbors) in map.iter() {
            *counts.entry(neighbors.len()).or_insert(0) += 1;
        }
        Self {
            direction: map.direction(),
            counts,
        }
    }

    /// 邻居数量为 `n` 的节点数
    #[inline]
    pub fn nodes_with(&self, n: usize) -> usize {
        self.counts.get(&n).copied().unwrap_or(0)
    }

    /// 节点总数
    pub fn total_nodes(&self) -> usize {
        self.counts.values().sum()
    }

    /// 连接总数
    pub fn total_connections(&self) -> usize {
        self.counts.iter().map(|(n, c)| n * c).sum()
    }

    /// 最大邻居数量
    pub fn max_neighbors(&self) -> usize {
        self.counts.keys().next_back().copied().unwrap_or(0)
    }

    /// 按邻居数量升序迭代 `(邻居数, 节点数)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.counts.iter().map(|(n, c)| (*n, *c))
    }
}

impl fmt::Display for ConnectionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.direction {
            Direction::Upstream => "上游邻居数",
            Direction::Downstream => "下游邻居数",
        };
        writeln!(f, "{:>12} | {:>10}", label, "节点数")?;
        writeln!(f, "{:-<13}+{:-<11}", "", "")?;
        for (n, c) in self.iter() {
            writeln!(f, "{:>12} | {:>10}", n, c)?;
        }
        write!(f, "{:>12} | {:>10}", "合计", self.total_nodes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_foundation::Edge;

    #[test]
    fn test_counts_histogram() {
        let edges = vec![
            Edge::new("a", "c"),
            Edge::new("b", "c"),
            Edge::new("c", "d"),
            Edge::new("d", "-9999"),
        ];
        let up = ConnectionMap::build(&edges, Direction::Upstream, None);
        let counts = ConnectionCounts::from_map(&up);

        assert_eq!(counts.nodes_with(2), 1);
        assert_eq!(counts.nodes_with(1), 2);
        assert_eq!(counts.total_nodes(), 3);
        assert_eq!(counts.total_connections(), 4);
        assert_eq!(counts.max_neighbors(), 2);
    }

    #[test]
    fn test_display_has_total_row() {
        let edges = vec![Edge::new("a", "-9999")];
        let up = ConnectionMap::build(&edges, Direction::Upstream, None);
        let text = ConnectionCounts::from_map(&up).to_string();
        assert!(text.contains("合计"));
        assert!(text.lines().count() >= 3);
    }
}
