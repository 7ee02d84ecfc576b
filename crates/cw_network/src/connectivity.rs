// crates/cw_network/src/connectivity.rs

//! 连接映射
//!
//! 把 `(id, next_id)` 连接边转换为邻接映射：
//!
//! - 上游方向：键为 `next_id`，值为直接汇入它的所有 `id`
//! - 下游方向：键为 `id`，值为其直接下游（通常只有一个）
//!
//! 可选的活动集合只过滤**键**，值保持不变。值的顺序与连接边的输入顺序一致。
//!
//! # 示例
//!
//! ```
//! use cw_foundation::Edge;
//! use cw_network::connectivity::{ConnectionMap, Direction};
//!
//! let edges = vec![Edge::new("a", "c"), Edge::new("b", "c"), Edge::new("c", "-9999")];
//! let up = ConnectionMap::build(&edges, Direction::Upstream, None);
//! let names: Vec<&str> = up.neighbors(&"c".into()).iter().map(|id| id.as_str()).collect();
//! assert_eq!(names, ["a", "b"]);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use cw_foundation::{CatchmentId, CwError, Edge};

/// 连接方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// 上游：下游 ID → 汇入它的 ID 列表
    Upstream,
    /// 下游：ID → 下游 ID
    Downstream,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream => f.write_str("up"),
            Self::Downstream => f.write_str("down"),
        }
    }
}

impl FromStr for Direction {
    type Err = CwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "upstream" => Ok(Self::Upstream),
            "down" | "downstream" => Ok(Self::Downstream),
            other => Err(CwError::configuration(format!(
                "未知连接方向 '{other}'，应为 'up' 或 'down'"
            ))),
        }
    }
}

/// 邻接映射
///
/// 保留键的首次出现顺序，使得基于它的遍历结果可复现。
#[derive(Debug, Clone)]
pub struct ConnectionMap {
    direction: Direction,
    keys: Vec<CatchmentId>,
    map: HashMap<CatchmentId, Vec<CatchmentId>>,
}

impl ConnectionMap {
    /// 构建邻接映射
    ///
    /// `active` 非空时，只保留键在集合中的条目。
    pub fn build(edges: &[Edge], direction: Direction, active: Option<&HashSet<CatchmentId>>) -> Self {
        let mut keys = Vec::new();
        let mut map: HashMap<CatchmentId, Vec<CatchmentId>> = HashMap::new();

        for edge in edges {
            let (key, value) = match direction {
                Direction::Upstream => (&edge.next_id, &edge.id),
                Direction::Downstream => (&edge.id, &edge.next_id),
            };
            if let Some(active) = active {
                if !active.contains(key) {
                    continue;
                }
            }
            match map.get_mut(key) {
                Some(values) => values.push(value.clone()),
                None => {
                    keys.push(key.clone());
                    map.insert(key.clone(), vec![value.clone()]);
                }
            }
        }

        Self {
            direction,
            keys,
            map,
        }
    }

    /// 连接方向
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// 查询邻居，键不存在时返回 None
    #[inline]
    pub fn get(&self, id: &CatchmentId) -> Option<&[CatchmentId]> {
        self.map.get(id).map(Vec::as_slice)
    }

    /// 查询邻居，键不存在时返回空切片
    #[inline]
    pub fn neighbors(&self, id: &CatchmentId) -> &[CatchmentId] {
        self.get(id).unwrap_or(&[])
    }

    /// 直接下游（下游方向映射中的第一个值）
    #[inline]
    pub fn downstream_of(&self, id: &CatchmentId) -> Option<&CatchmentId> {
        self.get(id).and_then(|v| v.first())
    }

    /// 是否包含键
    #[inline]
    pub fn contains_key(&self, id: &CatchmentId) -> bool {
        self.map.contains_key(id)
    }

    /// 按首次出现顺序迭代键
    pub fn keys(&self) -> impl Iterator<Item = &CatchmentId> + '_ {
        self.keys.iter()
    }

    /// 按键顺序迭代 `(键, 邻居)`
    pub fn iter(&self) -> impl Iterator<Item = (&CatchmentId, &[CatchmentId])> + '_ {
        self.keys.iter().map(move |k| (k, self.neighbors(k)))
    }

    /// 键数量
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[CatchmentId]) -> Vec<&str> {
        v.iter().map(CatchmentId::as_str).collect()
    }

    fn sample() -> Vec<Edge> {
        vec![
            Edge::new("a", "c"),
            Edge::new("b", "c"),
            Edge::new("c", "e"),
            Edge::new("d", "e"),
            Edge::new("e", "-9999"),
        ]
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("up".parse::<Direction>().unwrap(), Direction::Upstream);
        assert_eq!(" Down ".parse::<Direction>().unwrap(), Direction::Downstream);
        let err = "sideways".parse::<Direction>().unwrap_err();
        assert!(matches!(err, CwError::Configuration { .. }));
    }

    #[test]
    fn test_upstream_map() {
        let up = ConnectionMap::build(&sample(), Direction::Upstream, None);
        assert_eq!(ids(up.neighbors(&"e".into())), ["c", "d"]);
        assert_eq!(ids(up.neighbors(&"-9999".into())), ["e"]);
        assert!(up.get(&"a".into()).is_none());
        let keys: Vec<&str> = up.keys().map(CatchmentId::as_str).collect();
        assert_eq!(keys, ["c", "e", "-9999"]);
    }

    #[test]
    fn test_downstream_map() {
        let down = ConnectionMap::build(&sample(), Direction::Downstream, None);
        assert_eq!(down.downstream_of(&"a".into()).unwrap().as_str(), "c");
        assert_eq!(down.len(), 5);
    }

    #[test]
    fn test_active_filters_keys_only() {
        let active: HashSet<CatchmentId> = ["c".into(), "e".into()].into_iter().collect();
        let up = ConnectionMap::build(&sample(), Direction::Upstream, Some(&active));
        assert_eq!(up.len(), 2);
        // 值中的 a、b、d 不在活动集合中，但仍保留
        assert_eq!(ids(up.neighbors(&"c".into())), ["a", "b"]);
        assert_eq!(ids(up.neighbors(&"e".into())), ["c", "d"]);
        assert!(!up.contains_key(&"-9999".into()));
    }

    #[test]
    fn test_empty_edges() {
        let up = ConnectionMap::build(&[], Direction::Upstream, None);
        assert!(up.is_empty());
        assert!(up.neighbors(&"x".into()).is_empty());
    }
}
