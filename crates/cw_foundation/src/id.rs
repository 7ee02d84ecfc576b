// crates/cw_foundation/src/id.rs

//! 流域标识与连接边
//!
//! 流域 ID 在数据源中可能是整数也可能是字符串，这里统一存为字符串，
//! 整数 ID 通过 `From<i64>` 转换，保证在所有表之间比较一致。
//!
//! # 示例
//!
//! ```
//! use cw_foundation::id::{CatchmentId, Edge};
//!
//! let a = CatchmentId::from(101);
//! let e = Edge::new(a.clone(), CatchmentId::terminal());
//! assert!(e.is_terminal());
//! assert_eq!(a.as_str(), "101");
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// 终端出口哨兵值（无下游邻居）
pub const TERMINAL_ID: &str = "-9999";

/// 流域 ID
///
/// 在一个数据集中唯一，在所有表之间稳定。
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatchmentId(String);

impl CatchmentId {
    /// 创建新 ID，去除首尾空白
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    /// 终端哨兵 ID
    pub fn terminal() -> Self {
        Self(TERMINAL_ID.to_string())
    }

    /// 是否为终端哨兵
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.0 == TERMINAL_ID
    }

    /// 字符串视图
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 带前缀的名称（分区 "C"、连接 "L"）
    pub fn prefixed(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }
}

impl fmt::Debug for CatchmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for CatchmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CatchmentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CatchmentId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<i64> for CatchmentId {
    fn from(v: i64) -> Self {
        Self(v.to_string())
    }
}

impl From<i32> for CatchmentId {
    fn from(v: i32) -> Self {
        Self(v.to_string())
    }
}

impl Borrow<str> for CatchmentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CatchmentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 连接边：`id` 直接汇入 `next_id`
///
/// `next_id` 为 [`TERMINAL_ID`] 时表示终端出口。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// 上游流域
    pub id: CatchmentId,
    /// 直接下游流域
    pub next_id: CatchmentId,
}

impl Edge {
    /// 创建连接边
    pub fn new(id: impl Into<CatchmentId>, next_id: impl Into<CatchmentId>) -> Self {
        Self {
            id: id.into(),
            next_id: next_id.into(),
        }
    }

    /// 是否汇入终端出口
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.next_id.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_integer_and_string_ids_compare_equal() {
        assert_eq!(CatchmentId::from(42_i64), CatchmentId::from("42"));
        assert_eq!(CatchmentId::from(" 42 "), CatchmentId::from("42"));
    }

    #[test]
    fn test_terminal() {
        assert!(CatchmentId::from(-9999).is_terminal());
        assert!(!CatchmentId::from("9999").is_terminal());
    }

    #[test]
    fn test_prefixed() {
        assert_eq!(CatchmentId::from("17").prefixed("C"), "C17");
    }

    #[test]
    fn test_borrow_lookup() {
        let mut set = HashSet::new();
        set.insert(CatchmentId::from("a"));
        assert!(set.contains("a"));
    }

    #[test]
    fn test_serde_transparent() {
        let id = CatchmentId::from("abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");
        let back: CatchmentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
