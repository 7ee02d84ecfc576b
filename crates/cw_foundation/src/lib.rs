// crates/cw_foundation/src/lib.rs

//! Crosswater Foundation Layer
//!
//! 基础层，提供整个项目共用的标识、错误和验证抽象。
//!
//! # 模块概览
//!
//! - [`id`]: 流域 ID 与连接边
//! - [`error`]: 统一错误类型
//! - [`validation`]: 输入数据验证报告
//! - [`numerics`]: 补偿求和
//!
//! # 示例
//!
//! ```
//! use cw_foundation::{CatchmentId, Edge, CwError, CwResult};
//!
//! fn outlet_of(edges: &[Edge]) -> CwResult<&CatchmentId> {
//!     edges
//!         .iter()
//!         .find(|e| e.is_terminal())
//!         .map(|e| &e.id)
//!         .ok_or_else(|| CwError::malformed_network("no terminal outlet"))
//! }
//!
//! let edges = vec![Edge::new("a", "b"), Edge::new("b", "-9999")];
//! assert_eq!(outlet_of(&edges).unwrap().as_str(), "b");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod numerics;
pub mod validation;

// 重导出常用类型
pub use error::{CwError, CwResult};
pub use id::{CatchmentId, Edge, TERMINAL_ID};
pub use numerics::KahanSum;

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{CwError, CwResult};
    pub use crate::id::{CatchmentId, Edge, TERMINAL_ID};
    pub use crate::numerics::KahanSum;
    pub use crate::validation::{ValidationError, ValidationReport, ValidationWarning};
    pub use crate::{ensure, require};
}
