// crates/cw_network/src/lib.rs

//! Crosswater Network Layer
//!
//! 河网图模型：由扁平的 `(id, next_id)` 表重建上下游连接，
//! 把简化河段网络划分为分区，并导出分区连接和输入集合。
//!
//! # 模块概览
//!
//! - [`network`]: 流域表、河段网络与河段属性
//! - [`connectivity`]: 方向化邻接映射
//! - [`counts`]: 连接数统计
//! - [`closure`]: 上游闭包（广度优先）
//! - [`tributary`]: 支流出口解析
//! - [`partition`]: 分区划分
//! - [`links`]: 分区连接与上游/侧向输入
//! - [`profile`]: 纵剖面参数化与初始条件
//! - [`model`]: 一次性构建的河网模型
//!
//! # 数据流
//!
//! ```text
//! CatchmentTable ─> ConnectionMap ─> UpstreamClosure
//!                                        │
//!                      Tributaries <─────┘
//!                           │
//!                      Partitioner ─> Partition ─> LinkSet
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod closure;
pub mod connectivity;
pub mod counts;
pub mod links;
pub mod model;
pub mod network;
pub mod partition;
pub mod profile;
pub mod tributary;

pub use closure::{UpstreamClosure, UpstreamSet, DEFAULT_MAX_ITERATIONS};
pub use connectivity::{ConnectionMap, Direction};
pub use counts::ConnectionCounts;
pub use links::{CompartmentInputs, CompartmentLink, LinkSet};
pub use model::{ModelOptions, RiverNetwork};
pub use network::{CatchmentTable, NetworkIds, SegmentAttributes, SegmentTable};
pub use partition::{Compartment, DivisionPlan, HeadKind, Partition, Partitioner};
pub use profile::{InitialConditions, ProfileBuilder, ProfilePoint};
pub use tributary::{Tributaries, Tributary};
