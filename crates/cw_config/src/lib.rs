// crates/cw_config/src/lib.rs

//! Crosswater Config Layer
//!
//! 配置层，描述输入表的位置与列名、分区目标、输出与并行参数。
//!
//! # 模块概览
//!
//! - [`routing_config`]: RoutingConfig 路由准备配置
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! Layer 5: cw_cli        ─> uses RoutingConfig
//! Layer 4: cw_io         ─> CSV 读写
//! Layer 3: cw_network, cw_aggregate
//! Layer 2: cw_config     (本层)
//! Layer 1: cw_foundation
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod routing_config;

// 重导出核心类型
pub use error::ConfigError;
pub use routing_config::{
    CatchmentColumns, CatchmentTableConfig, ClosureConfig, OutputConfig, ParallelConfig,
    PartitionConfig, RoutingConfig, SegmentColumns, SegmentTableConfig, StepColumns,
    StepInputConfig,
};
