// crates/cw_io/src/lib.rs

//! Crosswater IO Layer
//!
//! CSV 读取与导出。
//!
//! # 模块概览
//!
//! - [`tables`]: 流域表与河段表读取
//! - [`store`]: 时间步源数据目录与聚合结果目录
//! - [`export`]: 连接表、分区表、成员表、单元时间序列、参数化与初始条件导出
//! - [`error`]: CSV 与文件系统错误映射

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod export;
mod reader;
pub mod store;
pub mod tables;

pub use export::{
    write_compartments, write_initial_conditions, write_links, write_membership,
    write_parameterization, write_rows, write_unit_series,
};
pub use store::{step_file_name, CsvAggregateStore, CsvStepStore};
pub use tables::{read_catchments, read_segments};
