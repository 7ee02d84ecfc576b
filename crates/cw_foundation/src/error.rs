// crates/cw_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `CwError` 枚举和 `CwResult` 类型别名，用于整个项目的错误处理。
//!
//! # 错误分级
//!
//! - **致命**: `Configuration`、`MalformedNetwork`、`PartitionInvariant`、
//!   `DataCompleteness`、`DuplicateAggregation`、`InvalidValue`，直接中止运行
//! - **可恢复**: 缺失面积、缺失河段长度、分区数量钳制等，只记录警告，不构造错误
//!
//! # 示例
//!
//! ```
//! use cw_foundation::error::{CwError, CwResult};
//!
//! fn parse_direction(s: &str) -> CwResult<()> {
//!     Err(CwError::configuration(format!("unsupported direction '{s}'")))
//! }
//! assert!(parse_direction("sideways").is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type CwResult<T> = Result<T, CwError>;

/// Crosswater 错误类型
#[derive(Error, Debug)]
pub enum CwError {
    // ========================================================================
    // 配置错误（在任何图计算开始之前中止）
    // ========================================================================

    /// 配置错误（方向字符串无效、分区数量无效等）
    #[error("配置错误: {message}")]
    Configuration {
        /// 具体错误信息
        message: String,
    },

    // ========================================================================
    // 网络拓扑错误
    // ========================================================================

    /// 河网拓扑无效（环路、缺失连接、超出迭代上限）
    #[error("河网拓扑无效: {message}")]
    MalformedNetwork {
        /// 具体错误信息
        message: String,
    },

    /// 分区不变量被破坏（分区并集与河段集合不一致）
    #[error("分区不变量被破坏: {message} (缺失 {missing} 个, 重复 {duplicated} 个)")]
    PartitionInvariant {
        /// 具体错误信息
        message: String,
        /// 未被任何分区覆盖的河段数
        missing: usize,
        /// 出现在多个分区中的河段数
        duplicated: usize,
    },

    // ========================================================================
    // 数据错误
    // ========================================================================

    /// 时间步数据不完整（出口缺失）
    #[error("数据不完整: 时间步 {step} 缺少流域 {id} ({context})")]
    DataCompleteness {
        /// 时间步索引
        step: usize,
        /// 缺失的流域 ID
        id: String,
        /// 所在聚合单元
        context: String,
    },

    /// 同一时间步同一单元存在多行聚合结果
    #[error("重复聚合: 时间步 {step} 单元 {unit} 出现 {count} 行")]
    DuplicateAggregation {
        /// 时间步索引
        step: usize,
        /// 单元名称
        unit: String,
        /// 出现行数
        count: usize,
    },

    /// 数值无效（负值或非有限值）
    #[error("数值无效: {field}={value} (流域 {id}), {reason}")]
    InvalidValue {
        /// 字段名
        field: &'static str,
        /// 流域 ID
        id: String,
        /// 实际值
        value: f64,
        /// 原因说明
        reason: &'static str,
    },

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    // ========================================================================
    // IO 相关错误
    // ========================================================================

    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 文件解析错误
    #[error("文件解析错误: {file} 第{line}行: {message}")]
    Parse {
        /// 文件路径
        file: PathBuf,
        /// 行号
        line: usize,
        /// 错误信息
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl CwError {
    /// 配置错误
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// 河网拓扑无效
    pub fn malformed_network(message: impl Into<String>) -> Self {
        Self::MalformedNetwork {
            message: message.into(),
        }
    }

    /// 分区不变量被破坏
    pub fn partition_invariant(message: impl Into<String>, missing: usize, duplicated: usize) -> Self {
        Self::PartitionInvariant {
            message: message.into(),
            missing,
            duplicated,
        }
    }

    /// 时间步数据不完整
    pub fn data_completeness(step: usize, id: impl Into<String>, context: impl Into<String>) -> Self {
        Self::DataCompleteness {
            step,
            id: id.into(),
            context: context.into(),
        }
    }

    /// 重复聚合
    pub fn duplicate_aggregation(step: usize, unit: impl Into<String>, count: usize) -> Self {
        Self::DuplicateAggregation {
            step,
            unit: unit.into(),
            count,
        }
    }

    /// 数值无效
    pub fn invalid_value(
        field: &'static str,
        id: impl Into<String>,
        value: f64,
        reason: &'static str,
    ) -> Self {
        Self::InvalidValue {
            field,
            id: id.into(),
            value,
            reason,
        }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// IO 错误
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// IO 错误（带源）
    pub fn io_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 解析错误
    pub fn parse(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl CwError {
    /// 检查数值有限且非负
    #[inline]
    pub fn check_non_negative(field: &'static str, id: &str, value: f64) -> CwResult<()> {
        if !value.is_finite() {
            Err(Self::invalid_value(field, id, value, "必须为有限值"))
        } else if value < 0.0 {
            Err(Self::invalid_value(field, id, value, "不能为负"))
        } else {
            Ok(())
        }
    }

    /// 检查数值有限且严格为正
    #[inline]
    pub fn check_positive(field: &'static str, id: &str, value: f64) -> CwResult<()> {
        if !value.is_finite() {
            Err(Self::invalid_value(field, id, value, "必须为有限值"))
        } else if value <= 0.0 {
            Err(Self::invalid_value(field, id, value, "必须为正"))
        } else {
            Ok(())
        }
    }
}

// ========================================================================
// 宏
// ========================================================================

/// 条件不满足时返回错误
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

/// 解包 Option，为 None 时返回错误
#[macro_export]
macro_rules! require {
    ($opt:expr, $err:expr) => {
        match $opt {
            Some(v) => v,
            None => return Err($err.into()),
        }
    };
}

// ========================================================================
// 标准库错误转换
// ========================================================================

impl From<std::io::Error> for CwError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}
