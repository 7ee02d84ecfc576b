// crates/cw_config/src/error.rs

//! 配置层错误类型

use cw_foundation::CwError;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },

    /// 缺失配置
    #[error("缺失配置: {0}")]
    Missing(String),
}

impl ConfigError {
    /// 无效值
    pub fn invalid(key: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for CwError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => CwError::io_with_source("读取配置文件失败", e),
            other => CwError::configuration(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("partition.nr_compartments", 0, "必须至少为 1");
        assert!(err.to_string().contains("nr_compartments"));
    }

    #[test]
    fn test_into_configuration_error() {
        let err: CwError = ConfigError::Missing("steps.directory".into()).into();
        assert!(matches!(err, CwError::Configuration { .. }));
    }
}
