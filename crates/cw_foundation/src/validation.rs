// crates/cw_foundation/src/validation.rs

//! 输入表检查报告
//!
//! 流域表、河段表和时间步目录的问题按发现顺序收集，`validate` 命令一次性输出，
//! 不在第一个问题处中止。错误使报告失败，警告只提示。
//!
//! ```
//! use cw_foundation::validation::{ValidationReport, ValidationError};
//!
//! let mut report = ValidationReport::new();
//! report.add_error(ValidationError::DuplicateId { id: "12".into() });
//! assert!(!report.is_valid());
//! ```

use std::fmt;

/// 一条检查结果
#[derive(Debug, Clone)]
pub enum Issue {
    /// 错误
    Error(ValidationError),
    /// 警告
    Warning(ValidationWarning),
}

/// 检查报告（保持发现顺序）
#[derive(Debug, Default)]
pub struct ValidationReport {
    issues: Vec<Issue>,
}

impl ValidationReport {
    /// 空报告
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录错误
    pub fn add_error(&mut self, error: ValidationError) {
        self.issues.push(Issue::Error(error));
    }

    /// 记录警告
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.issues.push(Issue::Warning(warning));
    }

    /// 数值必须有限且为正，否则记录 [`ValidationError::InvalidValue`]
    pub fn require_positive(&mut self, field: &'static str, id: &str, value: f64) -> bool {
        let ok = value.is_finite() && value > 0.0;
        if !ok {
            self.add_error(ValidationError::InvalidValue {
                field,
                id: id.to_string(),
                value,
            });
        }
        ok
    }

    /// 追加另一份报告
    pub fn merge(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    /// 全部结果
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// 错误
    pub fn errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.issues.iter().filter_map(|i| match i {
            Issue::Error(e) => Some(e),
            Issue::Warning(_) => None,
        })
    }

    /// 警告
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationWarning> {
        self.issues.iter().filter_map(|i| match i {
            Issue::Warning(w) => Some(w),
            Issue::Error(_) => None,
        })
    }

    /// 错误数
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// 警告数
    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }

    /// 无错误
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// 既无错误也无警告
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "检查结果: {} 个错误, {} 个警告",
            self.error_count(),
            self.warning_count()
        )?;
        for issue in &self.issues {
            match issue {
                Issue::Error(e) => writeln!(f, "  ✗ {e}")?,
                Issue::Warning(w) => writeln!(f, "  ⚠ {w}")?,
            }
        }
        Ok(())
    }
}

/// 检查错误
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// 数值无效（非有限或不为正）
    InvalidValue {
        /// 字段
        field: &'static str,
        /// 流域 ID
        id: String,
        /// 值
        value: f64,
    },
    /// 流域 ID 重复
    DuplicateId {
        /// 流域 ID
        id: String,
    },
    /// 河段不在流域表中
    UnknownSegment {
        /// 河段 ID
        id: String,
    },
    /// 连接关系错误
    Topology {
        /// 说明
        message: String,
    },
    /// 输入无法读取或解析
    Unreadable {
        /// 说明
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { field, id, value } => write!(f, "流域 {id}: {field}={value} 无效"),
            Self::DuplicateId { id } => write!(f, "流域 {id} 在表中出现多次"),
            Self::UnknownSegment { id } => write!(f, "河段 {id} 不在流域表中"),
            Self::Topology { message } => write!(f, "连接关系: {message}"),
            Self::Unreadable { message } => write!(f, "无法读取: {message}"),
        }
    }
}

/// 检查警告
#[derive(Debug, Clone)]
pub enum ValidationWarning {
    /// 缺少可选属性
    MissingAttribute {
        /// 字段
        field: &'static str,
        /// 流域 ID
        id: String,
    },
    /// 下游 ID 不在表中
    DanglingNext {
        /// 流域 ID
        id: String,
        /// 下游 ID
        next_id: String,
    },
    /// 其它提示
    Custom {
        /// 说明
        message: String,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAttribute { field, id } => write!(f, "流域 {id} 缺少 {field}"),
            Self::DanglingNext { id, next_id } => {
                write!(f, "流域 {id} 的下游 {next_id} 不在流域表中")
            }
            Self::Custom { message } => f.write_str(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_is_clean() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert!(report.is_clean());
        assert_eq!(report.error_count(), 0);
    }

    #[test]
    fn test_missing_area_only_warns() {
        let mut report = ValidationReport::new();
        report.add_warning(ValidationWarning::MissingAttribute {
            field: "area",
            id: "7".into(),
        });
        assert!(report.is_valid());
        assert!(!report.is_clean());
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_merge_keeps_discovery_order() {
        let mut catchments = ValidationReport::new();
        catchments.add_error(ValidationError::DuplicateId { id: "1".into() });

        let mut segments = ValidationReport::new();
        segments.add_warning(ValidationWarning::Custom {
            message: "no x column".into(),
        });
        segments.add_error(ValidationError::UnknownSegment { id: "2".into() });

        catchments.merge(segments);
        assert_eq!(catchments.error_count(), 2);
        assert_eq!(catchments.warning_count(), 1);
        assert!(matches!(catchments.issues()[1], Issue::Warning(_)));
    }

    #[test]
    fn test_require_positive() {
        let mut report = ValidationReport::new();
        assert!(report.require_positive("area", "1", 2.0));
        assert!(!report.require_positive("area", "1", 0.0));
        assert!(!report.require_positive("length", "3", f64::NAN));
        let fields: Vec<&str> = report
            .errors()
            .map(|e| match e {
                ValidationError::InvalidValue { field, .. } => *field,
                _ => "",
            })
            .collect();
        assert_eq!(fields, vec!["area", "length"]);
    }

    #[test]
    fn test_display_marks_severity() {
        let mut report = ValidationReport::new();
        report.add_error(ValidationError::Topology {
            message: "cycle at 5".into(),
        });
        report.add_warning(ValidationWarning::DanglingNext {
            id: "5".into(),
            next_id: "6".into(),
        });

        let text = report.to_string();
        assert!(text.starts_with("检查结果: 1 个错误, 1 个警告"));
        assert!(text.contains("✗ 连接关系: cycle at 5"));
        assert!(text.contains("⚠ 流域 5 的下游 6"));
    }
}
