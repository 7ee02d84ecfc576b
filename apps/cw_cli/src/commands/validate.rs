// apps/cw_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 一次性检查配置、流域表、河段表和时间步目录，汇总全部错误与警告后再判定。

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use tracing::{error, info, warn};

use cw_aggregate::StepSource;
use cw_config::RoutingConfig;
use cw_foundation::validation::{ValidationError, ValidationReport, ValidationWarning};
use cw_io::CsvStepStore;

use super::{load_catchments, load_config, load_segments};

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: PathBuf,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== Crosswater 配置验证 ===");

    println!("\n检查配置文件: {}", args.config.display());
    let config = load_config(&args.config)?;
    println!("  ✓ 配置文件格式有效");

    let mut report = ValidationReport::new();
    validate_tables(&config, &mut report);
    validate_steps(&config, &mut report);

    print_report(&report, args.strict)
}

fn validate_tables(config: &RoutingConfig, report: &mut ValidationReport) {
    println!("\n检查流域表: {}", config.catchments.path.display());
    let catchments = match load_catchments(config) {
        Ok(table) => table,
        Err(e) => {
            report.add_error(ValidationError::Unreadable {
                message: format!("{e:#}"),
            });
            return;
        }
    };
    println!("  流域数: {}", catchments.len());
    report.merge(catchments.validate());

    if config.segments.is_none() {
        report.add_warning(ValidationWarning::Custom {
            message: "未配置河段表，无法分区".into(),
        });
        return;
    }

    match load_segments(config) {
        Ok(segments) => {
            println!("  河段数: {}", segments.network().len());
            report.merge(segments.validate_against(&catchments));
        }
        Err(e) => report.add_error(ValidationError::Unreadable {
            message: format!("{e:#}"),
        }),
    }
}

fn validate_steps(config: &RoutingConfig, report: &mut ValidationReport) {
    let Some(steps) = config.steps.as_ref() else {
        report.add_warning(ValidationWarning::Custom {
            message: "未配置时间步输入，只能分区".into(),
        });
        return;
    };

    println!("\n检查时间步目录: {}", steps.directory.display());
    let store = match CsvStepStore::open(&steps.directory, steps.columns.clone()) {
        Ok(store) => store,
        Err(e) => {
            report.add_error(ValidationError::Unreadable {
                message: e.to_string(),
            });
            return;
        }
    };

    println!("  时间步数: {}", store.step_count());
    if store.step_count() == 0 {
        report.add_warning(ValidationWarning::Custom {
            message: "时间步目录为空".into(),
        });
        return;
    }
    // 只完整解析首个时间步，检查列名与数值
    if let Err(e) = store.read_step(0) {
        report.add_error(ValidationError::Unreadable {
            message: e.to_string(),
        });
    }
}

fn print_report(report: &ValidationReport, strict: bool) -> Result<()> {
    println!("\n=== 验证结果 ===");

    for err in report.errors() {
        error!("{}", err);
    }
    for warning in report.warnings() {
        warn!("{}", warning);
    }
    println!("{report}");

    let success = if strict {
        report.is_clean()
    } else {
        report.is_valid()
    };

    if success {
        println!("✓ 验证通过");
        Ok(())
    } else {
        println!("✗ 验证失败");
        bail!(
            "验证失败：发现 {} 个错误，{} 个警告",
            report.error_count(),
            report.warning_count()
        )
    }
}
