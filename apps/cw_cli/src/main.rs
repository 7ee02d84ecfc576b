// apps/cw_cli/src/main.rs

//! Crosswater 命令行界面
//!
//! 河网分区、分区连接与逐时间步负荷聚合的命令行工具。
//!
//! # 架构层级
//!
//! 本模块属于 **Layer 5: Application**：
//! - 只负责参数解析、日志初始化和命令分发
//! - 错误统一转换为 `anyhow::Error` 并附加上下文

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Crosswater 河网路由准备工具
#[derive(Parser)]
#[command(name = "cw_cli")]
#[command(author = "Crosswater Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Crosswater river network partitioning and load aggregation", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 分区、连接并聚合分区输入
    Route(commands::route::RouteArgs),
    /// 独立出口的上游聚合
    Upstream(commands::upstream::UpstreamArgs),
    /// 显示河网连接统计
    Info(commands::info::InfoArgs),
    /// 验证配置与输入表
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Route(args) => commands::route::execute(args),
        Commands::Upstream(args) => commands::upstream::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    }
}
