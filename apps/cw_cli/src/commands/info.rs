// apps/cw_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 显示流域表的连接统计；配置了河段表时附带分区概况。

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use cw_network::partition::{find_headwaters, find_junctions};
use cw_network::{ConnectionCounts, ConnectionMap, Direction, Tributaries};

use super::{load_catchments, load_config, load_segments};

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: PathBuf,

    /// 连接方向 (up, down)
    #[arg(short, long, default_value = "up")]
    pub direction: String,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("=== Crosswater 信息 ===");

    let direction: Direction = args.direction.parse()?;
    let config = load_config(&args.config)?;
    let catchments = load_catchments(&config)?;

    println!("=== 流域表 ===");
    println!("文件: {}", config.catchments.path.display());
    println!("流域数: {}", catchments.len());
    println!("默认线程数: {}", rayon::current_num_threads());

    let map = ConnectionMap::build(catchments.edges(), direction, None);
    let counts = ConnectionCounts::from_map(&map);
    println!("\n=== 连接统计 ({direction}) ===");
    println!("{counts}");
    println!("连接总数: {}", counts.total_connections());
    println!("最大邻居数: {}", counts.max_neighbors());

    if config.segments.is_none() {
        return Ok(());
    }

    let segments = load_segments(&config)?;
    let network = segments.network();
    let tributaries =
        Tributaries::resolve(&catchments, network, config.closure.max_iterations)?;
    let up_network =
        ConnectionMap::build(catchments.edges(), Direction::Upstream, Some(network.as_set()));
    let junctions = find_junctions(&up_network, network);
    let headwaters = find_headwaters(&up_network, network);

    println!("\n=== 河段网络 ===");
    println!("河段数: {}", network.len());
    println!("汇流点: {}", junctions.len());
    println!("源头: {}", headwaters.len());
    println!("支流出口: {}", tributaries.len());
    println!("最少分区数: {}", 2 * junctions.len() + 1);
    if let Some(largest) = tributaries.ranked_by_area().first() {
        println!(
            "最大支流: {} -> {} ({:.2})",
            largest.outlet, largest.inlet, largest.area
        );
    }

    Ok(())
}
