// apps/cw_cli/src/commands/upstream.rs

//! 出口上游聚合命令
//!
//! 对每个出口求完整流域表上的上游闭包，逐时间步聚合负荷（流量取出口本身），
//! 再按出口重排。

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};

use cw_aggregate::{
    AggregationPlan, NamedPlan, ReshapeConverter, RunnerConfig, TimestepRunner, GROUP_OUTLETS,
};
use cw_io::{write_membership, write_unit_series, CsvAggregateStore};
use cw_network::{ConnectionMap, Direction, UpstreamClosure};

use super::{ids, load_catchments, load_config, open_steps};

/// 出口上游聚合参数
#[derive(Args)]
pub struct UpstreamArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: PathBuf,

    /// 出口 ID（可重复，覆盖配置中的出口列表）
    #[arg(long = "outlet")]
    pub outlets: Vec<String>,

    /// 输出目录（覆盖配置）
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// 执行出口上游聚合命令
pub fn execute(args: UpstreamArgs) -> Result<()> {
    info!("=== Crosswater 出口上游聚合 ===");

    let mut config = load_config(&args.config)?;
    if !args.outlets.is_empty() {
        config.outlets = args.outlets;
    }
    if let Some(dir) = args.output {
        config.output.directory = dir;
    }
    config.validate().context("配置无效")?;
    if config.outlets.is_empty() {
        bail!("没有指定出口：在配置的 outlets 中列出或使用 --outlet");
    }

    let catchments = load_catchments(&config)?;
    let up = ConnectionMap::build(catchments.edges(), Direction::Upstream, None);
    let closure =
        UpstreamClosure::new(&up)?.with_max_iterations(config.closure.max_iterations);
    let sets = closure
        .upstream_dict(&ids(&config.outlets))
        .context("计算上游闭包失败")?;
    for set in &sets {
        info!("出口 {}: 上游 {} 个流域", set.outlet, set.len());
    }

    let out = config.output.directory.clone();
    std::fs::create_dir_all(&out)
        .with_context(|| format!("无法创建输出目录 {}", out.display()))?;
    let membership: Vec<_> = sets
        .iter()
        .flat_map(|s| s.ids.iter().map(move |id| (id.clone(), s.outlet.to_string())))
        .collect();
    write_membership(&out.join("outlet_membership.csv"), &membership)?;

    if config.steps.is_none() {
        warn!("配置中没有时间步输入，只写出成员表");
        return Ok(());
    }

    let source = open_steps(&config, &catchments)?;
    let plan = AggregationPlan::upstream_outlets(&sets);
    let units = plan.unit_names();
    let store = CsvAggregateStore::new(out.join("steps"))?;
    TimestepRunner::new(&RunnerConfig {
        num_threads: config.parallel.num_threads,
    })?
    .run(source.as_ref(), &[NamedPlan::new(GROUP_OUTLETS, plan)], &store)
    .context("出口聚合失败")?;

    if config.output.csv_exports {
        let series = ReshapeConverter::new(config.parallel.num_threads)
            .convert(&store, GROUP_OUTLETS, &units)
            .context("重排出口结果失败")?;
        let paths = write_unit_series(&out.join(GROUP_OUTLETS), &series)?;
        info!("写出 {} 个出口表", paths.len());
    }

    info!("=== 出口上游聚合完成 ===");
    Ok(())
}
