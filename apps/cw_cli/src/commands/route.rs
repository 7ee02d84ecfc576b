// apps/cw_cli/src/commands/route.rs

//! 路由准备命令
//!
//! 1. 读取流域表与河段表，构建河网模型（支流出口、分区、连接）
//! 2. 导出连接表、分区表和成员表
//! 3. 配置了时间步输入时，聚合每个分区的上游输入和侧向输入并按分区重排写出
//! 4. 按需输出分区参数化和初始条件

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use cw_aggregate::{
    AggregationPlan, NamedPlan, ReshapeConverter, RunnerConfig, TimestepRunner,
    GROUP_LATERAL_INPUT, GROUP_UPSTREAM_INPUT,
};
use cw_config::RoutingConfig;
use cw_foundation::CwError;
use cw_io::{
    write_compartments, write_initial_conditions, write_links, write_membership,
    write_parameterization, write_unit_series, CsvAggregateStore,
};
use cw_network::{CatchmentTable, ModelOptions, ProfileBuilder, RiverNetwork, SegmentTable};

use super::{load_catchments, load_config, load_segments, open_steps};

/// 路由准备参数
#[derive(Args)]
pub struct RouteArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: PathBuf,

    /// 目标分区数（覆盖配置）
    #[arg(short, long)]
    pub nr_compartments: Option<usize>,

    /// 输出目录（覆盖配置）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 线程数（覆盖配置，0 表示默认）
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// 只分区，不聚合时间步
    #[arg(long)]
    pub skip_aggregation: bool,
}

/// 执行路由准备命令
pub fn execute(args: RouteArgs) -> Result<()> {
    info!("=== Crosswater 路由准备 ===");
    let start = Instant::now();

    let mut config = load_config(&args.config)?;
    if let Some(n) = args.nr_compartments {
        config.partition.nr_compartments = n;
    }
    if let Some(dir) = args.output {
        config.output.directory = dir;
    }
    if let Some(n) = args.threads {
        config.parallel.num_threads = n;
    }
    config.validate().context("配置无效")?;

    let catchments = load_catchments(&config)?;
    let segments = load_segments(&config)?;
    let model = RiverNetwork::build(
        &catchments,
        &segments,
        ModelOptions {
            nr_compartments: config.partition.nr_compartments,
            max_iterations: config.closure.max_iterations,
        },
    )
    .context("构建河网模型失败")?;

    info!(
        "分区: {} 个, 连接: {} 条, 支流: {} 条",
        model.partition.len(),
        model.links.links().len(),
        model.tributaries.len()
    );
    if let Some(plan) = model.partition.plan() {
        info!(
            "汇合点 {} 个, 请求 {} 个分区, 实际 {} 个",
            model.partition.junctions().len(),
            plan.requested,
            plan.effective
        );
    }

    let out = config.output.directory.clone();
    std::fs::create_dir_all(&out)
        .with_context(|| format!("无法创建输出目录 {}", out.display()))?;
    export_model(&out, &model)?;

    if args.skip_aggregation {
        info!("跳过时间步聚合");
    } else if config.steps.is_some() {
        aggregate(&config, &catchments, &model, &out)?;
    } else {
        warn!("配置中没有时间步输入，跳过聚合");
    }

    if config.output.parameterization {
        parameterize(&segments, &model, &out)?;
    }

    info!("=== 路由准备完成 ===");
    info!("总耗时: {:.2} s", start.elapsed().as_secs_f64());
    Ok(())
}

fn export_model(out: &Path, model: &RiverNetwork) -> Result<()> {
    write_links(&out.join("links.csv"), model.links.links())?;
    write_compartments(&out.join("compartments.csv"), &model.partition)?;
    write_membership(
        &out.join("upstream_input_membership.csv"),
        &model.links.upstream_membership(),
    )?;
    write_membership(
        &out.join("lateral_input_membership.csv"),
        &model.links.lateral_membership(),
    )?;

    let inputs_path = out.join("compartment_inputs.json");
    let json = serde_json::to_string_pretty(model.links.inputs())?;
    std::fs::write(&inputs_path, json)
        .with_context(|| format!("无法写入 {}", inputs_path.display()))?;

    info!("模型表已写入 {}", out.display());
    Ok(())
}

fn aggregate(
    config: &RoutingConfig,
    catchments: &CatchmentTable,
    model: &RiverNetwork,
    out: &Path,
) -> Result<()> {
    let source = open_steps(config, catchments)?;

    let upstream = AggregationPlan::compartment_upstream(&model.links);
    let lateral = AggregationPlan::compartment_lateral(&model.links);
    let units = lateral.unit_names();
    let plans = vec![
        NamedPlan::new(GROUP_UPSTREAM_INPUT, upstream),
        NamedPlan::new(GROUP_LATERAL_INPUT, lateral),
    ];

    let store = CsvAggregateStore::new(out.join("steps"))?;
    let runner = TimestepRunner::new(&RunnerConfig {
        num_threads: config.parallel.num_threads,
    })?;
    runner
        .run(source.as_ref(), &plans, &store)
        .context("时间步聚合失败")?;

    let converter = ReshapeConverter::new(config.parallel.num_threads);
    for group in [GROUP_UPSTREAM_INPUT, GROUP_LATERAL_INPUT] {
        let series = converter
            .convert(&store, group, &units)
            .with_context(|| format!("重排 {group} 失败"))?;
        let paths = write_unit_series(&out.join(group), &series)?;
        info!("{}: 写出 {} 个分区表", group, paths.len());
    }
    Ok(())
}

fn parameterize(segments: &SegmentTable, model: &RiverNetwork, out: &Path) -> Result<()> {
    info!("=== 分区参数化 ===");
    let builder = ProfileBuilder::new(segments);
    let dir = out.join("parameterization");
    let mut conditions = Vec::new();

    for comp in model.partition.iter() {
        let profile = match builder.parameterization(comp) {
            Ok(points) => points,
            Err(e @ CwError::InvalidInput { .. }) => {
                warn!(compartment = %comp.name, "跳过参数化: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        write_parameterization(&dir.join(format!("{}.csv", comp.name)), &profile)?;

        match builder.initial_conditions(comp, model.next_compartment(comp)) {
            Ok(ic) => conditions.push((comp.name.clone(), ic)),
            Err(e @ CwError::InvalidInput { .. }) => {
                warn!(compartment = %comp.name, "跳过初始条件: {}", e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    write_initial_conditions(&out.join("initial_conditions.csv"), &conditions)?;
    info!("参数化: {} 个分区有初始条件", conditions.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 网络 a, b -> c -> -9999，支流 tc -> c；两个时间步
    fn write_project(dir: &Path) -> PathBuf {
        std::fs::write(
            dir.join("catchments.csv"),
            "WSO1_ID,NEXTDOWNID,AREA\na,c,1\nb,c,1\nc,-9999,1\ntc,c,2\n",
        )
        .unwrap();
        std::fs::write(dir.join("segments.csv"), "WSO1_ID,LENGTH\na,10\nb,10\nc,10\n").unwrap();
        let steps = dir.join("steps");
        std::fs::create_dir_all(&steps).unwrap();
        for step in 0..2 {
            std::fs::write(
                steps.join(cw_io::step_file_name(step)),
                "catchment,discharge,load\na,1,1\nb,1,1\nc,3,1\ntc,1,1\n",
            )
            .unwrap();
        }

        let config = serde_json::json!({
            "catchments": { "path": "catchments.csv" },
            "segments": { "path": "segments.csv" },
            "steps": { "directory": "steps" },
            "partition": { "nr_compartments": 3 },
            "output": { "directory": "out", "csv_exports": false },
        });
        let path = dir.join("config.json");
        std::fs::write(&path, config.to_string()).unwrap();
        path
    }

    #[test]
    fn test_compartment_tables_written_without_csv_exports() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(dir.path());

        execute(RouteArgs {
            config,
            nr_compartments: None,
            output: None,
            threads: Some(1),
            skip_aggregation: false,
        })
        .unwrap();

        let out = dir.path().join("out");
        for group in [GROUP_UPSTREAM_INPUT, GROUP_LATERAL_INPUT] {
            for name in ["Ca", "Cb", "Cc"] {
                assert!(out.join(group).join(format!("{name}.csv")).is_file(), "{group}/{name}");
            }
        }
        assert!(out.join("links.csv").is_file());
    }
}
