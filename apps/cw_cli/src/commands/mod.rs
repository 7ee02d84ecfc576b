// apps/cw_cli/src/commands/mod.rs

//! 子命令及其共用的加载步骤

pub mod info;
pub mod route;
pub mod upstream;
pub mod validate;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use cw_aggregate::{lake_catchments, LakeBufferedSource, StepSource};
use cw_config::RoutingConfig;
use cw_foundation::CatchmentId;
use cw_io::{read_catchments, read_segments, CsvStepStore};
use cw_network::{CatchmentTable, ConnectionMap, Direction, SegmentTable, UpstreamClosure};

/// 加载配置
pub fn load_config(path: &Path) -> Result<RoutingConfig> {
    RoutingConfig::from_file(path)
        .with_context(|| format!("无法加载配置文件 {}", path.display()))
}

/// 读取完整流域表
pub fn load_catchments(config: &RoutingConfig) -> Result<CatchmentTable> {
    let c = &config.catchments;
    read_catchments(&c.path, &c.columns)
        .with_context(|| format!("无法读取流域表 {}", c.path.display()))
}

/// 读取河段表
pub fn load_segments(config: &RoutingConfig) -> Result<SegmentTable> {
    let s = config.require_segments()?;
    read_segments(&s.path, &s.columns)
        .with_context(|| format!("无法读取河段表 {}", s.path.display()))
}

/// 把配置中的 ID 字符串转换为流域 ID
pub fn ids(list: &[String]) -> Vec<CatchmentId> {
    list.iter().map(CatchmentId::new).collect()
}

/// 打开时间步源数据，配置了湖泊时包装为湖泊缓冲源
pub fn open_steps(config: &RoutingConfig, table: &CatchmentTable) -> Result<Box<dyn StepSource>> {
    let steps = config.require_steps()?;
    let store = CsvStepStore::open(&steps.directory, steps.columns.clone())
        .with_context(|| format!("无法打开时间步目录 {}", steps.directory.display()))?;

    if config.lakes.is_empty() {
        return Ok(Box::new(store));
    }

    let up = ConnectionMap::build(table.edges(), Direction::Upstream, None);
    let closure =
        UpstreamClosure::new(&up)?.with_max_iterations(config.closure.max_iterations);
    let buffered: HashSet<CatchmentId> = lake_catchments(&closure, &ids(&config.lakes))
        .context("无法计算湖泊上游流域")?;
    info!("湖泊缓冲: {} 个湖泊, {} 个流域", config.lakes.len(), buffered.len());

    let source = LakeBufferedSource::new(store, &buffered, config.parallel.num_threads)
        .context("无法计算湖泊平均负荷")?;
    Ok(Box::new(source))
}
