// crates/cw_config/src/routing_config.rs

//! RoutingConfig - 河网分区与聚合配置
//!
//! JSON 格式。相对路径在加载时按配置文件所在目录解析。
//!
//! ```json
//! {
//!   "catchments": { "path": "catchments.csv" },
//!   "segments": { "path": "riversegments.csv" },
//!   "steps": { "directory": "steps" },
//!   "partition": { "nr_compartments": 12 },
//!   "outlets": ["4711"],
//!   "output": { "directory": "output" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// 路由准备配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// 完整流域表
    pub catchments: CatchmentTableConfig,

    /// 简化河段网络表
    #[serde(default)]
    pub segments: Option<SegmentTableConfig>,

    /// 逐时间步输入
    #[serde(default)]
    pub steps: Option<StepInputConfig>,

    /// 分区参数
    #[serde(default)]
    pub partition: PartitionConfig,

    /// 上游闭包参数
    #[serde(default)]
    pub closure: ClosureConfig,

    /// 独立上游聚合的出口列表
    #[serde(default)]
    pub outlets: Vec<String>,

    /// 湖泊出口列表（负荷缓冲）
    #[serde(default)]
    pub lakes: Vec<String>,

    /// 输出配置
    #[serde(default)]
    pub output: OutputConfig,

    /// 并行配置
    #[serde(default)]
    pub parallel: ParallelConfig,
}

/// 流域表配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchmentTableConfig {
    /// 文件路径
    pub path: PathBuf,

    /// 列名
    #[serde(default)]
    pub columns: CatchmentColumns,
}

/// 流域表列名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchmentColumns {
    /// 流域 ID
    #[serde(default = "default_id_column")]
    pub id: String,
    /// 直接下游 ID
    #[serde(default = "default_next_id_column")]
    pub next_id: String,
    /// 面积
    #[serde(default = "default_area_column")]
    pub area: String,
}

fn default_id_column() -> String { "WSO1_ID".into() }
fn default_next_id_column() -> String { "NEXTDOWNID".into() }
fn default_area_column() -> String { "AREA".into() }

impl Default for CatchmentColumns {
    fn default() -> Self {
        Self {
            id: default_id_column(),
            next_id: default_next_id_column(),
            area: default_area_column(),
        }
    }
}

/// 河段表配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentTableConfig {
    /// 文件路径
    pub path: PathBuf,

    /// 列名
    #[serde(default)]
    pub columns: SegmentColumns,
}

/// 河段表列名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentColumns {
    /// 河段 ID
    #[serde(default = "default_id_column")]
    pub id: String,
    /// 河段长度
    #[serde(default = "default_length_column")]
    pub length: String,
    /// 距河口距离
    #[serde(default = "default_x_column")]
    pub x: String,
    /// 河床高程
    #[serde(default = "default_elevation_column")]
    pub elevation: String,
    /// 河床宽度
    #[serde(default = "default_width_column")]
    pub width: String,
    /// Strickler 系数
    #[serde(default = "default_kst_column")]
    pub kst: String,
    /// Strahler 等级
    #[serde(default = "default_strahler_column")]
    pub strahler: String,
    /// 多年平均流量
    #[serde(default = "default_mean_discharge_column")]
    pub mean_discharge: String,
}

fn default_length_column() -> String { "LENGTH".into() }
fn default_x_column() -> String { "X".into() }
fn default_elevation_column() -> String { "ELEV".into() }
fn default_width_column() -> String { "WIDTH".into() }
fn default_kst_column() -> String { "Kst".into() }
fn default_strahler_column() -> String { "STRAHLER".into() }
fn default_mean_discharge_column() -> String { "MQ".into() }

impl Default for SegmentColumns {
    fn default() -> Self {
        Self {
            id: default_id_column(),
            length: default_length_column(),
            x: default_x_column(),
            elevation: default_elevation_column(),
            width: default_width_column(),
            kst: default_kst_column(),
            strahler: default_strahler_column(),
            mean_discharge: default_mean_discharge_column(),
        }
    }
}

/// 逐时间步输入配置
///
/// 目录下每个时间步一个 `step_<n>.csv`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepInputConfig {
    /// 目录
    pub directory: PathBuf,

    /// 列名
    #[serde(default)]
    pub columns: StepColumns,
}

/// 时间步表列名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepColumns {
    /// 流域 ID
    #[serde(default = "default_catchment_column")]
    pub catchment: String,
    /// 流量
    #[serde(default = "default_discharge_column")]
    pub discharge: String,
    /// 负荷
    #[serde(default = "default_load_column")]
    pub load: String,
    /// 本地流量（可选列）
    #[serde(default = "default_local_discharge_column")]
    pub local_discharge: String,
}

fn default_catchment_column() -> String { "catchment".into() }
fn default_discharge_column() -> String { "discharge".into() }
fn default_load_column() -> String { "load".into() }
fn default_local_discharge_column() -> String { "local_discharge".into() }

impl Default for StepColumns {
    fn default() -> Self {
        Self {
            catchment: default_catchment_column(),
            discharge: default_discharge_column(),
            load: default_load_column(),
            local_discharge: default_local_discharge_column(),
        }
    }
}

/// 分区参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// 目标分区数量
    #[serde(default = "default_nr_compartments")]
    pub nr_compartments: usize,
}

fn default_nr_compartments() -> usize { 1 }

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            nr_compartments: default_nr_compartments(),
        }
    }
}

/// 上游闭包参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosureConfig {
    /// 广度优先扩展的最大层数
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_max_iterations() -> usize { 100_000 }

impl Default for ClosureConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

/// 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 输出目录
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    /// 是否额外导出各出口的逐单元 CSV（分区输入表总是写出）
    #[serde(default = "default_true")]
    pub csv_exports: bool,

    /// 是否输出分区参数化和初始条件
    #[serde(default)]
    pub parameterization: bool,
}

fn default_output_dir() -> PathBuf { PathBuf::from("output") }
fn default_true() -> bool { true }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            csv_exports: default_true(),
            parameterization: false,
        }
    }
}

/// 并行配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParallelConfig {
    /// 线程数（0 表示 rayon 默认值）
    #[serde(default)]
    pub num_threads: usize,
}

impl RoutingConfig {
    /// 以流域表路径创建最小配置
    pub fn new(catchments: impl Into<PathBuf>) -> Self {
        Self {
            catchments: CatchmentTableConfig {
                path: catchments.into(),
                columns: CatchmentColumns::default(),
            },
            segments: None,
            steps: None,
            partition: PartitionConfig::default(),
            closure: ClosureConfig::default(),
            outlets: Vec::new(),
            lakes: Vec::new(),
            output: OutputConfig::default(),
            parallel: ParallelConfig::default(),
        }
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let mut config = Self::from_json(&content)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }

    /// 从 JSON 字符串解析并验证
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: RoutingConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 将相对路径按 `base` 解析
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.catchments.path);
        if let Some(segments) = self.segments.as_mut() {
            resolve(&mut segments.path);
        }
        if let Some(steps) = self.steps.as_mut() {
            resolve(&mut steps.directory);
        }
        resolve(&mut self.output.directory);
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partition.nr_compartments == 0 {
            return Err(ConfigError::invalid(
                "partition.nr_compartments",
                self.partition.nr_compartments,
                "目标分区数量必须至少为 1",
            ));
        }

        if self.closure.max_iterations == 0 {
            return Err(ConfigError::invalid(
                "closure.max_iterations",
                self.closure.max_iterations,
                "迭代上限必须为正",
            ));
        }

        if self.catchments.path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("catchments.path".into()));
        }

        let c = &self.catchments.columns;
        if c.id == c.next_id {
            return Err(ConfigError::invalid(
                "catchments.columns.next_id",
                &c.next_id,
                "下游列不能与 ID 列相同",
            ));
        }

        for (key, list) in [("outlets", &self.outlets), ("lakes", &self.lakes)] {
            if list.iter().any(|id| id.trim().is_empty()) {
                return Err(ConfigError::invalid(key, format!("{list:?}"), "包含空 ID"));
            }
        }

        Ok(())
    }

    /// 河段表配置（路由必需）
    pub fn require_segments(&self) -> Result<&SegmentTableConfig, ConfigError> {
        self.segments
            .as_ref()
            .ok_or_else(|| ConfigError::Missing("segments".into()))
    }

    /// 时间步输入配置（聚合必需）
    pub fn require_steps(&self) -> Result<&StepInputConfig, ConfigError> {
        self.steps
            .as_ref()
            .ok_or_else(|| ConfigError::Missing("steps".into()))
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }
}
