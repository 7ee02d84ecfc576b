// crates/cw_network/src/network.rs

//! 输入表模型
//!
//! - [`CatchmentTable`]: 完整流域表，`(id, next_id)` 连接边加面积
//! - [`NetworkIds`]: 简化河段网络的 ID 集合（有序）
//! - [`SegmentTable`]: 河段属性（长度、距河口距离、高程、宽度、糙率等）
//!
//! 这些表在一次运行中只加载一次，此后视为不可变。

use std::collections::{HashMap, HashSet};

use cw_foundation::validation::{ValidationError, ValidationReport, ValidationWarning};
use cw_foundation::{CatchmentId, CwError, CwResult, Edge};

// ============================================================================
// 流域表
// ============================================================================

/// 完整流域表
#[derive(Debug, Clone, Default)]
pub struct CatchmentTable {
    edges: Vec<Edge>,
    areas: HashMap<CatchmentId, f64>,
}

impl CatchmentTable {
    /// 仅由连接边创建（无面积）
    pub fn new(edges: Vec<Edge>) -> Self {
        Self {
            edges,
            areas: HashMap::new(),
        }
    }

    /// 由连接边和面积创建
    ///
    /// 面积必须为有限正值。
    pub fn with_areas(edges: Vec<Edge>, areas: HashMap<CatchmentId, f64>) -> CwResult<Self> {
        for (id, area) in &areas {
            CwError::check_positive("area", id.as_str(), *area)?;
        }
        Ok(Self { edges, areas })
    }

    /// 连接边（按输入顺序）
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// 流域面积
    #[inline]
    pub fn area(&self, id: &CatchmentId) -> Option<f64> {
        self.areas.get(id).copied()
    }

    /// 流域数量
    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// 检查流域表
    ///
    /// 错误：ID 重复、面积无效。警告：下游 ID 不在表中、缺少面积。
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        let mut seen: HashSet<&CatchmentId> = HashSet::with_capacity(self.edges.len());

        for edge in &self.edges {
            if !seen.insert(&edge.id) {
                report.add_error(ValidationError::DuplicateId {
                    id: edge.id.to_string(),
                });
            }
        }

        for edge in &self.edges {
            if !edge.is_terminal() && !seen.contains(&edge.next_id) {
                report.add_warning(ValidationWarning::DanglingNext {
                    id: edge.id.to_string(),
                    next_id: edge.next_id.to_string(),
                });
            }
            match self.areas.get(&edge.id) {
                Some(area) => {
                    report.require_positive("area", edge.id.as_str(), *area);
                }
                None if !self.areas.is_empty() => {
                    report.add_warning(ValidationWarning::MissingAttribute {
                        field: "area",
                        id: edge.id.to_string(),
                    });
                }
                None => {}
            }
        }

        if !self.edges.is_empty() && !self.edges.iter().any(Edge::is_terminal) {
            report.add_error(ValidationError::Topology {
                message: "没有任何流域汇入终端出口".into(),
            });
        }

        report
    }
}

// ============================================================================
// 河段网络 ID
// ============================================================================

/// 简化河段网络的 ID 集合
///
/// 保留输入顺序用于稳定输出，同时提供 O(1) 成员查询。
#[derive(Debug, Clone, Default)]
pub struct NetworkIds {
    ids: Vec<CatchmentId>,
    set: HashSet<CatchmentId>,
}

impl NetworkIds {
    /// 创建河段集合，ID 重复时返回错误
    pub fn new<I>(ids: I) -> CwResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<CatchmentId>,
    {
        let mut out = Self::default();
        for id in ids {
            let id = id.into();
            if !out.set.insert(id.clone()) {
                return Err(CwError::invalid_input(format!("河段 ID 重复: {id}")));
            }
            out.ids.push(id);
        }
        Ok(out)
    }

    /// 是否包含
    #[inline]
    pub fn contains(&self, id: &CatchmentId) -> bool {
        self.set.contains(id)
    }

    /// 按输入顺序迭代
    pub fn iter(&self) -> std::slice::Iter<'_, CatchmentId> {
        self.ids.iter()
    }

    /// 成员集合
    #[inline]
    pub fn as_set(&self) -> &HashSet<CatchmentId> {
        &self.set
    }

    /// 有序 ID 列表
    #[inline]
    pub fn as_slice(&self) -> &[CatchmentId] {
        &self.ids
    }

    /// 河段数量
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<'a> IntoIterator for &'a NetworkIds {
    type Item = &'a CatchmentId;
    type IntoIter = std::slice::Iter<'a, CatchmentId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

// ============================================================================
// 河段属性
// ============================================================================

/// 单个河段的属性
///
/// 除 ID 外全部可选：只做分区时不需要参数化所需的列。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentAttributes {
    /// 河段长度 [m]
    pub length: Option<f64>,
    /// 距河口距离 [m]
    pub x: Option<f64>,
    /// 河床高程 [m]
    pub elevation: Option<f64>,
    /// 河床宽度 [m]
    pub width: Option<f64>,
    /// Strickler 系数
    pub kst: Option<f64>,
    /// Strahler 等级
    pub strahler: Option<u32>,
    /// 多年平均流量 [m³/s]
    pub mean_discharge: Option<f64>,
}

/// 河段表
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    network: NetworkIds,
    attributes: HashMap<CatchmentId, SegmentAttributes>,
}

impl SegmentTable {
    /// 由 `(id, 属性)` 列表创建
    ///
    /// 长度和宽度若存在必须为正，平均流量不能为负。
    pub fn new(rows: Vec<(CatchmentId, SegmentAttributes)>) -> CwResult<Self> {
        let network = NetworkIds::new(rows.iter().map(|(id, _)| id.clone()))?;
        for (id, attrs) in &rows {
            if let Some(length) = attrs.length {
                CwError::check_positive("length", id.as_str(), length)?;
            }
            if let Some(width) = attrs.width {
                CwError::check_positive("width", id.as_str(), width)?;
            }
            if let Some(mq) = attrs.mean_discharge {
                CwError::check_non_negative("mean_discharge", id.as_str(), mq)?;
            }
        }
        Ok(Self {
            network,
            attributes: rows.into_iter().collect(),
        })
    }

    /// 仅由 ID 创建（无属性）
    pub fn from_ids<I>(ids: I) -> CwResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<CatchmentId>,
    {
        let network = NetworkIds::new(ids)?;
        Ok(Self {
            network,
            attributes: HashMap::new(),
        })
    }

    /// 河段网络 ID
    #[inline]
    pub fn network(&self) -> &NetworkIds {
        &self.network
    }

    /// 河段属性
    #[inline]
    pub fn attributes(&self, id: &CatchmentId) -> Option<&SegmentAttributes> {
        self.attributes.get(id)
    }

    /// 河段长度
    #[inline]
    pub fn length(&self, id: &CatchmentId) -> Option<f64> {
        self.attributes.get(id).and_then(|a| a.length)
    }

    /// 检查河段是否都在流域表中
    pub fn validate_against(&self, catchments: &CatchmentTable) -> ValidationReport {
        let mut report = ValidationReport::new();
        let known: HashSet<&CatchmentId> = catchments.edges().iter().map(|e| &e.id).collect();
        for id in &self.network {
            if !known.contains(id) {
                report.add_error(ValidationError::UnknownSegment { id: id.to_string() });
            }
            if self.length(id).is_none() {
                report.add_warning(ValidationWarning::MissingAttribute {
                    field: "length",
                    id: id.to_string(),
                });
            }
        }
        report
    }
}
