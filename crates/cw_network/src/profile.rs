// crates/cw_network/src/profile.rs

//! 分区纵剖面参数化与初始条件
//!
//! # 参数化
//!
//! 每个分区按河段顺序输出 `(x, width, kst, zb)`，其中 `x` 为距河口距离，
//! 向下游递减。河床高程 `zb` 必须沿程严格下降：
//!
//! 1. 找出 `zb[i] - zb[i-1] >= 0` 的点，置为缺测
//! 2. 以 `x` 为自变量在前后有效点之间线性插值，末尾缺测取前一有效值
//! 3. 末尾两点相等时末点降低 1 m
//! 4. 重复直到没有非下降点，最后保留一位小数
//!
//! 只有一个河段的分区在 `x + 分区长度` 处追加一个点。
//!
//! # 初始条件
//!
//! 由首河段的平均流量、Strahler 等级、位置与高程，以及下游分区首河段高程给出。

use serde::Serialize;
use tracing::warn;

use cw_foundation::{CatchmentId, CwError, CwResult};

use crate::network::{SegmentAttributes, SegmentTable};
use crate::partition::Compartment;

/// 高程修正默认最大迭代次数
pub const DEFAULT_SLOPE_ITERATIONS: usize = 1000;

/// 纵剖面点
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfilePoint {
    /// 距河口距离 [m]
    pub x: f64,
    /// 河床宽度 [m]
    pub width: f64,
    /// Strickler 系数
    pub kst: f64,
    /// 河床高程 [m]
    pub zb: f64,
}

/// 分区初始条件
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InitialConditions {
    /// 平均流量 [m³/s]
    pub mq: f64,
    /// 初始水深 [m]，Strahler 等级未知时为 None
    pub h: Option<f64>,
    /// 首河段距河口距离 [m]
    pub start_x: f64,
    /// 分区长度 [m]
    pub comp_length: f64,
    /// 首河段河床高程 [m]
    pub zb_0: f64,
    /// 末端河床高程 [m]
    pub zb_end: f64,
}

/// 由 Strahler 等级估计初始水深 [m]
pub fn strahler_depth(order: u32) -> Option<f64> {
    match order {
        1 => Some(0.05),
        2 => Some(0.1),
        3 => Some(0.5),
        4 => Some(1.0),
        5 => Some(2.0),
        6 => Some(3.0),
        7 => Some(4.0),
        8 => Some(5.0),
        _ => None,
    }
}

/// 修正河床高程使其沿程严格下降
///
/// 返回修正后的高程以及是否在 `max_iterations` 内收敛。
pub fn correct_slope(x: &[f64], zb: &[f64], max_iterations: usize) -> (Vec<f64>, bool) {
    let n = zb.len().min(x.len());
    let mut values: Vec<Option<f64>> = zb[..n].iter().copied().map(Some).collect();
    let mut converged = false;

    for _ in 0..max_iterations {
        let rising: Vec<usize> = (1..n)
            .filter(|&i| matches!((values[i], values[i - 1]), (Some(b), Some(a)) if b - a >= 0.0))
            .collect();
        if rising.is_empty() {
            converged = true;
            break;
        }
        for i in rising {
            values[i] = None;
        }
        interpolate_over_x(x, &mut values);
        if n >= 2 {
            if let (Some(a), Some(b)) = (values[n - 2], values[n - 1]) {
                if a == b {
                    values[n - 1] = Some(b - 1.0);
                }
            }
        }
    }

    let out = values
        .into_iter()
        .map(|v| round_to_tenth(v.unwrap_or(f64::NAN)))
        .collect();
    (out, converged)
}

/// 以 `x` 为自变量线性插值缺测点，末尾缺测取前一有效值
fn interpolate_over_x(x: &[f64], values: &mut [Option<f64>]) {
    let n = values.len();
    let mut prev: Option<usize> = None;
    let mut i = 0;
    while i < n {
        if values[i].is_some() {
            prev = Some(i);
            i += 1;
            continue;
        }
        let next = (i + 1..n).find(|&j| values[j].is_some());
        let Some(p) = prev else {
            i += 1;
            continue;
        };
        let (xp, zp) = (x[p], values[p].unwrap_or(f64::NAN));
        match next {
            Some(q) => {
                let (xq, zq) = (x[q], values[q].unwrap_or(f64::NAN));
                for k in i..q {
                    values[k] = Some(if xq == xp {
                        zp
                    } else {
                        zp + (zq - zp) * (x[k] - xp) / (xq - xp)
                    });
                }
                i = q;
            }
            None => {
                for v in values.iter_mut().skip(i) {
                    *v = Some(zp);
                }
                i = n;
            }
        }
    }
}

#[inline]
fn round_to_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// 分区参数化构建器
pub struct ProfileBuilder<'a> {
    segments: &'a SegmentTable,
    max_iterations: usize,
}

impl<'a> ProfileBuilder<'a> {
    /// 创建构建器
    pub fn new(segments: &'a SegmentTable) -> Self {
        Self {
            segments,
            max_iterations: DEFAULT_SLOPE_ITERATIONS,
        }
    }

    /// 设置高程修正最大迭代次数
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    fn attrs(&self, id: &CatchmentId) -> CwResult<&'a SegmentAttributes> {
        self.segments
            .attributes(id)
            .ok_or_else(|| CwError::invalid_input(format!("河段 {id} 缺少属性")))
    }

    /// 分区纵剖面
    pub fn parameterization(&self, comp: &Compartment) -> CwResult<Vec<ProfilePoint>> {
        let mut points = Vec::with_capacity(comp.ids.len() + 1);
        for id in &comp.ids {
            let a = self.attrs(id)?;
            points.push(ProfilePoint {
                x: required(a.x, "x", id)?,
                width: required(a.width, "width", id)?,
                kst: required(a.kst, "kst", id)?,
                zb: required(a.elevation, "elevation", id)?,
            });
        }

        if points.len() == 1 {
            let length = comp_length(comp)?;
            let mut extra = points[0];
            extra.x += length;
            points.push(extra);
        }

        let x: Vec<f64> = points.iter().map(|p| p.x).collect();
        let zb: Vec<f64> = points.iter().map(|p| p.zb).collect();
        let (corrected, converged) = correct_slope(&x, &zb, self.max_iterations);
        if !converged {
            warn!(compartment = %comp.name, "河床高程修正未收敛");
        }
        for (p, z) in points.iter_mut().zip(corrected) {
            p.zb = z;
        }
        Ok(points)
    }

    /// 分区初始条件
    ///
    /// `next` 为下游分区，没有下游分区时末端高程取本分区尾河段。
    pub fn initial_conditions(
        &self,
        comp: &Compartment,
        next: Option<&Compartment>,
    ) -> CwResult<InitialConditions> {
        let head = comp.head();
        let first = self.attrs(head)?;
        let end_id = next.map(Compartment::head).unwrap_or_else(|| comp.tail());
        let last = self.attrs(end_id)?;

        let strahler = required(first.strahler, "strahler", head)?;
        let h = strahler_depth(strahler);
        if h.is_none() {
            warn!(compartment = %comp.name, strahler, "未知 Strahler 等级，初始水深留空");
        }

        Ok(InitialConditions {
            mq: required(first.mean_discharge, "mean_discharge", head)?,
            h,
            start_x: required(first.x, "x", head)?,
            comp_length: comp_length(comp)?,
            zb_0: required(first.elevation, "elevation", head)?,
            zb_end: required(last.elevation, "elevation", end_id)?,
        })
    }
}

fn required<T>(value: Option<T>, field: &str, id: &CatchmentId) -> CwResult<T> {
    value.ok_or_else(|| CwError::invalid_input(format!("河段 {id} 缺少字段 {field}")))
}

fn comp_length(comp: &Compartment) -> CwResult<f64> {
    comp.length
        .ok_or_else(|| CwError::invalid_input(format!("分区 {} 未计算长度", comp.name)))
}
