// crates/cw_io/src/export.rs

//! CSV 导出
//!
//! | 文件 | 列 |
//! |------|----|
//! | 连接表 | `name, from, to` |
//! | 分区表 | `compartment, position, catchment` |
//! | 成员表 | `catchment, compartment` |
//! | 单元时间序列 | `timestep, discharge, load_aggregated, local_discharge_aggregated` |
//! | 参数化 | `x, width, kst, zb` |
//! | 初始条件 | `compartment, mq, h, start_x, comp_length, zb_0, zb_end` |

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use cw_aggregate::UnitSeries;
use cw_foundation::{CatchmentId, CwResult};
use cw_network::{CompartmentLink, InitialConditions, Partition, ProfilePoint};

use crate::error::{csv_error, io_error};

/// 写入一张表，父目录不存在时创建
pub fn write_rows<T, I>(path: &Path, rows: I) -> CwResult<usize>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, "创建目录", e))?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    let mut count = 0;
    for row in rows {
        writer.serialize(row).map_err(|e| csv_error(path, e))?;
        count += 1;
    }
    writer.flush().map_err(|e| io_error(path, "写入", e))?;
    debug!("写入 {}: {} 行", path.display(), count);
    Ok(count)
}

/// 写入分区连接表
pub fn write_links(path: &Path, links: &[CompartmentLink]) -> CwResult<usize> {
    write_rows(path, links)
}

#[derive(Serialize)]
struct CompartmentRow<'a> {
    compartment: &'a str,
    position: usize,
    catchment: &'a str,
}

/// 写入分区表，每个河段一行，按分区内自上游向下游的位置排列
pub fn write_compartments(path: &Path, partition: &Partition) -> CwResult<usize> {
    let rows = partition.iter().flat_map(|comp| {
        comp.ids
            .iter()
            .enumerate()
            .map(move |(position, id)| CompartmentRow {
                compartment: &comp.name,
                position,
                catchment: id.as_str(),
            })
    });
    write_rows(path, rows)
}

#[derive(Serialize)]
struct MembershipRow<'a> {
    catchment: &'a str,
    compartment: &'a str,
}

/// 写入流域 -> 分区成员表
pub fn write_membership(path: &Path, membership: &[(CatchmentId, String)]) -> CwResult<usize> {
    write_rows(
        path,
        membership.iter().map(|(id, comp)| MembershipRow {
            catchment: id.as_str(),
            compartment: comp,
        }),
    )
}

#[derive(Serialize)]
struct SeriesCsvRow {
    timestep: usize,
    discharge: f64,
    load_aggregated: f64,
    local_discharge_aggregated: Option<f64>,
}

/// 写入各单元的时间序列，每个单元一个 `<unit>.csv`
pub fn write_unit_series(dir: &Path, series: &[UnitSeries]) -> CwResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|e| io_error(dir, "创建目录", e))?;
    series
        .iter()
        .map(|s| {
            let path = dir.join(format!("{}.csv", s.unit));
            write_rows(
                &path,
                s.rows.iter().map(|r| SeriesCsvRow {
                    timestep: r.timestep,
                    discharge: r.discharge,
                    load_aggregated: r.load_aggregated,
                    local_discharge_aggregated: r.local_discharge_aggregated,
                }),
            )?;
            Ok(path)
        })
        .collect()
}

/// 写入单个分区的纵剖面参数
pub fn write_parameterization(path: &Path, points: &[ProfilePoint]) -> CwResult<usize> {
    write_rows(path, points)
}

#[derive(Serialize)]
struct InitialRow<'a> {
    compartment: &'a str,
    mq: f64,
    h: Option<f64>,
    start_x: f64,
    comp_length: f64,
    zb_0: f64,
    zb_end: f64,
}

/// 写入初始条件表
pub fn write_initial_conditions(
    path: &Path,
    conditions: &[(String, InitialConditions)],
) -> CwResult<usize> {
    write_rows(
        path,
        conditions.iter().map(|(name, ic)| InitialRow {
            compartment: name,
            mq: ic.mq,
            h: ic.h,
            start_x: ic.start_x,
            comp_length: ic.comp_length,
            zb_0: ic.zb_0,
            zb_end: ic.zb_end,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_aggregate::SeriesRow;

    #[test]
    fn test_write_links() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.csv");
        let links = vec![CompartmentLink {
            name: "L1".into(),
            from: "C1".into(),
            to: "C3".into(),
        }];
        assert_eq!(write_links(&path, &links).unwrap(), 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "name,from,to\nL1,C1,C3\n");
    }

    #[test]
    fn test_write_membership_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/lateral.csv");
        let rows = vec![(CatchmentId::from("7"), "C3".to_string())];
        write_membership(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "catchment,compartment\n7,C3\n");
    }

    #[test]
    fn test_write_unit_series_keeps_empty_local_column() {
        let dir = tempfile::tempdir().unwrap();
        let series = vec![UnitSeries {
            unit: "C1".into(),
            rows: vec![
                SeriesRow {
                    timestep: 0,
                    discharge: 1.0,
                    load_aggregated: 2.0,
                    local_discharge_aggregated: None,
                },
                SeriesRow {
                    timestep: 1,
                    discharge: 1.5,
                    load_aggregated: 2.5,
                    local_discharge_aggregated: Some(0.5),
                },
            ],
        }];
        let paths = write_unit_series(dir.path(), &series).unwrap();
        assert_eq!(paths, vec![dir.path().join("C1.csv")]);
        let text = std::fs::read_to_string(&paths[0]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "timestep,discharge,load_aggregated,local_discharge_aggregated"
        );
        assert_eq!(lines[1], "0,1.0,2.0,");
        assert_eq!(lines[2], "1,1.5,2.5,0.5");
    }

    #[test]
    fn test_write_initial_conditions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("initial.csv");
        let ic = InitialConditions {
            mq: 1.0,
            h: None,
            start_x: 100.0,
            comp_length: 50.0,
            zb_0: 10.0,
            zb_end: 9.0,
        };
        write_initial_conditions(&path, &[("C1".into(), ic)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("compartment,mq,h,start_x,comp_length,zb_0,zb_end\n"));
        assert!(text.contains("C1,1.0,,100.0,50.0,10.0,9.0"));
    }
}
