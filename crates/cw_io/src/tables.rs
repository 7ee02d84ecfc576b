// crates/cw_io/src/tables.rs

//! 流域表与河段表读取
//!
//! 支持格式示例：
//! ```csv
//! WSO1_ID,NEXTDOWNID,AREA
//! 101,103,12.5
//! 103,-9999,40.0
//! ```

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use cw_config::{CatchmentColumns, SegmentColumns};
use cw_foundation::{CwResult, Edge};
use cw_network::{CatchmentTable, SegmentAttributes, SegmentTable};

use crate::error::csv_error;
use crate::reader::{open, Header, Row};

/// 读取完整流域表
///
/// 面积列可缺省；缺省或单元格为空的流域没有面积，排序时按 0 处理。
pub fn read_catchments(path: &Path, columns: &CatchmentColumns) -> CwResult<CatchmentTable> {
    let mut reader = open(path)?;
    let header = Header::read(path, &mut reader)?;
    let id_idx = header.required(&columns.id)?;
    let next_idx = header.required(&columns.next_id)?;
    let area_idx = header.optional(&columns.area);
    if area_idx.is_none() {
        warn!("{} 中没有面积列 '{}'", path.display(), columns.area);
    }

    let mut edges = Vec::new();
    let mut areas = HashMap::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let row = Row::new(path, record, row_idx + 2);
        let id = row.id(id_idx, &columns.id)?;
        let next = row.id(next_idx, &columns.next_id)?;
        if let Some(area) = row.opt_f64(area_idx, &columns.area)? {
            areas.insert(id.clone(), area);
        }
        edges.push(Edge::new(id, next));
    }

    info!("读取流域表 {}: {} 行", path.display(), edges.len());
    CatchmentTable::with_areas(edges, areas)
}

/// 读取河段表
///
/// 只有 ID 列必需，其余属性列缺省时对应属性为空。
pub fn read_segments(path: &Path, columns: &SegmentColumns) -> CwResult<SegmentTable> {
    let mut reader = open(path)?;
    let header = Header::read(path, &mut reader)?;
    let id_idx = header.required(&columns.id)?;
    let length = header.optional(&columns.length);
    let x = header.optional(&columns.x);
    let elevation = header.optional(&columns.elevation);
    let width = header.optional(&columns.width);
    let kst = header.optional(&columns.kst);
    let strahler = header.optional(&columns.strahler);
    let mq = header.optional(&columns.mean_discharge);
    if length.is_none() {
        warn!("{} 中没有长度列 '{}'", path.display(), columns.length);
    }

    let mut rows = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let row = Row::new(path, record, row_idx + 2);
        let id = row.id(id_idx, &columns.id)?;
        let attrs = SegmentAttributes {
            length: row.opt_f64(length, &columns.length)?,
            x: row.opt_f64(x, &columns.x)?,
            elevation: row.opt_f64(elevation, &columns.elevation)?,
            width: row.opt_f64(width, &columns.width)?,
            kst: row.opt_f64(kst, &columns.kst)?,
            strahler: row.opt_u32(strahler, &columns.strahler)?,
            mean_discharge: row.opt_f64(mq, &columns.mean_discharge)?,
        };
        rows.push((id, attrs));
    }

    info!("读取河段表 {}: {} 行", path.display(), rows.len());
    SegmentTable::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_foundation::{CatchmentId, CwError};
    use std::io::Write;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_catchments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "c.csv",
            "WSO1_ID,NEXTDOWNID,AREA\n101,103,12.5\n102.0,103,\n103,-9999,40\n",
        );
        let table = read_catchments(&path, &CatchmentColumns::default()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.edges()[1].id.as_str(), "102");
        assert!(table.edges()[2].is_terminal());
        assert_eq!(table.area(&CatchmentId::from("101")), Some(12.5));
        assert_eq!(table.area(&CatchmentId::from("102")), None);
    }

    #[test]
    fn test_read_catchments_without_area_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "c.csv", "wso1_id,nextdownid\n1,-9999\n");
        let table = read_catchments(&path, &CatchmentColumns::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.area(&CatchmentId::from("1")), None);
    }

    #[test]
    fn test_read_catchments_bad_area_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "c.csv",
            "WSO1_ID,NEXTDOWNID,AREA\n1,2,3\n2,-9999,big\n",
        );
        let err = read_catchments(&path, &CatchmentColumns::default()).unwrap_err();
        assert!(matches!(err, CwError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_read_catchments_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "c.csv", "WSO1_ID,AREA\n1,3\n");
        assert!(read_catchments(&path, &CatchmentColumns::default()).is_err());
    }

    #[test]
    fn test_read_segments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "s.csv",
            "WSO1_ID,LENGTH,X,ELEV,WIDTH,Kst,STRAHLER,MQ\n\
             1,1000,5000,120.5,8,30,2.0,1.5\n\
             2,500,4000,,8,30,,\n",
        );
        let table = read_segments(&path, &SegmentColumns::default()).unwrap();
        assert_eq!(table.network().len(), 2);
        let a = table.attributes(&CatchmentId::from("1")).unwrap();
        assert_eq!(a.strahler, Some(2));
        assert_eq!(a.elevation, Some(120.5));
        let b = table.attributes(&CatchmentId::from("2")).unwrap();
        assert_eq!(b.elevation, None);
        assert_eq!(b.mean_discharge, None);
        assert_eq!(table.length(&CatchmentId::from("2")), Some(500.0));
    }

    #[test]
    fn test_read_segments_rejects_negative_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "s.csv", "WSO1_ID,LENGTH\n1,-5\n");
        let err = read_segments(&path, &SegmentColumns::default()).unwrap_err();
        assert!(matches!(err, CwError::InvalidValue { field: "length", .. }));
    }
}
