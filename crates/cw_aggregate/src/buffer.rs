// crates/cw_aggregate/src/buffer.rs

//! 湖泊缓冲
//!
//! 假设湖泊完全混合：湖泊出口上游所有流域的负荷替换为其在全部时间步上的平均值。
//! 平均值 = 各时间步负荷之和 / 时间步数（某时间步缺失的流域按 0 计）。
//!
//! [`LakeBufferedSource`] 包装任意 [`StepSource`]，读取时替换负荷，不修改底层数据。

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::info;

use cw_foundation::{CatchmentId, CwResult, KahanSum};
use cw_network::UpstreamClosure;

use crate::runner::build_pool;
use crate::store::StepSource;
use crate::table::StepTable;

/// 湖泊出口上游的全部流域
pub fn lake_catchments(
    closure: &UpstreamClosure<'_>,
    lake_outlets: &[CatchmentId],
) -> CwResult<HashSet<CatchmentId>> {
    let sets = closure.upstream_dict(lake_outlets)?;
    Ok(sets.into_iter().flat_map(|s| s.ids).collect())
}

/// 带湖泊缓冲的源数据
pub struct LakeBufferedSource<S> {
    inner: S,
    means: HashMap<CatchmentId, f64>,
}

impl<S: StepSource> LakeBufferedSource<S> {
    /// 读取全部时间步计算平均负荷，`num_threads` 为 0 时使用默认线程数
    pub fn new(inner: S, buffered: &HashSet<CatchmentId>, num_threads: usize) -> CwResult<Self> {
        let steps = inner.step_count();
        info!("=== 湖泊缓冲: {} 个流域, {} 步 ===", buffered.len(), steps);

        let pool = build_pool(num_threads)?;
        let sums = pool.install(|| {
            (0..steps)
                .into_par_iter()
                .map(|step| -> CwResult<HashMap<CatchmentId, KahanSum>> {
                    let table = inner.read_step(step)?;
                    let mut partial = HashMap::new();
                    for row in table.rows() {
                        if buffered.contains(&row.catchment) {
                            partial
                                .entry(row.catchment.clone())
                                .or_insert_with(KahanSum::new)
                                .add(row.load);
                        }
                    }
                    Ok(partial)
                })
                .try_reduce(HashMap::new, |mut a, b| {
                    for (id, sum) in b {
                        a.entry(id).or_insert_with(KahanSum::new).merge(sum);
                    }
                    Ok(a)
                })
        })?;

        let means = if steps == 0 {
            HashMap::new()
        } else {
            sums.into_iter()
                .map(|(id, sum)| (id, sum.value() / steps as f64))
                .collect()
        };

        Ok(Self { inner, means })
    }

    /// 流域的平均负荷
    pub fn mean_load(&self, id: &CatchmentId) -> Option<f64> {
        self.means.get(id).copied()
    }
}

impl<S: StepSource> StepSource for LakeBufferedSource<S> {
    fn step_count(&self) -> usize {
        self.inner.step_count()
    }

    fn read_step(&self, step: usize) -> CwResult<StepTable> {
        let mut table = self.inner.read_step(step)?;
        table.replace_loads(&self.means);
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStepStore;
    use crate::table::SourceRow;
    use cw_foundation::Edge;
    use cw_network::{ConnectionMap, Direction};
    use parking_lot::Mutex;

    fn store() -> MemoryStepStore {
        let loads = [(4.0, 1.0), (0.0, 1.0), (2.0, 1.0)];
        let tables = loads
            .iter()
            .enumerate()
            .map(|(i, (lake, other))| {
                StepTable::new(
                    i,
                    vec![SourceRow::new("l", 1.0, *lake), SourceRow::new("o", 1.0, *other)],
                )
                .unwrap()
            })
            .collect();
        MemoryStepStore::new(tables).unwrap()
    }

    #[test]
    fn test_buffered_loads_are_means() {
        let buffered: HashSet<CatchmentId> = [CatchmentId::from("l")].into_iter().collect();
        let source = LakeBufferedSource::new(store(), &buffered, 2).unwrap();

        assert_eq!(source.mean_load(&"l".into()), Some(2.0));
        for step in 0..3 {
            let table = source.read_step(step).unwrap();
            assert_eq!(table.get(&"l".into()).unwrap().load, 2.0);
            assert_eq!(table.get(&"o".into()).unwrap().load, 1.0);
        }
    }

    /// 记录读取时所在线程池大小的源
    struct RecordingSource {
        inner: MemoryStepStore,
        seen: Mutex<Vec<usize>>,
    }

    impl StepSource for RecordingSource {
        fn step_count(&self) -> usize {
            self.inner.step_count()
        }

        fn read_step(&self, step: usize) -> CwResult<StepTable> {
            self.seen.lock().push(rayon::current_num_threads());
            self.inner.read_step(step)
        }
    }

    #[test]
    fn test_means_respect_thread_count() {
        let buffered: HashSet<CatchmentId> = [CatchmentId::from("l")].into_iter().collect();
        let source = RecordingSource {
            inner: store(),
            seen: Mutex::new(Vec::new()),
        };
        let buffered_source = LakeBufferedSource::new(source, &buffered, 1).unwrap();

        assert_eq!(buffered_source.mean_load(&"l".into()), Some(2.0));
        let seen = buffered_source.inner.seen.lock().clone();
        assert_eq!(seen, vec![1, 1, 1]);
    }

    #[test]
    fn test_lake_catchments_from_closure() {
        let edges = vec![
            Edge::new("a", "lake"),
            Edge::new("lake", "r"),
            Edge::new("b", "r"),
            Edge::new("r", "-9999"),
        ];
        let up = ConnectionMap::build(&edges, Direction::Upstream, None);
        let closure = UpstreamClosure::new(&up).unwrap();
        let ids = lake_catchments(&closure, &["lake".into()]).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&CatchmentId::from("a")));
        assert!(!ids.contains(&CatchmentId::from("b")));
    }
}
