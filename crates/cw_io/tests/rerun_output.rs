// crates/cw_io/tests/rerun_output.rs

//! 同一输出目录重复运行：较短的新运行不得混入旧运行的时间步

use cw_aggregate::{
    AggregationPlan, AggregationUnit, DischargeRule, MemoryStepStore, NamedPlan,
    ReshapeConverter, RunnerConfig, SourceRow, StepTable, TimestepRunner, GROUP_LATERAL_INPUT,
};
use cw_foundation::CatchmentId;
use cw_io::CsvAggregateStore;

fn source(steps: usize, load: f64) -> MemoryStepStore {
    let tables = (0..steps)
        .map(|step| StepTable::new(step, vec![SourceRow::new("a", 1.0, load)]).unwrap())
        .collect();
    MemoryStepStore::new(tables).unwrap()
}

fn lateral_plan() -> Vec<NamedPlan> {
    let plan = AggregationPlan::new(vec![AggregationUnit {
        name: "Ca".to_string(),
        discharge: DischargeRule::Summed,
        members: vec![CatchmentId::from("a")],
    }]);
    vec![NamedPlan::new(GROUP_LATERAL_INPUT, plan)]
}

#[test]
fn shorter_rerun_replaces_previous_steps() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("steps");
    let runner = TimestepRunner::new(&RunnerConfig { num_threads: 2 }).unwrap();

    let first = CsvAggregateStore::new(root.clone()).unwrap();
    runner.run(&source(5, 100.0), &lateral_plan(), &first).unwrap();

    let second = CsvAggregateStore::new(root.clone()).unwrap();
    let summary = runner.run(&source(2, 1.0), &lateral_plan(), &second).unwrap();
    assert_eq!(summary.steps, 2);

    let series = ReshapeConverter::new(2)
        .convert(&second, GROUP_LATERAL_INPUT, &["Ca".to_string()])
        .unwrap();
    let loads: Vec<f64> = series[0].rows.iter().map(|r| r.load_aggregated).collect();
    assert_eq!(loads, vec![1.0, 1.0]);
}
