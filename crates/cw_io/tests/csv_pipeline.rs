// crates/cw_io/tests/csv_pipeline.rs

//! 从 CSV 目录到逐分区时间序列的完整流程

use std::path::Path;

use cw_aggregate::{
    AggregationPlan, NamedPlan, ReshapeConverter, RunnerConfig, TimestepRunner,
    GROUP_LATERAL_INPUT, GROUP_UPSTREAM_INPUT,
};
use cw_config::{CatchmentColumns, SegmentColumns, StepColumns};
use cw_io::{
    read_catchments, read_segments, step_file_name, write_compartments, write_links,
    write_membership, write_unit_series, CsvAggregateStore, CsvStepStore,
};
use cw_network::{ModelOptions, RiverNetwork};

/// 网络: a -> c, b -> c, c -> d -> -9999；支流 ta -> a, tc -> c
fn write_inputs(dir: &Path) {
    std::fs::write(
        dir.join("catchments.csv"),
        "WSO1_ID,NEXTDOWNID,AREA\n\
         a,c,1\nb,c,1\nc,d,1\nd,-9999,1\nta,a,2\ntc,c,3\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("segments.csv"),
        "WSO1_ID,LENGTH\na,100\nb,100\nc,100\nd,100\n",
    )
    .unwrap();

    let steps = dir.join("steps");
    std::fs::create_dir_all(&steps).unwrap();
    for step in 0..4 {
        let load = step as f64;
        let content = format!(
            "catchment,discharge,load\n\
             a,3,{l}\nb,2,{l}\nc,9,{l}\nd,14,{l}\nta,1,1\ntc,2,1\n",
            l = load
        );
        std::fs::write(steps.join(step_file_name(step)), content).unwrap();
    }
}

#[test]
fn csv_directories_produce_compartment_series() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let catchments =
        read_catchments(&dir.path().join("catchments.csv"), &CatchmentColumns::default()).unwrap();
    let segments =
        read_segments(&dir.path().join("segments.csv"), &SegmentColumns::default()).unwrap();
    let model = RiverNetwork::build(
        &catchments,
        &segments,
        ModelOptions {
            nr_compartments: 3,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(model.partition.len(), 3);

    let source = CsvStepStore::open(dir.path().join("steps"), StepColumns::default()).unwrap();
    let store = CsvAggregateStore::new(dir.path().join("aggregated")).unwrap();
    let lateral = AggregationPlan::compartment_lateral(&model.links);
    let units = lateral.unit_names();
    let plans = vec![
        NamedPlan::new(GROUP_UPSTREAM_INPUT, AggregationPlan::compartment_upstream(&model.links)),
        NamedPlan::new(GROUP_LATERAL_INPUT, lateral),
    ];
    let summary = TimestepRunner::new(&RunnerConfig { num_threads: 2 })
        .unwrap()
        .run(&source, &plans, &store)
        .unwrap();
    assert_eq!(summary.steps, 4);

    let series = ReshapeConverter::new(2)
        .convert(&store, GROUP_LATERAL_INPUT, &units)
        .unwrap();
    let out = dir.path().join("output");
    let paths = write_unit_series(&out.join(GROUP_LATERAL_INPUT), &series).unwrap();
    assert_eq!(paths.len(), 3);

    // Cc 的侧向输入 {c, d}（tc 在首河段汇入，属于上游输入）: 负荷 = 2 * step
    let cc = std::fs::read_to_string(out.join(GROUP_LATERAL_INPUT).join("Cc.csv")).unwrap();
    let loads: Vec<f64> = cc
        .lines()
        .skip(1)
        .map(|l| l.split(',').nth(2).unwrap().parse().unwrap())
        .collect();
    assert_eq!(loads, vec![0.0, 2.0, 4.0, 6.0]);

    assert_eq!(write_links(&out.join("links.csv"), model.links.links()).unwrap(), 2);
    assert_eq!(write_compartments(&out.join("compartments.csv"), &model.partition).unwrap(), 4);
    let lateral_members = model.links.lateral_membership();
    assert_eq!(
        write_membership(&out.join("lateral_membership.csv"), &lateral_members).unwrap(),
        lateral_members.len()
    );
}
