use crate::model::{self, ModelSpec};
use crate::sheet::{GeneratorSheet, Sheet};
use crate::sim::{SimError, SimTime, Simulation};

const MODEL_JSON: &str = r#"
{
    "schema_version": 1,
    "meta": { "name": "tiny feedforward" },
    "sheets": [
        {
            "kind": "generator",
            "name": "retina",
            "period": 2,
            "source": { "kind": "ramp", "step": 1.0 }
        },
        {
            "kind": "sheet",
            "name": "v1",
            "output_fns": [ { "kind": "clip", "lower": 0.0, "upper": 10.0 } ]
        }
    ],
    "connections": [
        { "src": "retina", "dest": "v1", "delay": 1 }
    ],
    "run": { "duration": 5 }
}
"#;

#[test]
fn model_spec_parses_and_builds_a_runnable_network() {
    let spec: ModelSpec = serde_json::from_str(MODEL_JSON).expect("parse model");
    assert_eq!(spec.schema_version, 1);
    assert_eq!(spec.sheets.len(), 2);
    assert_eq!(spec.sheets[0].name(), "retina");

    let mut sim = Simulation::new();
    model::build_model(&mut sim, &spec).expect("build model");
    assert!(sim.get_as::<GeneratorSheet>("retina").is_some());
    assert!(sim.get_as::<Sheet>("v1").is_some());
    assert_eq!(sim.connections().len(), 1);

    sim.run(SimTime(spec.run.expect("run spec").duration));

    let retina = sim.get_as::<GeneratorSheet>("retina").expect("retina");
    assert_eq!(retina.generated(), 3);
    let v1 = sim.get_as::<Sheet>("v1").expect("v1");
    assert_eq!(v1.activity().mean(), 6.0);
}

#[test]
fn schedule_with_unregistered_command_fails_to_build() {
    let mut spec: ModelSpec = serde_json::from_str(MODEL_JSON).expect("parse model");
    spec.schedule.push(crate::model::ScheduleSpec {
        at: 1,
        command: "missing".to_string(),
    });

    let mut sim = Simulation::new();
    let err = model::build_model(&mut sim, &spec).expect_err("unknown command");
    assert!(matches!(err, SimError::UnknownCommand(name) if name == "missing"));
}

#[test]
fn scheduled_command_runs_during_model_run() {
    let mut spec: ModelSpec = serde_json::from_str(MODEL_JSON).expect("parse model");
    spec.schedule.push(crate::model::ScheduleSpec {
        at: 3,
        command: "halve".to_string(),
    });

    let mut sim = Simulation::new();
    sim.register_command("halve", |sim| {
        if let Some(v1) = sim.get_as_mut::<Sheet>("v1") {
            v1.activity_mut().scale(0.5);
        }
        Ok(())
    });
    model::build_model(&mut sim, &spec).expect("build model");

    sim.run(SimTime(5));

    // 交付在 1、3、5 各累加 1、2、3；命令先于同时刻的交付入队，
    // t=3 时先折半（1 -> 0.5），再累加 2 和 3。
    let v1 = sim.get_as::<Sheet>("v1").expect("v1");
    assert_eq!(v1.activity().mean(), 5.5);
}

#[test]
fn summary_reports_sheets_sorted_by_name() {
    let spec: ModelSpec = serde_json::from_str(MODEL_JSON).expect("parse model");
    let mut sim = Simulation::new();
    model::build_model(&mut sim, &spec).expect("build model");
    sim.run(SimTime(5));

    let summary = model::summarize(&sim);
    assert_eq!(summary.final_time, 5);
    let names: Vec<&str> = summary.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["retina", "v1"]);
    assert_eq!(summary.sheets[0].generated, Some(3));
    assert_eq!(summary.sheets[1].generated, None);

    let json = serde_json::to_string(&summary).expect("serialize summary");
    let parsed: model::RunSummary = serde_json::from_str(&json).expect("parse summary");
    assert_eq!(parsed.final_time, summary.final_time);
    assert_eq!(parsed.sheets.len(), summary.sheets.len());
}
