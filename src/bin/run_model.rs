//! 模型文件仿真
//!
//! 读取 model.json，构建 sheet 网络并运行，输出运行摘要

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use neurosim_rs::model::{self, ModelSpec};
use neurosim_rs::sim::{EventKind, SimTime, Simulation};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "run-model", about = "Run model.json on the neurosim-rs kernel")]
struct Args {
    /// Path to model.json
    #[arg(long)]
    model: PathBuf,

    /// Output summary JSON file
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// 覆盖模型里的运行时长（tick）
    #[arg(long)]
    duration: Option<u64>,
}

fn register_builtin_commands(sim: &mut Simulation) {
    // 模型文件可调度的内置命令。
    sim.register_command("clear_deliveries", |sim| {
        sim.clear_pending(EventKind::Delivery);
        Ok(())
    });
    sim.register_command("report", |sim| {
        info!(now = ?sim.now(), queue_size = sim.queue_len(), "报告当前状态");
        Ok(())
    });
}

fn main() {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let raw = fs::read_to_string(&args.model).expect("read model file");
    let spec: ModelSpec = serde_json::from_str(&raw).expect("parse model file");

    let mut sim = Simulation::new();
    register_builtin_commands(&mut sim);
    model::build_model(&mut sim, &spec).expect("build model");

    let duration = args
        .duration
        .or(spec.run.map(|r| r.duration))
        .unwrap_or(10);
    sim.run(SimTime(duration));

    let summary = model::summarize(&sim);
    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&summary).expect("serialize summary");
        fs::write(path, json).expect("write summary file");
    }

    println!(
        "done @ {:?}, sheets={}, pending_events={}",
        sim.now(),
        summary.sheets.len(),
        summary.pending_events
    );
}
