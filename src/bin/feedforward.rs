//! 前馈网络仿真
//!
//! 运行 generator -> cortex 前馈网络的周期激励示例

use clap::Parser;
use neurosim_rs::sheet::{GeneratorSheet, Ramp, Sheet, SheetCoords};
use neurosim_rs::sim::{ConnectionParams, SimTime, Simulation};

#[derive(Debug, Parser)]
#[command(name = "feedforward", about = "前馈网络仿真：retina -> cortex 周期激励")]
struct Args {
    /// 生成周期（tick）
    #[arg(long, default_value_t = 3)]
    period: u64,
    /// 首次生成前的相位（tick）
    #[arg(long, default_value_t = 1)]
    phase: u64,
    /// 连接延迟（tick）
    #[arg(long, default_value_t = 1)]
    delay: u64,
    #[arg(long, default_value_t = 0.5)]
    radius: f64,
    #[arg(long, default_value_t = 10.0)]
    density: f64,
    /// 仿真运行时长（tick）
    #[arg(long, default_value_t = 30)]
    duration: u64,
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

    let mut sim = Simulation::new();
    let coords = SheetCoords::new(args.radius, args.density);

    sim.register(
        "retina",
        Box::new(GeneratorSheet::new(
            coords,
            SimTime(args.period),
            SimTime(args.phase),
            Ramp::new(1.0),
        )),
    );
    sim.register("cortex", Box::new(Sheet::new(coords)));
    sim.connect(
        "retina",
        "cortex",
        ConnectionParams {
            delay: SimTime(args.delay),
            ..ConnectionParams::default()
        },
    )
    .expect("connect retina -> cortex");

    sim.run(SimTime(args.duration));

    let retina = sim
        .get_as::<GeneratorSheet>("retina")
        .expect("retina exists");
    let cortex = sim.get_as::<Sheet>("cortex").expect("cortex exists");
    println!(
        "done @ {:?}, generated={}, cortex_mean={:.4}",
        sim.now(),
        retina.generated(),
        cortex.activity().mean()
    );
}
