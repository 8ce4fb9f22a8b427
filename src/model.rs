use serde::{Deserialize, Serialize};

use crate::sheet::{Clip, Constant, GeneratorSheet, Hysteresis, Ramp, Sheet, SheetCoords};
use crate::sim::{ConnectionParams, Port, SimError, SimTime, Simulation};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub schema_version: u32,
    #[serde(default)]
    pub meta: Option<ModelMeta>,
    pub sheets: Vec<SheetSpec>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
    #[serde(default)]
    pub schedule: Vec<ScheduleSpec>,
    #[serde(default)]
    pub run: Option<RunSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SheetSpec {
    Sheet {
        name: String,
        #[serde(default)]
        radius: Option<f64>,
        #[serde(default)]
        density: Option<f64>,
        #[serde(default)]
        output_fns: Vec<OutputFnSpec>,
    },
    Generator {
        name: String,
        #[serde(default)]
        radius: Option<f64>,
        #[serde(default)]
        density: Option<f64>,
        #[serde(default)]
        period: Option<u64>,
        #[serde(default)]
        phase: Option<u64>,
        #[serde(default)]
        source: Option<SourceSpec>,
        #[serde(default)]
        output_fns: Vec<OutputFnSpec>,
    },
}

impl SheetSpec {
    pub fn name(&self) -> &str {
        match self {
            SheetSpec::Sheet { name, .. } => name,
            SheetSpec::Generator { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    Constant { level: f64 },
    Ramp { step: f64 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputFnSpec {
    Clip { lower: f64, upper: f64 },
    Hysteresis { ratio: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub src: String,
    pub dest: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub src_port: Option<String>,
    #[serde(default)]
    pub dest_port: Option<String>,
    #[serde(default = "default_delay")]
    pub delay: u64,
}

fn default_delay() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSpec {
    pub at: u64,
    pub command: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RunSpec {
    pub duration: u64,
}

const DEFAULT_RADIUS: f64 = 0.5;
const DEFAULT_DENSITY: f64 = 10.0;
const DEFAULT_PERIOD: u64 = 1;

fn coords(radius: Option<f64>, density: Option<f64>) -> SheetCoords {
    SheetCoords::new(
        radius.unwrap_or(DEFAULT_RADIUS),
        density.unwrap_or(DEFAULT_DENSITY),
    )
}

fn build_sheet(spec: &SheetSpec, sim: &mut Simulation) {
    match spec {
        SheetSpec::Sheet {
            name,
            radius,
            density,
            output_fns,
        } => {
            let mut sheet = Sheet::new(coords(*radius, *density));
            for of in output_fns {
                sheet = match of {
                    OutputFnSpec::Clip { lower, upper } => sheet.with_output_fn(Clip {
                        lower: *lower,
                        upper: *upper,
                    }),
                    OutputFnSpec::Hysteresis { ratio } => {
                        sheet.with_output_fn(Hysteresis::new(*ratio))
                    }
                };
            }
            sim.register(name.clone(), Box::new(sheet));
        }
        SheetSpec::Generator {
            name,
            radius,
            density,
            period,
            phase,
            source,
            output_fns,
        } => {
            let coords = coords(*radius, *density);
            let period = SimTime(period.unwrap_or(DEFAULT_PERIOD));
            let phase = SimTime(phase.unwrap_or(0));
            let mut sheet = match source {
                Some(SourceSpec::Ramp { step }) => {
                    GeneratorSheet::new(coords, period, phase, Ramp::new(*step))
                }
                Some(SourceSpec::Constant { level }) => {
                    GeneratorSheet::new(coords, period, phase, Constant(*level))
                }
                None => GeneratorSheet::new(coords, period, phase, Constant::default()),
            };
            for of in output_fns {
                sheet = match of {
                    OutputFnSpec::Clip { lower, upper } => sheet.with_output_fn(Clip {
                        lower: *lower,
                        upper: *upper,
                    }),
                    OutputFnSpec::Hysteresis { ratio } => {
                        sheet.with_output_fn(Hysteresis::new(*ratio))
                    }
                };
            }
            sim.register(name.clone(), Box::new(sheet));
        }
    }
}

/// Build the described network into an existing simulation.
///
/// Commands referenced by `schedule` must already be registered on the
/// simulation, since `schedule_command` validates names eagerly.
pub fn build_model(sim: &mut Simulation, spec: &ModelSpec) -> Result<(), SimError> {
    for sheet in &spec.sheets {
        build_sheet(sheet, sim);
    }
    for c in &spec.connections {
        sim.connect(
            &c.src,
            &c.dest,
            ConnectionParams {
                name: c.name.clone(),
                src_port: c.src_port.as_deref().map(Port::new).unwrap_or_default(),
                dest_port: c.dest_port.as_deref().map(Port::new).unwrap_or_default(),
                delay: SimTime(c.delay),
                private: false,
            },
        )?;
    }
    for s in &spec.schedule {
        sim.schedule_command(SimTime(s.at), s.command.clone())?;
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub final_time: u64,
    pub pending_events: usize,
    pub sheets: Vec<SheetSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetSummary {
    pub name: String,
    pub mean_activity: f64,
    #[serde(default)]
    pub generated: Option<u64>,
}

/// Snapshot the per-sheet state of a simulation after a run.
pub fn summarize(sim: &Simulation) -> RunSummary {
    let mut sheets: Vec<SheetSummary> = sim
        .objects_of::<Sheet>()
        .map(|(name, s)| SheetSummary {
            name: name.to_string(),
            mean_activity: s.activity().mean(),
            generated: None,
        })
        .chain(sim.objects_of::<GeneratorSheet>().map(|(name, g)| {
            SheetSummary {
                name: name.to_string(),
                mean_activity: g.activity().mean(),
                generated: Some(g.generated()),
            }
        }))
        .collect();
    sheets.sort_by(|a, b| a.name.cmp(&b.name));

    RunSummary {
        final_time: sim.now().0,
        pending_events: sim.queue_len(),
        sheets,
    }
}
