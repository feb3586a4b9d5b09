use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crossbeam::channel::Sender;
use rand::SeedableRng;
use rand::rngs::StdRng;
use saccrec_acquisition::{WorkerOptions, list_ports};
use saccrec_core::{Settings, Subject};
use saccrec_recording::{
    AutoContinue, ChannelInput, OperatorInput, OperatorSignal, RecordAssembler,
    RecordingController, RunOutcome,
};
use saccrec_stimulus::{Protocol, SaccadicSchedule};
use saccrec_timing::HighPrecisionTimer;

#[derive(Parser, Debug)]
#[command(name = "saccrec", version, about = "Saccadic eye-movement test recorder")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports the board may be attached to
    Ports {
        /// Report the fixed simulation ports
        #[arg(long)]
        simulate: bool,
    },
    /// Run a protocol and write the study record
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Settings JSON; defaults apply when omitted
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Protocol JSON listing the tests
    #[arg(long)]
    protocol: PathBuf,

    /// Subject JSON
    #[arg(long)]
    subject: PathBuf,

    /// Study record to write, must end in .rec
    #[arg(long)]
    output: PathBuf,

    /// Use the synthetic board
    #[arg(long)]
    simulate: bool,

    /// Start every test without waiting for the operator
    #[arg(long)]
    auto: bool,

    /// Seed for the fixation randomization
    #[arg(long)]
    seed: Option<u64>,
}

pub struct App {
    cli: Cli,
}

impl App {
    pub fn new() -> Result<Self> {
        Ok(Self { cli: Cli::parse() })
    }

    pub fn run(self) -> Result<()> {
        match self.cli.command {
            Command::Ports { simulate } => {
                let ports = list_ports(simulate);
                if ports.is_empty() {
                    println!("no serial ports found");
                }
                for port in ports {
                    println!("{port}");
                }
                Ok(())
            }
            Command::Run(args) => run_session(args),
        }
    }
}

fn run_session(args: RunArgs) -> Result<()> {
    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if args.simulate {
        settings.hardware.simulated = true;
    }

    let protocol = Protocol::load(&args.protocol)
        .with_context(|| format!("loading protocol from {}", args.protocol.display()))?;
    let subject = load_subject(&args.subject)?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let distance = protocol.distance_to_subject(settings.stimulus.saccadic_distance_cm)?;
    let schedules = protocol.build_schedules(&settings, &mut rng)?;
    tracing::info!(
        distance_cm = format_args!("{distance:.1}"),
        tests = schedules.len(),
        "seat the subject at the given distance from the screen"
    );

    let assembler = RecordAssembler::new(subject, settings.hardware_snapshot());
    let options = WorkerOptions::from_settings(&settings.hardware);

    let outcome = if args.auto {
        record(AutoContinue, options, schedules, &args.output, assembler)?
    } else {
        let (signals, input) = ChannelInput::new();
        spawn_key_reader(signals);
        println!("Press Enter to start each test, q then Enter to abort.");
        record(input, options, schedules, &args.output, assembler)?
    };

    match outcome {
        RunOutcome::Completed(record) => {
            println!(
                "Saved {} tests for {} to {}",
                record.tests.len(),
                record.subject.full_name,
                args.output.display()
            );
        }
        RunOutcome::Cancelled { completed_tests } => {
            println!("Cancelled after {completed_tests} completed tests; no record written");
        }
    }
    Ok(())
}

fn record<I: OperatorInput>(
    input: I,
    options: WorkerOptions,
    schedules: Vec<SaccadicSchedule>,
    output: &Path,
    assembler: RecordAssembler,
) -> Result<RunOutcome> {
    let mut received = 0usize;
    let mut controller = RecordingController::new(HighPrecisionTimer::new(), input, options)
        .with_sink(move |samples| {
            received += samples.len();
            tracing::trace!(batch = samples.len(), received, "samples");
        });

    let result = controller.run(schedules, output, assembler);
    controller.shutdown().context("stopping acquisition")?;
    result.with_context(|| format!("recording {}", output.display()))
}

fn load_subject(path: &Path) -> Result<Subject> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading subject from {}", path.display()))?;
    Subject::from_json_str(&text).with_context(|| format!("invalid subject in {}", path.display()))
}

fn spawn_key_reader(signals: Sender<OperatorSignal>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let signal = if line.trim().eq_ignore_ascii_case("q") {
                OperatorSignal::Abort
            } else {
                OperatorSignal::Continue
            };
            if signals.send(signal).is_err() {
                break;
            }
        }
    });
}
