use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, ensure, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use typist::config::TypingConfig;
use typist::output::{open_sink, resolve_backend, OutputBackend};
use typist::sequencer::generate_plan;
use typist::sim;
use typist::supervisor::{ExecutionMode, FnObserver, Settings, TypingSupervisor};
use typist::trigger::{self, TriggerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Auto,
    Console,
    X11,
}

impl BackendArg {
    fn to_library(self) -> OutputBackend {
        match self {
            BackendArg::Auto => OutputBackend::Auto,
            BackendArg::Console => OutputBackend::Console,
            BackendArg::X11 => OutputBackend::X11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TriggerArg {
    /// Start right after the countdown and exit when done.
    Now,
    /// Each Enter on stdin starts or stops typing; EOF quits.
    Stdin,
    /// F6 starts or stops typing (requires `--features hotkey`).
    Hotkey,
}

#[derive(Debug, Args, Clone)]
struct TuningArgs {
    /// JSON file with typing settings. Flags below override it.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Base speed in characters per minute (clamped to 50-500)
    #[arg(long, allow_negative_numbers = true)]
    speed: Option<i64>,

    /// Speed variance in characters per minute
    #[arg(long, allow_negative_numbers = true)]
    speed_variance: Option<i64>,

    /// Typo probability per character (0.0-1.0)
    #[arg(long)]
    error_rate: Option<f64>,

    /// Probability that a mistake is fixed promptly (0.0-1.0).
    ///
    /// Mistakes are always fixed; this only changes how quickly.
    #[arg(long)]
    correction_rate: Option<f64>,

    /// Doubled-keystroke probability per character (0.0-1.0)
    #[arg(long)]
    double_char_rate: Option<f64>,

    /// Adjacent-letter swap probability per word (0.0-1.0)
    #[arg(long)]
    swap_rate: Option<f64>,

    /// Thinking-pause probability before each word (0.0-1.0)
    #[arg(long)]
    pause_probability: Option<f64>,
}

impl TuningArgs {
    fn build(&self) -> Result<TypingConfig> {
        let mut cfg = match &self.config {
            Some(path) => TypingConfig::load(path)?,
            None => TypingConfig::default(),
        };
        if let Some(v) = self.speed {
            cfg.set_speed(v);
        }
        if let Some(v) = self.speed_variance {
            cfg.set_speed_variance(v);
        }
        if let Some(v) = self.error_rate {
            cfg.set_error_rate(v);
        }
        if let Some(v) = self.correction_rate {
            cfg.set_correction_rate(v);
        }
        if let Some(v) = self.double_char_rate {
            cfg.set_double_char_rate(v);
        }
        if let Some(v) = self.swap_rate {
            cfg.set_swap_rate(v);
        }
        if let Some(v) = self.pause_probability {
            cfg.set_pause_probability(v);
        }
        Ok(cfg)
    }
}

#[derive(Debug, Parser)]
#[command(name = "typist")]
#[command(about = "Types text like a person would: uneven pace, typos, and fixes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sequence text into a JSON action plan without typing it
    Plan {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Output plan file (defaults to stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Optional RNG seed (for debugging)
        #[arg(long)]
        seed: Option<u64>,

        /// Print the typing trace to stderr
        #[arg(long)]
        trace: bool,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Type text into the focused window (or the console)
    Run {
        /// Output backend.
        ///
        /// - auto: X11 when available, else console
        /// - console: simulate in this terminal
        /// - x11: inject keys via XTEST
        #[arg(long, value_enum, default_value_t = BackendArg::Auto)]
        backend: BackendArg,

        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// What starts the run
        #[arg(long, value_enum, default_value_t = TriggerArg::Now)]
        trigger: TriggerArg,

        /// Countdown seconds before typing starts
        #[arg(long, default_value_t = 3)]
        countdown: u64,

        /// Optional RNG seed (for debugging)
        #[arg(long)]
        seed: Option<u64>,

        /// Scale every delay (0 types instantly)
        #[arg(long, default_value_t = 1.0)]
        time_scale: f64,

        /// Disable console typing trace output
        #[arg(long)]
        no_trace: bool,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Print the effective settings as JSON
    Settings {
        #[arg(long, value_enum, default_value_t = BackendArg::Auto)]
        backend: BackendArg,

        #[command(flatten)]
        tuning: TuningArgs,
    },
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn init_tracing() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("typist=info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("failed to set global tracing subscriber: {e}"))
}

fn countdown(secs: u64) {
    if secs == 0 {
        return;
    }
    // Ctrl+C exits the process outright while nothing is running.
    eprintln!("Focus the target window. Starting in {secs}s...");
    for remaining in (1..=secs).rev() {
        eprintln!("{remaining}...");
        std::thread::sleep(Duration::from_secs(1));
    }
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Plan {
            input,
            output,
            seed,
            trace,
            tuning,
        } => {
            let text = read_input(&input)?;
            let cfg = tuning.build()?;
            let mut rng = rng_from_seed(seed);

            let plan = generate_plan(&text, &cfg, &mut rng)?;

            let stats = sim::stats(&plan.actions);
            eprintln!(
                "Planned: {} actions, {} keystrokes ({} backspaces), {} pauses, ~{:.1} min, effective {:.0} CPM",
                stats.actions,
                stats.keystrokes,
                stats.backspaces,
                stats.pauses,
                (stats.total_wait_ms as f64) / 1000.0 / 60.0,
                stats.effective_cpm(plan.text_len)
            );

            if trace {
                for event in typist::trace::plan_console_trace(&plan.actions) {
                    eprintln!("{}", event.line);
                }
            }

            let json = serde_json::to_string_pretty(&plan).context("failed to serialize plan")?;
            if let Some(out) = output {
                write_output(&out, &json)?;
            } else {
                println!("{json}");
            }
        }
        Command::Run {
            backend,
            input,
            trigger: trigger_arg,
            countdown: countdown_secs,
            seed,
            time_scale,
            no_trace,
            tuning,
        } => {
            // Fail fast on unsupported environments/backends.
            let backend = resolve_backend(backend.to_library())?;
            let stdin_is_input = input.as_os_str() == std::ffi::OsStr::new("-");
            ensure!(
                !(stdin_is_input && trigger_arg == TriggerArg::Stdin),
                "--trigger stdin cannot be combined with --input -"
            );

            let text = read_input(&input)?;
            let cfg = tuning.build()?;
            let sink = open_sink(backend)?;

            // Trigger-driven runs must stay stoppable while typing.
            let mode = match trigger_arg {
                TriggerArg::Now => ExecutionMode::for_backend(backend),
                TriggerArg::Stdin | TriggerArg::Hotkey => ExecutionMode::Background,
            };
            let mut supervisor = TypingSupervisor::from_boxed(sink, mode)
                .with_config(cfg)
                .with_time_scale(time_scale)
                // The console backend already shows what is typed.
                .with_trace(!no_trace && backend.injects_keys())
                .with_observer(FnObserver::new().on_progress(|done, total| {
                    debug!(done, total, "progress");
                }));
            if let Some(seed) = seed {
                supervisor = supervisor.with_seed(seed);
            }

            info!(settings = ?supervisor.current_settings(), "settings");
            trigger::install_ctrlc(supervisor.stop_handle())?;

            match trigger_arg {
                TriggerArg::Now => {
                    countdown(countdown_secs);
                    supervisor.start(&text)?;
                    if let Some(report) = supervisor.wait() {
                        if backend == OutputBackend::Console {
                            println!();
                        }
                        eprintln!(
                            "Typed {}/{} characters ({:?}), {} keystroke failures",
                            report.done, report.total, report.outcome, report.sink_failures
                        );
                    }
                }
                TriggerArg::Stdin => {
                    let (tx, rx) = crossbeam_channel::unbounded::<TriggerEvent>();
                    eprintln!("Press Enter to start or stop typing; Ctrl+D quits.");
                    trigger::spawn_line_trigger(io::BufReader::new(io::stdin()), tx)?;
                    trigger::drive_triggers(&supervisor, &text, &rx)?;
                }
                TriggerArg::Hotkey => {
                    let (tx, rx) = crossbeam_channel::unbounded::<TriggerEvent>();
                    trigger::spawn_hotkey_trigger(tx)?;
                    eprintln!("Press F6 to start or stop typing; Ctrl+C quits.");
                    trigger::drive_triggers(&supervisor, &text, &rx)?;
                }
            }
        }
        Command::Settings { backend, tuning } => {
            let backend = resolve_backend(backend.to_library())?;
            let settings = Settings::describe(
                &tuning.build()?,
                backend.label(),
                ExecutionMode::for_backend(backend),
            );
            let json =
                serde_json::to_string_pretty(&settings).context("failed to serialize settings")?;
            println!("{json}");
        }
    }

    Ok(())
}
