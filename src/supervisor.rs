use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::TypingConfig;
use crate::model::{Action, ActionKind};
use crate::output::util::{print_trace_line, sleep_interruptible};
use crate::output::{KeyOutputSink, OutputBackend};
use crate::sequencer::Sequencer;
use crate::trace::PlaybackTracer;

/// Largest accepted delay multiplier.
pub const MAX_TIME_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    Idle,
    Running,
    Cancelling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// `start` returns as soon as the run thread is spawned.
    Background,
    /// `start` waits for the run to finish.
    Blocking,
}

impl ExecutionMode {
    /// Simulation-only backends have nothing to run alongside, so they block.
    pub fn for_backend(backend: OutputBackend) -> Self {
        if backend.injects_keys() {
            ExecutionMode::Background
        } else {
            ExecutionMode::Blocking
        }
    }
}

/// Lifecycle and progress callbacks.
///
/// All methods are invoked on the run's own thread, never on the thread that
/// called `start`.
pub trait TypingObserver: Send + Sync {
    fn on_start(&self) {}

    fn on_stop(&self) {}

    /// `done` counts characters of the target text, so corrections never
    /// inflate it; `total` is the target length in characters.
    fn on_progress(&self, _done: usize, _total: usize) {}
}

impl<T: TypingObserver + ?Sized> TypingObserver for Arc<T> {
    fn on_start(&self) {
        (**self).on_start()
    }

    fn on_stop(&self) {
        (**self).on_stop()
    }

    fn on_progress(&self, done: usize, total: usize) {
        (**self).on_progress(done, total)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TypingObserver for NoopObserver {}

type Callback = Box<dyn Fn() + Send + Sync>;
type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Observer assembled from closures.
#[derive(Default)]
pub struct FnObserver {
    on_start: Option<Callback>,
    on_stop: Option<Callback>,
    on_progress: Option<ProgressCallback>,
}

impl FnObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    pub fn on_stop(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_stop = Some(Box::new(f));
        self
    }

    pub fn on_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }
}

impl TypingObserver for FnObserver {
    fn on_start(&self) {
        if let Some(f) = &self.on_start {
            f();
        }
    }

    fn on_stop(&self) {
        if let Some(f) = &self.on_stop {
            f();
        }
    }

    fn on_progress(&self, done: usize, total: usize) {
        if let Some(f) = &self.on_progress {
            f(done, total);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Cancelled,
    Faulted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub done: usize,
    pub total: usize,
    pub actions_executed: usize,
    pub sink_failures: usize,
}

/// An unexpected failure inside a run, e.g. a panicking sink or observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFault {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub speed: u32,
    pub speed_variance: u32,
    pub error_rate: f64,
    pub correction_rate: f64,
    pub double_char_rate: f64,
    pub swap_rate: f64,
    pub pause_probability: f64,
    pub sink: &'static str,
    pub mode: &'static str,
    pub platform: &'static str,
}

impl Settings {
    /// Summary for a sink that need not be open, e.g. before connecting to X11.
    pub fn describe(cfg: &TypingConfig, sink: &'static str, mode: ExecutionMode) -> Self {
        Self {
            speed: cfg.base_speed_cpm(),
            speed_variance: cfg.speed_variance_cpm(),
            error_rate: cfg.typo_probability(),
            correction_rate: cfg.correction_probability(),
            double_char_rate: cfg.double_char_probability(),
            swap_rate: cfg.char_swap_probability(),
            pause_probability: cfg.pause_probability(),
            sink,
            mode: match mode {
                ExecutionMode::Background => "background",
                ExecutionMode::Blocking => "blocking",
            },
            platform: std::env::consts::OS,
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<SupervisorState>,
    cancel: AtomicBool,
}

impl Shared {
    fn request_stop(&self) -> bool {
        let mut state = self.state.lock();
        if *state != SupervisorState::Running {
            return false;
        }
        self.cancel.store(true, Ordering::SeqCst);
        *state = SupervisorState::Cancelling;
        true
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Cloneable handle that can cancel the active run from anywhere, including
/// signal handlers and observer callbacks.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Returns whether a running run was asked to stop. A no-op otherwise.
    pub fn request_stop(&self) -> bool {
        self.shared.request_stop()
    }

    pub fn state(&self) -> SupervisorState {
        *self.shared.state.lock()
    }
}

type SharedSink = Arc<Mutex<Box<dyn KeyOutputSink>>>;

/// Runs sequenced text against a [`KeyOutputSink`] on a background thread.
///
/// States move `Idle -> Running -> Idle`, or `Running -> Cancelling -> Idle`
/// after [`request_stop`](Self::request_stop). Only one run exists at a time.
pub struct TypingSupervisor {
    shared: Arc<Shared>,
    sink: SharedSink,
    observer: Mutex<Arc<dyn TypingObserver>>,
    config: Mutex<TypingConfig>,
    mode: ExecutionMode,
    seed: Option<u64>,
    time_scale: f64,
    trace: bool,
    handle: Mutex<Option<JoinHandle<RunReport>>>,
    last_report: Mutex<Option<RunReport>>,
    faults_tx: Sender<RunFault>,
    faults_rx: Receiver<RunFault>,
}

impl TypingSupervisor {
    pub fn new(sink: impl KeyOutputSink + 'static, mode: ExecutionMode) -> Self {
        Self::from_boxed(Box::new(sink), mode)
    }

    pub fn from_boxed(sink: Box<dyn KeyOutputSink>, mode: ExecutionMode) -> Self {
        let (faults_tx, faults_rx) = crossbeam_channel::unbounded();
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SupervisorState::Idle),
                cancel: AtomicBool::new(false),
            }),
            sink: Arc::new(Mutex::new(sink)),
            observer: Mutex::new(Arc::new(NoopObserver)),
            config: Mutex::new(TypingConfig::default()),
            mode,
            seed: None,
            time_scale: 1.0,
            trace: false,
            handle: Mutex::new(None),
            last_report: Mutex::new(None),
            faults_tx,
            faults_rx,
        }
    }

    pub fn with_config(self, cfg: TypingConfig) -> Self {
        *self.config.lock() = cfg;
        self
    }

    /// Every run seeds its RNG from `seed`, making runs reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Multiply every delay by `scale`, capped at [`MAX_TIME_SCALE`]; 0 runs
    /// without sleeping.
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        self.time_scale = if scale.is_finite() {
            scale.clamp(0.0, MAX_TIME_SCALE)
        } else {
            1.0
        };
        self
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Print "Typing"/"Replace" trace lines to stderr while running.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_observer(self, observer: impl TypingObserver + 'static) -> Self {
        self.set_observer(Arc::new(observer));
        self
    }

    /// Takes effect from the next run.
    pub fn set_observer(&self, observer: Arc<dyn TypingObserver>) {
        *self.observer.lock() = observer;
    }

    pub fn config(&self) -> TypingConfig {
        self.config.lock().clone()
    }

    /// Replace the configuration. A run already in flight keeps the snapshot
    /// it started with.
    pub fn set_config(&self, cfg: TypingConfig) {
        *self.config.lock() = cfg;
    }

    pub fn update_config(&self, f: impl FnOnce(&mut TypingConfig)) {
        f(&mut self.config.lock());
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn state(&self) -> SupervisorState {
        *self.shared.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() != SupervisorState::Idle
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: self.shared.clone(),
        }
    }

    /// Faults from runs that ended unexpectedly.
    pub fn faults(&self) -> Receiver<RunFault> {
        self.faults_rx.clone()
    }

    pub fn current_settings(&self) -> Settings {
        Settings::describe(&self.config(), self.sink.lock().name(), self.mode)
    }

    /// Start typing `text`. Returns `false` without doing anything when a run is
    /// already active.
    pub fn start(&self, text: &str) -> Result<bool> {
        {
            let mut state = self.shared.state.lock();
            if *state != SupervisorState::Idle {
                debug!(state = ?*state, "start ignored; a run is already active");
                return Ok(false);
            }
            *state = SupervisorState::Running;
            self.shared.cancel.store(false, Ordering::SeqCst);
        }

        // The previous run is over once the state is Idle; collect its report.
        self.reap_finished();

        let run = Run {
            shared: self.shared.clone(),
            sink: self.sink.clone(),
            observer: self.observer.lock().clone(),
            config: self.config(),
            seed: self.seed,
            time_scale: self.time_scale,
            trace: self.trace,
            faults: self.faults_tx.clone(),
            text: text.to_string(),
        };

        let spawned = std::thread::Builder::new()
            .name("typist-run".to_string())
            .spawn(move || run.execute());

        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                *self.shared.state.lock() = SupervisorState::Idle;
                return Err(err).context("failed to spawn typing thread");
            }
        };
        *self.handle.lock() = Some(handle);

        if self.mode == ExecutionMode::Blocking {
            self.wait();
        }
        Ok(true)
    }

    /// Ask the active run to stop. A no-op unless the state is `Running`.
    pub fn request_stop(&self) -> bool {
        self.shared.request_stop()
    }

    /// Toggle: start when idle, stop when running.
    pub fn on_trigger(&self, text: &str) -> Result<()> {
        match self.state() {
            SupervisorState::Idle => {
                self.start(text)?;
            }
            SupervisorState::Running => {
                self.request_stop();
            }
            SupervisorState::Cancelling => {
                debug!("trigger ignored while cancelling");
            }
        }
        Ok(())
    }

    /// Block until the current run (if any) ends and return the latest report.
    pub fn wait(&self) -> Option<RunReport> {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            match handle.join() {
                Ok(report) => *self.last_report.lock() = Some(report),
                Err(_) => error!("typing thread panicked outside the run guard"),
            }
        }
        self.last_report.lock().clone()
    }

    fn reap_finished(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Ok(report) = handle.join() {
                *self.last_report.lock() = Some(report);
            }
        }
    }
}

impl Drop for TypingSupervisor {
    fn drop(&mut self) {
        self.request_stop();
        self.reap_finished();
    }
}

/// Returns the supervisor to `Idle` and fires `on_stop` exactly once, however
/// the run ends.
struct RunGuard {
    shared: Arc<Shared>,
    observer: Arc<dyn TypingObserver>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let observer = self.observer.clone();
        if panic::catch_unwind(AssertUnwindSafe(|| observer.on_stop())).is_err() {
            error!("on_stop callback panicked");
        }
        self.shared.cancel.store(false, Ordering::SeqCst);
        *self.shared.state.lock() = SupervisorState::Idle;
    }
}

#[derive(Debug, Default)]
struct RunState {
    chars_emitted_of_target: usize,
    total_target_chars: usize,
    actions_executed: usize,
    sink_failures: usize,
}

struct Run {
    shared: Arc<Shared>,
    sink: SharedSink,
    observer: Arc<dyn TypingObserver>,
    config: TypingConfig,
    seed: Option<u64>,
    time_scale: f64,
    trace: bool,
    faults: Sender<RunFault>,
    text: String,
}

impl Run {
    fn execute(self) -> RunReport {
        let _guard = RunGuard {
            shared: self.shared.clone(),
            observer: self.observer.clone(),
        };

        let mut state = RunState {
            total_target_chars: self.text.chars().count(),
            ..Default::default()
        };
        info!(
            chars = state.total_target_chars,
            cpm = self.config.base_speed_cpm(),
            "typing run started"
        );

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.drive(&mut state))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%message, "typing run faulted");
                let _ = self.faults.send(RunFault { message });
                RunOutcome::Faulted
            }
        };

        info!(
            ?outcome,
            done = state.chars_emitted_of_target,
            total = state.total_target_chars,
            sink_failures = state.sink_failures,
            "typing run ended"
        );

        RunReport {
            outcome,
            done: state.chars_emitted_of_target,
            total: state.total_target_chars,
            actions_executed: state.actions_executed,
            sink_failures: state.sink_failures,
        }
    }

    fn drive(&self, state: &mut RunState) -> RunOutcome {
        self.observer.on_start();

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let sequencer = Sequencer::new(&self.config);
        let mut tracer = self.trace.then(PlaybackTracer::new);

        let mut outcome = RunOutcome::Completed;
        'units: for unit in sequencer.units(&self.text, rng) {
            for action in &unit.actions {
                if !self.wait_before(action) {
                    outcome = RunOutcome::Cancelled;
                    break 'units;
                }
                self.perform(action, state);

                if let Some(tracer) = &mut tracer {
                    tracer.observe_action(action);
                    tracer.drain_lines().iter().for_each(|l| print_trace_line(l));
                }
            }

            state.chars_emitted_of_target += unit.target_len;
            self.observer
                .on_progress(state.chars_emitted_of_target, state.total_target_chars);
        }

        if let Some(tracer) = &mut tracer {
            tracer.finish().iter().for_each(|l| print_trace_line(l));
        }
        outcome
    }

    /// Sleep the action's pre-delay. Returns `false` if the run was cancelled
    /// before, during, or right after the sleep.
    fn wait_before(&self, action: &Action) -> bool {
        if self.shared.cancelled() {
            return false;
        }
        let scaled = action.delay().as_secs_f64() * self.time_scale;
        let delay = Duration::try_from_secs_f64(scaled).unwrap_or(Duration::MAX);
        if delay.is_zero() {
            return !self.shared.cancelled();
        }
        sleep_interruptible(&self.shared.cancel, delay)
    }

    fn perform(&self, action: &Action, state: &mut RunState) {
        let result = match action.kind {
            ActionKind::Char { ch } => self.sink.lock().emit_char(ch),
            ActionKind::Backspace => self.sink.lock().emit_backspace(),
            ActionKind::Pause => Ok(()),
        };
        state.actions_executed += 1;

        if let Err(err) = result {
            state.sink_failures += 1;
            warn!(action = ?action.kind, "keystroke failed, continuing: {err:#}");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
