pub mod config;
pub mod delay;
pub mod keyboard;
pub mod mistakes;
pub mod model;
pub mod output;
pub mod sequencer;
pub mod sim;
pub mod supervisor;
pub mod trace;
pub mod trigger;

pub use config::TypingConfig;
pub use output::{KeyOutputSink, OutputBackend};
pub use supervisor::{
    ExecutionMode, FnObserver, RunOutcome, RunReport, StopHandle, SupervisorState,
    TypingObserver, TypingSupervisor,
};
