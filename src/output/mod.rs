pub mod console;
pub mod recording;
pub(crate) mod util;

#[cfg(feature = "x11")]
pub mod x11;

use anyhow::{anyhow, Result};

pub use console::ConsoleSink;
pub use recording::{Recording, RecordingSink, SinkCall};

/// Where emitted keystrokes end up.
///
/// Calls may block for an unspecified time. An `Err` means that one keystroke was
/// lost; callers log it and carry on with the next action.
pub trait KeyOutputSink: Send {
    fn name(&self) -> &'static str;

    fn emit_char(&mut self, c: char) -> Result<()>;

    fn emit_backspace(&mut self) -> Result<()>;
}

impl<S: KeyOutputSink + ?Sized> KeyOutputSink for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn emit_char(&mut self, c: char) -> Result<()> {
        (**self).emit_char(c)
    }

    fn emit_backspace(&mut self) -> Result<()> {
        (**self).emit_backspace()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputBackend {
    Auto,
    /// Print to stdout. Nothing reaches other applications.
    Console,
    /// Inject key events into the focused X11 window via XTEST.
    X11,
}

impl OutputBackend {
    /// Whether this backend drives a real keyboard. Runs without one are pure
    /// simulation and may block the caller until they finish.
    pub fn injects_keys(self) -> bool {
        matches!(self, OutputBackend::X11)
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputBackend::Auto => "auto",
            OutputBackend::Console => "console",
            OutputBackend::X11 => "x11",
        }
    }
}

fn env_is_set(name: &str) -> bool {
    std::env::var_os(name)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

fn auto_backend() -> OutputBackend {
    if cfg!(feature = "x11") && env_is_set("DISPLAY") {
        return OutputBackend::X11;
    }
    OutputBackend::Console
}

fn environment_summary() -> String {
    let mut parts = Vec::new();
    if env_is_set("DISPLAY") {
        parts.push("DISPLAY is set".to_string());
    }
    if env_is_set("WAYLAND_DISPLAY") {
        parts.push("WAYLAND_DISPLAY is set".to_string());
    }
    if let Ok(session) = std::env::var("XDG_SESSION_TYPE") {
        if !session.is_empty() {
            parts.push(format!("XDG_SESSION_TYPE={session}"));
        }
    }

    if parts.is_empty() {
        "No display session detected.".to_string()
    } else {
        format!("Detected environment: {}", parts.join(", "))
    }
}

/// Decide once, up front, which output backend this process can use.
///
/// `Auto` falls back to the console when no keyboard backend is usable, so it
/// always resolves. Explicitly requesting a backend that is compiled out fails.
pub fn resolve_backend(requested: OutputBackend) -> Result<OutputBackend> {
    let resolved = match requested {
        OutputBackend::Auto => auto_backend(),
        other => other,
    };

    if resolved == OutputBackend::X11 && !cfg!(feature = "x11") {
        let how = match requested {
            OutputBackend::Auto => "detected",
            _ => "requested",
        };
        return Err(anyhow!(
            "X11 backend {how} but is disabled in this build. (Rebuild with `--features x11`.) {}",
            environment_summary()
        ));
    }

    Ok(resolved)
}

/// Open a sink for an already resolved backend.
pub fn open_sink(backend: OutputBackend) -> Result<Box<dyn KeyOutputSink>> {
    match backend {
        OutputBackend::Console => Ok(Box::new(ConsoleSink::stdout())),
        OutputBackend::X11 => {
            #[cfg(feature = "x11")]
            {
                Ok(Box::new(x11::X11Sink::connect()?))
            }

            #[cfg(not(feature = "x11"))]
            {
                Err(anyhow!(
                    "X11 backend is disabled in this build (rebuild with `--features x11`)."
                ))
            }
        }
        OutputBackend::Auto => Err(anyhow!("no output backend resolved")),
    }
}
