//! Trigger sources that start and stop the supervisor.
//!
//! Every source (stdin, global hotkey, Ctrl+C) funnels into one channel of
//! [`TriggerEvent`]s; [`drive_triggers`] applies them to a supervisor.

use std::io::BufRead;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::supervisor::{ExecutionMode, StopHandle, TypingSupervisor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Start when idle, stop when running.
    Toggle,
    /// Stop the active run, if any.
    Stop,
}

/// Apply trigger events until every sender has been dropped, then wait for the
/// last run to finish.
///
/// A blocking supervisor cannot be stopped by a toggle, so events that arrive
/// while it types are discarded instead of starting another run.
pub fn drive_triggers(
    supervisor: &TypingSupervisor,
    text: &str,
    events: &Receiver<TriggerEvent>,
) -> Result<()> {
    for event in events.iter() {
        debug!(?event, state = ?supervisor.state(), "trigger received");
        match event {
            TriggerEvent::Toggle => {
                supervisor.on_trigger(text)?;
                if supervisor.mode() == ExecutionMode::Blocking {
                    // Toggles queued during a blocking run were meant to stop it.
                    let stale = events.try_iter().count();
                    if stale > 0 {
                        debug!(stale, "dropped triggers queued during a blocking run");
                    }
                }
            }
            TriggerEvent::Stop => {
                supervisor.request_stop();
            }
        }
    }
    supervisor.wait();
    Ok(())
}

/// Turn each line read from `input` into a toggle. End of input closes the
/// channel.
pub fn spawn_line_trigger<R>(input: R, events: Sender<TriggerEvent>) -> Result<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("typist-stdin".to_string())
        .spawn(move || {
            for line in input.lines() {
                if let Err(err) = line {
                    warn!("stdin trigger stopped: {err}");
                    break;
                }
                if events.send(TriggerEvent::Toggle).is_err() {
                    break;
                }
            }
            debug!("stdin trigger closed");
        })
        .context("failed to spawn stdin trigger thread")?;
    Ok(())
}

/// Route Ctrl+C to `stop`. The process keeps running so the run can wind down
/// and the supervisor can report.
pub fn install_ctrlc(stop: StopHandle) -> Result<()> {
    ctrlc::set_handler(move || {
        if stop.request_stop() {
            info!("stop requested from Ctrl+C");
        } else {
            std::process::exit(130);
        }
    })
    .context("failed to install Ctrl+C handler")
}

/// Global F6 hotkey. The listener thread lives for the rest of the process.
#[cfg(feature = "hotkey")]
pub fn spawn_hotkey_trigger(events: Sender<TriggerEvent>) -> Result<()> {
    use rdev::{EventType, Key};

    std::thread::Builder::new()
        .name("typist-hotkey".to_string())
        .spawn(move || {
            let result = rdev::listen(move |event| {
                if let EventType::KeyPress(Key::F6) = event.event_type {
                    let _ = events.send(TriggerEvent::Toggle);
                }
            });
            if let Err(err) = result {
                warn!("global hotkey listener failed: {err:?}");
            }
        })
        .context("failed to spawn hotkey thread")?;
    info!("press F6 to start or stop typing");
    Ok(())
}

#[cfg(not(feature = "hotkey"))]
pub fn spawn_hotkey_trigger(_events: Sender<TriggerEvent>) -> Result<()> {
    Err(anyhow::anyhow!(
        "global hotkey support requires building with `--features hotkey`"
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use super::*;

    #[test]
    fn each_line_becomes_a_toggle_and_eof_closes() {
        let (tx, rx) = crossbeam_channel::unbounded();
        spawn_line_trigger(Cursor::new("\n\nignored text\n"), tx).expect("spawn");

        let got: Vec<_> = rx.iter().collect();
        assert_eq!(got, vec![TriggerEvent::Toggle; 3]);
        assert!(rx.recv_timeout(Duration::from_millis(10)).is_err());
    }
}
