use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const SLEEP_STEP: Duration = Duration::from_millis(50);

/// Sleep for `total`, waking every 50 ms to check `stop`.
///
/// Returns `false` if `stop` was set before the full duration elapsed.
pub(crate) fn sleep_interruptible(stop: &AtomicBool, total: Duration) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        let step = remaining.min(SLEEP_STEP);
        std::thread::sleep(step);
        remaining -= step;
    }
    !stop.load(Ordering::SeqCst)
}

pub(crate) fn print_trace_line(line: &str) {
    const RESET: &str = "\x1b[0m";
    const TYPING: &str = "\x1b[34m";
    const REPLACE: &str = "\x1b[33m";

    if let Some(rest) = line.strip_prefix("Typing") {
        eprintln!("{TYPING}Typing{RESET}{rest}");
    } else if let Some(rest) = line.strip_prefix("Replace") {
        eprintln!("{REPLACE}Replace{RESET}{rest}");
    } else {
        eprintln!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn returns_early_when_stop_is_set() {
        let stop = AtomicBool::new(true);
        let started = Instant::now();
        assert!(!sleep_interruptible(&stop, Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn zero_duration_reports_completion() {
        let stop = AtomicBool::new(false);
        assert!(sleep_interruptible(&stop, Duration::ZERO));
    }
}
