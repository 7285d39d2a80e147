use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use typist::config::TypingConfig;
use typist::output::RecordingSink;
use typist::supervisor::{ExecutionMode, FnObserver, SupervisorState, TypingSupervisor};
use typist::trigger::{drive_triggers, TriggerEvent};

fn counting_supervisor(
    sink: RecordingSink,
    mode: ExecutionMode,
    cfg: TypingConfig,
) -> (TypingSupervisor, Arc<AtomicUsize>) {
    let starts = Arc::new(AtomicUsize::new(0));
    let counter = starts.clone();
    let supervisor = TypingSupervisor::new(sink, mode)
        .with_config(cfg)
        .with_observer(FnObserver::new().on_start(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    (supervisor, starts)
}

#[test]
fn toggle_during_a_blocking_run_does_not_restart_it() {
    let sink = RecordingSink::new();
    let cfg = TypingConfig::flawless().with_speed(500).with_speed_variance(0);
    let (supervisor, starts) = counting_supervisor(sink.clone(), ExecutionMode::Blocking, cfg);

    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(TriggerEvent::Toggle).expect("send");
    let sender = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(200));
        tx.send(TriggerEvent::Toggle).expect("send");
    });

    drive_triggers(&supervisor, "abcdefghij", &rx).expect("drive");
    sender.join().expect("sender thread");

    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert_eq!(sink.text(), "abcdefghij");
    assert_eq!(supervisor.state(), SupervisorState::Idle);
}

#[test]
fn toggle_during_a_background_run_stops_it() {
    let sink = RecordingSink::new();
    let cfg = TypingConfig::flawless().with_speed(50).with_speed_variance(0);
    let (supervisor, starts) = counting_supervisor(sink.clone(), ExecutionMode::Background, cfg);

    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(TriggerEvent::Toggle).expect("send");
    let sender = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(200));
        tx.send(TriggerEvent::Toggle).expect("send");
    });

    drive_triggers(&supervisor, "abcdefghij", &rx).expect("drive");
    sender.join().expect("sender thread");

    let report = supervisor.wait().expect("report");
    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert!(report.done < report.total, "run was not stopped: {report:?}");
    assert_eq!(supervisor.state(), SupervisorState::Idle);
}

#[test]
fn stop_event_while_idle_is_ignored() {
    let sink = RecordingSink::new();
    let (supervisor, starts) =
        counting_supervisor(sink.clone(), ExecutionMode::Blocking, TypingConfig::flawless());

    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(TriggerEvent::Stop).expect("send");
    drop(tx);

    drive_triggers(&supervisor, "abc", &rx).expect("drive");

    assert_eq!(starts.load(Ordering::SeqCst), 0);
    assert!(sink.calls().is_empty());
}
