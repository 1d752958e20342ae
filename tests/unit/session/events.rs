use super::*;

fn report() -> CompletionReport {
    CompletionReport {
        output: PathBuf::from("out.mp4"),
        usage: UsageSummary::default(),
    }
}

#[test]
fn stream_is_start_progress_terminal() {
    let (bus, events) = EventBus::channel(RunGate::default());
    bus.start();
    let p = bus.progress_sink();
    p.report(0.25);
    p.report(0.1);
    p.report(0.5);
    bus.complete(report());
    p.report(0.9);

    let got: Vec<RenderEvent> = events.collect();
    assert!(matches!(got[0], RenderEvent::Start));
    let progress: Vec<f64> = got
        .iter()
        .filter_map(|e| match e {
            RenderEvent::Progress(f) => Some(*f),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![0.25, 0.5]);
    assert!(got.last().unwrap().is_terminal());
    assert_eq!(got.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[test]
fn progress_is_clamped() {
    let (bus, events) = EventBus::channel(RunGate::default());
    let p = bus.progress_sink();
    p.report(7.0);
    p.report(f64::NAN);
    bus.fail(FramecraftError::config("x"));
    let got: Vec<RenderEvent> = events.collect();
    assert!(matches!(got[0], RenderEvent::Progress(f) if f == 1.0));
    assert!(matches!(got[1], RenderEvent::Error(FramecraftError::Config(_))));
}

#[test]
fn closed_gate_silences_terminal_events() {
    let gate = RunGate::default();
    let (bus, events) = EventBus::channel(gate.clone());
    bus.start();
    gate.close();
    bus.progress_sink().report(0.5);
    bus.complete(report());
    assert!(matches!(events.wait(), RenderOutcome::Cancelled));
}

#[test]
fn wait_returns_failure() {
    let (bus, events) = EventBus::channel(RunGate::default());
    std::thread::spawn(move || {
        bus.start();
        bus.fail(FramecraftError::resource_not_found("missing.mp4"));
    });
    match events.wait() {
        RenderOutcome::Failed(FramecraftError::ResourceNotFound { path }) => {
            assert_eq!(path, PathBuf::from("missing.mp4"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn next_timeout_reports_deadline() {
    let (bus, mut events) = EventBus::channel(RunGate::default());
    let err = events.next_timeout(Duration::from_millis(10)).unwrap_err();
    assert!(matches!(err, FramecraftError::Timeout(_)));
    bus.complete(report());
    assert!(matches!(
        events.next_timeout(Duration::from_secs(1)).unwrap(),
        Some(RenderEvent::Complete(_))
    ));
    assert!(events.next_timeout(Duration::from_secs(1)).unwrap().is_none());
}
