//! End-to-end pipeline tests: a real worker thread pumping a synthetic
//! stream, observed through the event channel and the session probe.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use mediapump::config::Config;
use mediapump::events::{EventSink, PumpEvent};
use mediapump::media::{
    MediaSession, OutputPoll, SampleRead, SlotId, SyncPolicy, SyntheticSession,
};
use mediapump::player::Player;
use mediapump::pump::{DecodePump, PumpMessage};
use mediapump::Looper;

/// Block until an event matching `pred` arrives, skipping everything else
fn wait_for<F>(rx: &mpsc::Receiver<PumpEvent>, what: &str, pred: F) -> PumpEvent
where
    F: Fn(&PumpEvent) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(event) if pred(&event) => return event,
            Ok(_) => continue,
            Err(e) => panic!("timed out waiting for {}: {}", what, e),
        }
    }
}

/// Assert that no event at all arrives within `window`
fn assert_quiet(rx: &mpsc::Receiver<PumpEvent>, window: Duration) {
    match rx.recv_timeout(window) {
        Err(_) => {}
        Ok(event) => panic!("expected a quiet pipeline, got {:?}", event),
    }
}

#[test]
fn player_plays_a_stream_to_end() {
    let session = SyntheticSession::new(20, 1_000);
    let probe = session.probe();
    let (event_tx, event_rx) = mpsc::channel();
    let config = Config::default();

    let player = Player::start(Box::new(session), &config, EventSink::new(event_tx)).unwrap();
    player.play().unwrap();

    wait_for(&event_rx, "end of stream", |e| *e == PumpEvent::EndOfStream);
    player.shutdown();

    // Every frame rendered exactly once; the end marker released unrendered.
    assert_eq!(probe.rendered(), 20);
    assert_eq!(probe.released_unrendered(), 1);
    assert!(probe.stopped());
}

#[test]
fn priming_shows_one_frame_without_playing() {
    let session = SyntheticSession::new(100, 1_000);
    let probe = session.probe();
    let (event_tx, event_rx) = mpsc::channel();
    let config = Config::default();

    let player = Player::start(Box::new(session), &config, EventSink::new(event_tx)).unwrap();

    let event = wait_for(&event_rx, "the opening frame", |e| {
        matches!(e, PumpEvent::FrameRendered { .. })
    });
    assert_eq!(event, PumpEvent::FrameRendered { pts_us: 0 });

    // Not playing: the frame count holds.
    assert_quiet(&event_rx, Duration::from_millis(200));
    assert_eq!(probe.rendered(), 1);

    player.shutdown();
}

#[test]
fn pause_stops_rendering_and_repeats_are_silent() {
    let session = SyntheticSession::new(10_000, 1_000);
    let probe = session.probe();
    let (event_tx, event_rx) = mpsc::channel();
    let config = Config::default();

    let player = Player::start(Box::new(session), &config, EventSink::new(event_tx)).unwrap();
    player.play().unwrap();
    wait_for(&event_rx, "playback to start", |e| {
        matches!(e, PumpEvent::FrameRendered { .. })
    });

    player.pause().unwrap();
    wait_for(&event_rx, "the pause to land", |e| *e == PumpEvent::Paused);

    // Frames emitted before the pause landed may still be queued up.
    let _ = event_rx.try_iter().count();
    let rendered_at_pause = probe.rendered();

    assert_quiet(&event_rx, Duration::from_millis(200));
    assert_eq!(probe.rendered(), rendered_at_pause);

    // Pausing a paused pipeline does nothing at all.
    player.pause().unwrap();
    assert_quiet(&event_rx, Duration::from_millis(200));

    player.shutdown();
}

#[test]
fn repeated_play_resumes_only_once() {
    let session = SyntheticSession::new(10_000, 1_000);
    let (event_tx, event_rx) = mpsc::channel();
    let config = Config::default();

    let player = Player::start(Box::new(session), &config, EventSink::new(event_tx)).unwrap();
    player.play().unwrap();
    player.play().unwrap();

    wait_for(&event_rx, "the first resume", |e| *e == PumpEvent::Resumed);

    // The second play lands while already playing; frames keep flowing but
    // no second Resumed shows up.
    let deadline = Instant::now() + Duration::from_millis(300);
    while let Ok(event) = event_rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
    {
        assert_ne!(event, PumpEvent::Resumed);
    }

    player.shutdown();
}

#[test]
fn rewind_while_paused_renders_exactly_one_frame() {
    let session = SyntheticSession::new(100, 1_000);
    let probe = session.probe();
    let (event_tx, event_rx) = mpsc::channel();
    let config = Config::default();

    let player = Player::start(Box::new(session), &config, EventSink::new(event_tx)).unwrap();
    wait_for(&event_rx, "the opening frame", |e| {
        matches!(e, PumpEvent::FrameRendered { .. })
    });

    player.rewind().unwrap();
    wait_for(&event_rx, "the seek to land", |e| {
        *e == PumpEvent::Seeked { pts_us: 0 }
    });
    let event = wait_for(&event_rx, "the post-seek frame", |e| {
        matches!(e, PumpEvent::FrameRendered { .. })
    });
    assert_eq!(event, PumpEvent::FrameRendered { pts_us: 0 });

    // One fresh frame at the start, still paused afterwards.
    assert_quiet(&event_rx, Duration::from_millis(200));
    assert_eq!(probe.rendered(), 2);
    assert_eq!(probe.repositions(), 1);
    assert_eq!(probe.flushes(), 1);

    player.shutdown();
}

#[test]
fn rewind_after_end_of_stream_replays_while_playing() {
    let session = SyntheticSession::new(10, 1_000);
    let probe = session.probe();
    let (event_tx, event_rx) = mpsc::channel();
    let config = Config::default();

    let player = Player::start(Box::new(session), &config, EventSink::new(event_tx)).unwrap();
    player.play().unwrap();
    wait_for(&event_rx, "end of stream", |e| *e == PumpEvent::EndOfStream);

    player.rewind().unwrap();
    wait_for(&event_rx, "the second end of stream", |e| {
        *e == PumpEvent::EndOfStream
    });
    player.shutdown();

    assert_eq!(probe.rendered(), 20);
}

/// Delegating session that blocks the worker inside its first input poll,
/// letting the test stack up queue contents mid-iteration
struct GatedSession {
    inner: SyntheticSession,
    gate: mpsc::Receiver<()>,
    entered_tx: mpsc::Sender<()>,
    gated: bool,
}

impl MediaSession for GatedSession {
    fn dequeue_input_slot(&mut self, timeout: Duration) -> Option<SlotId> {
        if !self.gated {
            self.gated = true;
            let _ = self.entered_tx.send(());
            let _ = self.gate.recv();
        }
        self.inner.dequeue_input_slot(timeout)
    }

    fn read_next_sample_into(&mut self, slot: SlotId) -> SampleRead {
        self.inner.read_next_sample_into(slot)
    }

    fn submit_input(&mut self, slot: SlotId, size: usize, pts_us: i64, end_of_stream: bool) {
        self.inner.submit_input(slot, size, pts_us, end_of_stream)
    }

    fn advance_to_next_sample(&mut self) {
        self.inner.advance_to_next_sample()
    }

    fn dequeue_output(&mut self, timeout: Duration) -> OutputPoll {
        self.inner.dequeue_output(timeout)
    }

    fn release_output(&mut self, slot: SlotId, render: bool) {
        self.inner.release_output(slot, render)
    }

    fn reposition(&mut self, pts_us: i64, policy: SyncPolicy) {
        self.inner.reposition(pts_us, policy)
    }

    fn flush_decoder(&mut self) {
        self.inner.flush_decoder()
    }

    fn stop(&mut self) {
        self.inner.stop()
    }
}

#[test]
fn pause_flush_discards_queued_pump_work() {
    let inner = SyntheticSession::new(50, 1_000);
    let probe = inner.probe();
    let (gate_tx, gate_rx) = mpsc::channel();
    let (entered_tx, entered_rx) = mpsc::channel();
    let session = GatedSession {
        inner,
        gate: gate_rx,
        entered_tx,
        gated: false,
    };

    let (event_tx, event_rx) = mpsc::channel();
    let config = Config::default();
    let pump = DecodePump::new(Box::new(session), &config, EventSink::new(event_tx));
    let mut looper = Looper::spawn("gated-pump", pump);

    // Resume kicks the first pump iteration, which parks inside the gate
    // before anything reaches the decoder's output side.
    looper.post(PumpMessage::Resume).unwrap();
    entered_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("worker entered the pump iteration");

    // Line up a pause followed by a stray pump iteration, then let the
    // blocked iteration finish. Its own re-post also lands behind the pause.
    looper.post(PumpMessage::Pause).unwrap();
    looper.post(PumpMessage::ContinuePumping).unwrap();
    gate_tx.send(()).unwrap();

    wait_for(&event_rx, "the pause to land", |e| *e == PumpEvent::Paused);

    // The flush threw away both queued iterations, so nothing was ever
    // rendered into the paused stream.
    assert_quiet(&event_rx, Duration::from_millis(200));
    assert_eq!(probe.rendered(), 0);

    looper.quit();
}

#[test]
fn full_scenario_prime_play_pause_rewind_play() {
    let session = SyntheticSession::new(30, 1_000);
    let probe = session.probe();
    let (event_tx, event_rx) = mpsc::channel();
    let config = Config::default();

    let player = Player::start(Box::new(session), &config, EventSink::new(event_tx)).unwrap();
    wait_for(&event_rx, "the opening frame", |e| {
        matches!(e, PumpEvent::FrameRendered { .. })
    });

    player.play().unwrap();
    wait_for(&event_rx, "playback to start", |e| {
        matches!(e, PumpEvent::FrameRendered { pts_us } if *pts_us > 0)
    });

    player.pause().unwrap();
    wait_for(&event_rx, "the pause to land", |e| *e == PumpEvent::Paused);
    let _ = event_rx.try_iter().count();

    player.rewind().unwrap();
    wait_for(&event_rx, "the seek to land", |e| {
        *e == PumpEvent::Seeked { pts_us: 0 }
    });
    wait_for(&event_rx, "the post-seek frame", |e| {
        *e == PumpEvent::FrameRendered { pts_us: 0 }
    });

    player.play().unwrap();
    wait_for(&event_rx, "end of stream", |e| *e == PumpEvent::EndOfStream);
    player.shutdown();

    assert!(probe.stopped());
    // Rewind restarted the stream, so the full run plays out after it on
    // top of whatever the first stretch showed.
    assert!(probe.rendered() >= 30 + 2);
    assert_eq!(probe.repositions(), 1);
}
