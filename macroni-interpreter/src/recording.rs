//! Input recording and replay.
//!
//! A [`Recorder`] runs an [`InputListener`] on a background thread that
//! pushes events into a channel until the stop key is seen. The calling
//! thread blocks on a [`StopFlag`], drains the channel, then tidies the
//! events for replay. [`replay`] feeds them to an [`EventSink`] on the
//! original schedule.

use crate::error::{HostError, HostResult};
use crate::host::Point;
use crossbeam::channel::{self, Sender};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Window within which consecutive pointer moves collapse into one
pub const DEFAULT_BUCKET_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MouseMove,
    MouseClick,
    KeyDown,
    KeyUp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Seconds since recording started
    pub timestamp: f64,
    pub kind: EventKind,
    /// `move`, a button name, or a key name
    pub key: String,
    /// `move`, `down` or `up`
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_coordinates: Option<(i64, i64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_coordinates: Option<(i64, i64)>,
    /// Milliseconds until the next event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl RecordedEvent {
    pub fn mouse_move(timestamp: f64, to: Point, from: Option<Point>) -> Self {
        Self {
            timestamp,
            kind: EventKind::MouseMove,
            key: "move".to_string(),
            action: "move".to_string(),
            to_coordinates: Some((to.x, to.y)),
            from_coordinates: from.map(|p| (p.x, p.y)),
            duration_ms: None,
        }
    }

    pub fn mouse_click(timestamp: f64, button: &str, pressed: bool, at: Point) -> Self {
        Self {
            timestamp,
            kind: EventKind::MouseClick,
            key: button.to_string(),
            action: press_action(pressed).to_string(),
            to_coordinates: Some((at.x, at.y)),
            from_coordinates: None,
            duration_ms: None,
        }
    }

    pub fn key(timestamp: f64, key: &str, pressed: bool) -> Self {
        Self {
            timestamp,
            kind: if pressed {
                EventKind::KeyDown
            } else {
                EventKind::KeyUp
            },
            key: key.to_string(),
            action: press_action(pressed).to_string(),
            to_coordinates: None,
            from_coordinates: None,
            duration_ms: None,
        }
    }

    pub fn target(&self) -> Option<Point> {
        self.to_coordinates.map(|(x, y)| Point::new(x, y))
    }

    fn is_key_down(&self, key: &str) -> bool {
        self.kind == EventKind::KeyDown && self.key == key
    }
}

fn press_action(pressed: bool) -> &'static str {
    if pressed { "down" } else { "up" }
}

/// Keep the last pointer move of each `bucket_ms` window, carrying the
/// first move's origin so the path still starts where it did
pub fn squash_moves(events: Vec<RecordedEvent>, bucket_ms: u64) -> Vec<RecordedEvent> {
    let bucket = bucket_ms as f64 / 1000.0;
    let mut squashed = Vec::with_capacity(events.len());
    let mut events = events.into_iter().peekable();

    while let Some(event) = events.next() {
        if event.kind != EventKind::MouseMove {
            squashed.push(event);
            continue;
        }

        let bucket_end = event.timestamp + bucket;
        let origin = event.from_coordinates.or(event.to_coordinates);
        let mut last = event;
        while let Some(next) =
            events.next_if(|next| next.kind == EventKind::MouseMove && next.timestamp <= bucket_end)
        {
            last = next;
        }
        last.from_coordinates = origin;
        squashed.push(last);
    }
    squashed
}

/// Each event's `duration_ms` becomes the gap to the next one; the last is 0
pub fn attach_durations(events: &mut [RecordedEvent]) {
    let gaps: Vec<u64> = events
        .windows(2)
        .map(|pair| ((pair[1].timestamp - pair[0].timestamp) * 1000.0).max(0.0) as u64)
        .collect();
    for (event, gap) in events.iter_mut().zip(gaps) {
        event.duration_ms = Some(gap);
    }
    if let Some(last) = events.last_mut() {
        last.duration_ms = Some(0);
    }
}

/// Order by time, collapse move spam, and compute replay timing
pub fn finalize(mut events: Vec<RecordedEvent>, bucket_ms: u64) -> Vec<RecordedEvent> {
    events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    let mut events = squash_moves(events, bucket_ms);
    attach_durations(&mut events);
    events
}

/// One-shot flag shared between the interpreter thread and listeners
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let (lock, signal) = &*self.inner;
        *lock.lock() = true;
        signal.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Block until the flag is set
    pub fn wait(&self) {
        let (lock, signal) = &*self.inner;
        let mut stopped = lock.lock();
        while !*stopped {
            signal.wait(&mut stopped);
        }
    }

    /// Block for at most `timeout`; returns whether the flag is set
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, signal) = &*self.inner;
        let mut stopped = lock.lock();
        if !*stopped {
            signal.wait_for(&mut stopped, timeout);
        }
        *stopped
    }
}

/// Source of live input events, polled from a background thread
pub trait InputListener: Send + 'static {
    /// Block until the next event; `None` once the source is exhausted
    fn next_event(&mut self) -> Option<RecordedEvent>;
}

#[derive(Debug, Clone)]
pub struct Recorder {
    start_key: String,
    stop_key: String,
    bucket_ms: u64,
}

impl Recorder {
    pub fn new(start_key: &str, stop_key: &str) -> Self {
        Self {
            start_key: start_key.to_string(),
            stop_key: stop_key.to_string(),
            bucket_ms: DEFAULT_BUCKET_MS,
        }
    }

    pub fn with_bucket_ms(mut self, bucket_ms: u64) -> Self {
        self.bucket_ms = bucket_ms;
        self
    }

    /// Record from `listener` until the stop key is pressed or input runs
    /// out. Events before the start key are discarded. `origin` is the
    /// pointer position when recording begins.
    pub fn record<L: InputListener>(
        &self,
        listener: L,
        origin: Option<Point>,
    ) -> HostResult<Vec<RecordedEvent>> {
        let (sender, receiver) = channel::unbounded();
        let stop = StopFlag::new();

        let worker = {
            let stop = stop.clone();
            let session = self.clone();
            thread::Builder::new()
                .name("macroni-recorder".to_string())
                .spawn(move || session.listen(listener, sender, stop, origin))
                .map_err(|e| HostError::failed(format!("cannot start input listener: {e}")))?
        };

        tracing::info!(start = %self.start_key, stop = %self.stop_key, "recording");
        stop.wait();
        worker
            .join()
            .map_err(|_| HostError::failed("input listener panicked"))?;

        let mut events: Vec<RecordedEvent> = origin
            .map(|at| RecordedEvent::mouse_move(0.0, at, None))
            .into_iter()
            .collect();
        events.extend(receiver.try_iter());

        let events = finalize(events, self.bucket_ms);
        tracing::info!(events = events.len(), "recording stopped");
        Ok(events)
    }

    fn listen<L: InputListener>(
        &self,
        mut listener: L,
        sender: Sender<RecordedEvent>,
        stop: StopFlag,
        origin: Option<Point>,
    ) {
        let _release = ReleaseOnDrop(stop.clone());
        let mut started = false;
        let mut last_position = origin;

        while !stop.is_set() {
            let Some(mut event) = listener.next_event() else {
                break;
            };

            if event.is_key_down(&self.stop_key) {
                break;
            }
            if !started {
                started = event.is_key_down(&self.start_key);
                continue;
            }
            if event.kind == EventKind::KeyUp && event.key == self.start_key {
                continue;
            }

            if event.kind == EventKind::MouseMove {
                if event.from_coordinates.is_none() {
                    event.from_coordinates = last_position.map(|p| (p.x, p.y));
                }
                last_position = event.target();
            }

            if sender.send(event).is_err() {
                break;
            }
        }
    }
}

/// Sets the stop flag when the listener thread ends, including by panic
struct ReleaseOnDrop(StopFlag);

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.0.set();
    }
}

/// Destination for replayed events
pub trait EventSink {
    fn apply(&mut self, event: &RecordedEvent) -> HostResult<()>;

    /// Seconds on the sink's clock
    fn now(&mut self) -> f64;

    fn sleep(&mut self, duration: Duration);
}

/// Replay `events` on their original schedule relative to the first one.
/// Returns the number applied, which is short when `stop` fired.
pub fn replay<S: EventSink>(
    events: &[RecordedEvent],
    sink: &mut S,
    stop: &StopFlag,
) -> HostResult<usize> {
    let Some(first) = events.first() else {
        return Ok(0);
    };
    let origin = first.timestamp;
    let started = sink.now();

    let mut applied = 0;
    for event in events {
        let behind = (event.timestamp - origin) - (sink.now() - started);
        if behind > 0.0 {
            if let Ok(delay) = Duration::try_from_secs_f64(behind) {
                sink.sleep(delay);
            }
        }
        if stop.is_set() {
            tracing::info!(applied, remaining = events.len() - applied, "playback interrupted");
            break;
        }
        sink.apply(event)?;
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    fn moved(timestamp: f64, x: i64) -> RecordedEvent {
        RecordedEvent::mouse_move(timestamp, Point::new(x, 0), None)
    }

    #[test]
    fn test_squash_keeps_last_move_per_bucket() {
        let events = vec![
            moved(0.000, 1),
            moved(0.020, 2),
            moved(0.040, 3),
            RecordedEvent::key(0.045, "a", true),
            moved(0.100, 4),
        ];

        let squashed = squash_moves(events, 50);
        assert_eq!(squashed.len(), 3);
        assert_eq!(squashed[0].to_coordinates, Some((3, 0)));
        assert_eq!(squashed[0].from_coordinates, Some((1, 0)));
        assert_eq!(squashed[1].kind, EventKind::KeyDown);
        assert_eq!(squashed[2].to_coordinates, Some((4, 0)));
    }

    #[test]
    fn test_durations_are_gaps_to_next_event() {
        let mut events = vec![
            RecordedEvent::key(0.0, "a", true),
            RecordedEvent::key(0.25, "a", false),
            RecordedEvent::key(1.0, "b", true),
        ];
        attach_durations(&mut events);
        let durations: Vec<Option<u64>> = events.iter().map(|e| e.duration_ms).collect();
        assert_eq!(durations, vec![Some(250), Some(750), Some(0)]);
    }

    #[test]
    fn test_event_serialises_with_snake_case_kind() {
        let event = RecordedEvent::key(1.5, "space", true);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"key_down\""));
        assert!(!json.contains("to_coordinates"));
        let back: RecordedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    struct Scripted(VecDeque<RecordedEvent>);

    impl InputListener for Scripted {
        fn next_event(&mut self) -> Option<RecordedEvent> {
            self.0.pop_front()
        }
    }

    #[test]
    fn test_recorder_waits_for_start_and_stops_on_stop_key() {
        let listener = Scripted(VecDeque::from(vec![
            RecordedEvent::key(0.1, "x", true),
            RecordedEvent::key(0.2, "space", true),
            RecordedEvent::key(0.3, "space", false),
            moved(0.4, 10),
            RecordedEvent::mouse_click(0.5, "left", true, Point::new(10, 0)),
            RecordedEvent::key(0.6, "esc", true),
            RecordedEvent::key(0.7, "z", true),
        ]));

        let events = Recorder::new("space", "esc")
            .record(listener, Some(Point::new(0, 0)))
            .unwrap();

        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::MouseMove, EventKind::MouseMove, EventKind::MouseClick]
        );
        assert_eq!(events[1].from_coordinates, Some((0, 0)));
        assert_eq!(events.last().and_then(|e| e.duration_ms), Some(0));
    }

    struct Failing;

    impl InputListener for Failing {
        fn next_event(&mut self) -> Option<RecordedEvent> {
            panic!("input device went away");
        }
    }

    #[test]
    fn test_listener_panic_ends_recording_with_error() {
        let error = Recorder::new("space", "esc").record(Failing, None).unwrap_err();
        assert_eq!(error, HostError::failed("input listener panicked"));
    }

    #[test]
    fn test_stop_flag_wakes_waiter() {
        let flag = StopFlag::new();
        let setter = flag.clone();
        let worker = thread::spawn(move || setter.set());
        flag.wait();
        worker.join().unwrap();
        assert!(flag.is_set());
        assert!(flag.wait_timeout(Duration::from_millis(1)));
    }

    struct VirtualSink {
        clock: f64,
        applied: Vec<f64>,
        stop_at: Option<(f64, StopFlag)>,
    }

    impl EventSink for VirtualSink {
        fn apply(&mut self, _event: &RecordedEvent) -> HostResult<()> {
            self.applied.push(self.clock);
            Ok(())
        }

        fn now(&mut self) -> f64 {
            self.clock
        }

        fn sleep(&mut self, duration: Duration) {
            self.clock += duration.as_secs_f64();
            if let Some((at, flag)) = &self.stop_at {
                if self.clock >= *at {
                    flag.set();
                }
            }
        }
    }

    #[test]
    fn test_replay_follows_schedule_and_honours_stop() {
        let events = vec![
            RecordedEvent::key(10.0, "a", true),
            RecordedEvent::key(10.5, "a", false),
            RecordedEvent::key(12.0, "b", true),
        ];

        let mut sink = VirtualSink {
            clock: 0.0,
            applied: Vec::new(),
            stop_at: None,
        };
        let applied = replay(&events, &mut sink, &StopFlag::new()).unwrap();
        assert_eq!(applied, 3);
        assert_eq!(sink.applied, vec![0.0, 0.5, 2.0]);

        let stop = StopFlag::new();
        let mut sink = VirtualSink {
            clock: 0.0,
            applied: Vec::new(),
            stop_at: Some((1.0, stop.clone())),
        };
        assert_eq!(replay(&events, &mut sink, &stop).unwrap(), 2);
    }
}
