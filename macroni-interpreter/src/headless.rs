//! A deterministic virtual desktop implementing [`Host`].
//!
//! Nothing here touches real input devices or the screen. The pointer,
//! pixels, template hits and OCR results are whatever the desktop was
//! configured with; time is a virtual clock that sleeps and pointer travel
//! advance. Every side effect is appended to an action log.

use crate::error::{HostError, HostResult};
use crate::host::{Bounds, Host, OcrMatch, OcrQuery, Point, Rgb, TemplateQuery};
use crate::recording::{replay, EventKind, EventSink, InputListener, RecordedEvent, Recorder, StopFlag};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Epoch seconds the virtual clock starts at
pub const VIRTUAL_EPOCH: f64 = 1_700_000_000.0;

/// Side effects observed by the desktop, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Moved {
        from: Point,
        to: Point,
        humanlike: bool,
    },
    Clicked(Point),
    Input {
        kind: String,
        key: String,
        action: String,
    },
    PressedAndReleased {
        delay_ms: u64,
        keys: Vec<String>,
    },
    Slept(Duration),
    Replayed(RecordedEvent),
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessHost {
    cursor: Point,
    clock: f64,
    background: Rgb,
    pixels: HashMap<Point, Rgb>,
    templates: HashMap<String, Vec<Point>>,
    ocr: Vec<OcrMatch>,
    coordinates: HashMap<String, Point>,
    colors: HashMap<String, Rgb>,
    regions: HashMap<String, Bounds>,
    recordings: HashMap<String, Vec<RecordedEvent>>,
    pending_input: VecDeque<RecordedEvent>,
    playback_stop_after: Option<f64>,
    output: Vec<String>,
    actions: Vec<Action>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cursor(mut self, at: Point) -> Self {
        self.cursor = at;
        self
    }

    pub fn with_background(mut self, color: Rgb) -> Self {
        self.background = color;
        self
    }

    pub fn with_pixel(mut self, at: Point, color: Rgb) -> Self {
        self.pixels.insert(at, color);
        self
    }

    /// Match centres for template `name`, best first
    pub fn with_template(mut self, name: &str, hits: Vec<Point>) -> Self {
        self.templates.insert(name.to_string(), hits);
        self
    }

    pub fn with_ocr(mut self, matches: Vec<OcrMatch>) -> Self {
        self.ocr = matches;
        self
    }

    pub fn with_coordinates(mut self, label: &str, at: Point) -> Self {
        self.remember_coordinates(label, at);
        self
    }

    pub fn with_color(mut self, alias: &str, color: Rgb) -> Self {
        self.remember_color(alias, color);
        self
    }

    pub fn with_region(mut self, key: &str, bounds: Bounds) -> Self {
        self.remember_region(key, bounds);
        self
    }

    pub fn with_recording(mut self, name: &str, events: Vec<RecordedEvent>) -> Self {
        self.store_recording(name, events);
        self
    }

    /// Input the next `@record` will consume, including its start and stop keys
    pub fn queue_input(&mut self, events: impl IntoIterator<Item = RecordedEvent>) {
        self.pending_input.extend(events);
    }

    /// Simulate the stop key being pressed this many seconds into playback
    pub fn stop_playback_after(&mut self, seconds: f64) {
        self.playback_stop_after = Some(seconds);
    }

    pub fn remember_coordinates(&mut self, label: &str, at: Point) {
        self.coordinates.insert(label.to_string(), at);
    }

    pub fn remember_color(&mut self, alias: &str, color: Rgb) {
        self.colors.insert(alias.to_string(), color);
    }

    pub fn remember_region(&mut self, key: &str, bounds: Bounds) {
        self.regions.insert(key.to_string(), bounds);
    }

    pub fn store_recording(&mut self, name: &str, events: Vec<RecordedEvent>) {
        self.recordings.insert(name.to_string(), events);
    }

    pub fn known_coordinates(&self, label: &str) -> Option<Point> {
        self.coordinates.get(label).copied()
    }

    pub fn known_color(&self, alias: &str) -> Option<Rgb> {
        self.colors.get(alias).copied()
    }

    pub fn known_region(&self, key: &str) -> Option<Bounds> {
        self.regions.get(key).copied()
    }

    pub fn recording(&self, name: &str) -> Option<&[RecordedEvent]> {
        self.recordings.get(name).map(Vec::as_slice)
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    /// Seconds elapsed on the virtual clock
    pub fn elapsed(&self) -> f64 {
        self.clock
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn clear_log(&mut self) {
        self.output.clear();
        self.actions.clear();
    }

    fn advance(&mut self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            self.clock += seconds;
        }
    }
}

impl Host for HeadlessHost {
    fn print(&mut self, line: &str) -> HostResult<()> {
        self.output.push(line.to_string());
        Ok(())
    }

    fn sleep(&mut self, duration: Duration) -> HostResult<()> {
        self.advance(duration.as_secs_f64());
        self.actions.push(Action::Slept(duration));
        Ok(())
    }

    fn epoch_seconds(&mut self) -> f64 {
        VIRTUAL_EPOCH + self.clock
    }

    /// Travel takes distance / speed seconds; a non-positive speed is instant
    fn mouse_move(&mut self, target: Point, pixels_per_second: f64, humanlike: bool) -> HostResult<()> {
        let from = self.cursor;
        if pixels_per_second > 0.0 {
            self.advance(from.distance(target) / pixels_per_second);
        }
        self.cursor = target;
        self.actions.push(Action::Moved {
            from,
            to: target,
            humanlike,
        });
        Ok(())
    }

    fn mouse_position(&mut self) -> HostResult<Point> {
        Ok(self.cursor)
    }

    fn left_click(&mut self) -> HostResult<()> {
        self.actions.push(Action::Clicked(self.cursor));
        Ok(())
    }

    fn send_input(&mut self, kind: &str, key: &str, action: &str) -> HostResult<()> {
        if !matches!(action, "down" | "up" | "press") {
            return Err(HostError::input(format!(
                "unknown action '{action}', expected down, up or press"
            )));
        }
        self.actions.push(Action::Input {
            kind: kind.to_string(),
            key: key.to_string(),
            action: action.to_string(),
        });
        Ok(())
    }

    fn press_and_release(&mut self, delay_ms: u64, keys: &[String]) -> HostResult<()> {
        self.advance(delay_ms as f64 / 1000.0);
        self.actions.push(Action::PressedAndReleased {
            delay_ms,
            keys: keys.to_vec(),
        });
        Ok(())
    }

    fn find_templates(&mut self, query: &TemplateQuery) -> HostResult<Vec<Point>> {
        let hits = self.templates.get(&query.name).map(Vec::as_slice).unwrap_or_default();
        Ok(hits
            .iter()
            .copied()
            .filter(|hit| query.region.is_none_or(|region| region.contains(*hit)))
            .take(query.top_k)
            .collect())
    }

    fn pixel_at(&mut self, point: Point) -> HostResult<Rgb> {
        Ok(self.pixels.get(&point).copied().unwrap_or(self.background))
    }

    /// Known labels always answer; an unknown label captures the pointer
    /// position, as a user hovering and confirming would
    fn coordinates(&mut self, label: &str, _use_cache: bool) -> HostResult<Point> {
        if let Some(known) = self.known_coordinates(label) {
            return Ok(known);
        }
        let at = self.cursor;
        self.remember_coordinates(label, at);
        Ok(at)
    }

    fn pixel_color(&mut self, alias: &str, _use_cache: bool) -> HostResult<Rgb> {
        if let Some(known) = self.known_color(alias) {
            return Ok(known);
        }
        let color = self.pixel_at(self.cursor)?;
        self.remember_color(alias, color);
        Ok(color)
    }

    fn capture_region(&mut self, key: &str, _overwrite: bool) -> HostResult<Bounds> {
        self.known_region(key)
            .ok_or_else(|| HostError::unavailable("interactive region capture"))
    }

    fn ocr_find_text(&mut self, query: &OcrQuery) -> HostResult<Vec<OcrMatch>> {
        Ok(self
            .ocr
            .iter()
            .filter(|found| query.accepts(&found.text, found.confidence))
            .filter(|found| query.region.is_none_or(|bounds| within(bounds, found.bbox[0])))
            .cloned()
            .collect())
    }

    fn record(&mut self, name: &str, start_key: &str, stop_key: &str) -> HostResult<usize> {
        let input = QueuedInput(std::mem::take(&mut self.pending_input));
        let events = Recorder::new(start_key, stop_key).record(input, Some(self.cursor))?;
        let count = events.len();
        self.store_recording(name, events);
        Ok(count)
    }

    fn playback(&mut self, name: &str, _stop_key: &str) -> HostResult<usize> {
        let events = self
            .recordings
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::MissingRecording {
                name: name.to_string(),
            })?;

        let stop = StopFlag::new();
        let deadline = self.playback_stop_after.take().map(|after| self.clock + after);
        let mut sink = DesktopSink {
            desktop: self,
            stop: stop.clone(),
            deadline,
        };
        replay(&events, &mut sink, &stop)
    }

    fn recording_exists(&mut self, name: &str) -> bool {
        self.recordings.contains_key(name)
    }
}

fn within(bounds: Bounds, point: Point) -> bool {
    (bounds.left..=bounds.right).contains(&point.x) && (bounds.top..=bounds.bottom).contains(&point.y)
}

/// Pre-scripted input for `@record`
#[derive(Debug)]
pub struct QueuedInput(pub VecDeque<RecordedEvent>);

impl InputListener for QueuedInput {
    fn next_event(&mut self) -> Option<RecordedEvent> {
        self.0.pop_front()
    }
}

struct DesktopSink<'a> {
    desktop: &'a mut HeadlessHost,
    stop: StopFlag,
    /// Virtual time at which the stop key is pressed
    deadline: Option<f64>,
}

impl EventSink for DesktopSink<'_> {
    fn apply(&mut self, event: &RecordedEvent) -> HostResult<()> {
        if matches!(event.kind, EventKind::MouseMove | EventKind::MouseClick) {
            if let Some(target) = event.target() {
                self.desktop.cursor = target;
            }
        }
        self.desktop.actions.push(Action::Replayed(event.clone()));
        Ok(())
    }

    fn now(&mut self) -> f64 {
        self.desktop.clock
    }

    fn sleep(&mut self, duration: Duration) {
        self.desktop.advance(duration.as_secs_f64());
        if self.deadline.is_some_and(|deadline| self.desktop.clock >= deadline) {
            self.stop.set();
        }
    }
}
