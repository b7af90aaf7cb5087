//! Terminal host for scripts run from the command line.
//!
//! Pointer, keyboard and screen effects go to a [`HeadlessHost`] desktop
//! and are logged. What the user has to supply (positions, colours,
//! regions and recorded input) is asked for on the terminal and kept in
//! JSON caches so later runs can reuse it.

use crate::cache::{
    JsonCache, COORDINATES_CACHE, PIXEL_COLORS_CACHE, RECORDINGS_CACHE, REGIONS_CACHE,
};
use macroni_interpreter::recording::{replay, EventSink};
use macroni_interpreter::{
    Bounds, EventKind, HeadlessHost, Host, HostError, HostResult, InputListener, OcrMatch,
    OcrQuery, Point, RecordedEvent, Recorder, Rgb, StopFlag, TemplateQuery,
};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub struct ConsoleHost {
    desktop: HeadlessHost,
    coordinates: JsonCache<(i64, i64)>,
    colors: JsonCache<(u8, u8, u8)>,
    regions: JsonCache<(i64, i64, i64, i64)>,
    recordings: JsonCache<Vec<RecordedEvent>>,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl ConsoleHost {
    /// Host on the process's terminal with caches under `cache_dir`
    pub fn open(cache_dir: &Path) -> Self {
        Self::with_terminal(
            cache_dir,
            Box::new(stdin_reader()),
            Box::new(io::stdout()),
        )
    }

    pub fn with_terminal(cache_dir: &Path, input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        let coordinates = JsonCache::open(cache_dir, COORDINATES_CACHE);
        let colors = JsonCache::open(cache_dir, PIXEL_COLORS_CACHE);
        let regions = JsonCache::open(cache_dir, REGIONS_CACHE);
        let recordings: JsonCache<Vec<RecordedEvent>> = JsonCache::open(cache_dir, RECORDINGS_CACHE);

        let mut desktop = HeadlessHost::new();
        for (label, &(x, y)) in coordinates.entries() {
            desktop.remember_coordinates(label, Point::new(x, y));
        }
        for (alias, &(r, g, b)) in colors.entries() {
            desktop.remember_color(alias, Rgb::new(r, g, b));
        }
        for (key, &(left, top, right, bottom)) in regions.entries() {
            desktop.remember_region(key, Bounds { left, top, right, bottom });
        }
        for (name, events) in recordings.entries() {
            desktop.store_recording(name, events.clone());
        }
        tracing::debug!(
            coordinates = coordinates.len(),
            colors = colors.len(),
            regions = regions.len(),
            recordings = recordings.len(),
            "caches loaded"
        );

        Self {
            desktop,
            coordinates,
            colors,
            regions,
            recordings,
            input,
            output,
        }
    }

    pub fn desktop(&self) -> &HeadlessHost {
        &self.desktop
    }

    fn say(&mut self, line: &str) -> HostResult<()> {
        writeln!(self.output, "{line}")
            .and_then(|()| self.output.flush())
            .map_err(|e| HostError::failed(format!("cannot write to terminal: {e}")))
    }

    /// Show `prompt` and read one trimmed line
    fn ask(&mut self, prompt: &str) -> HostResult<String> {
        write!(self.output, "{prompt}")
            .and_then(|()| self.output.flush())
            .map_err(|e| HostError::failed(format!("cannot write to terminal: {e}")))?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => Err(HostError::input("end of input while waiting for an answer")),
            Ok(_) => Ok(line.trim().to_string()),
            Err(e) => Err(HostError::input(format!("cannot read answer: {e}"))),
        }
    }

    /// Ask until the answer is blank or `count` integers
    fn ask_numbers(&mut self, prompt: &str, count: usize) -> HostResult<Option<Vec<i64>>> {
        loop {
            let answer = self.ask(prompt)?;
            if answer.is_empty() {
                return Ok(None);
            }
            match parse_numbers(&answer, count) {
                Some(numbers) => return Ok(Some(numbers)),
                None => self.say(&format!("Expected {count} whole numbers separated by spaces"))?,
            }
        }
    }
}

impl Host for ConsoleHost {
    fn print(&mut self, line: &str) -> HostResult<()> {
        self.say(line)
    }

    fn sleep(&mut self, duration: Duration) -> HostResult<()> {
        thread::sleep(duration);
        Ok(())
    }

    fn epoch_seconds(&mut self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or_default()
    }

    fn mouse_move(&mut self, target: Point, pixels_per_second: f64, humanlike: bool) -> HostResult<()> {
        tracing::info!(%target, pixels_per_second, humanlike, "mouse move");
        self.desktop.mouse_move(target, pixels_per_second, humanlike)
    }

    fn mouse_position(&mut self) -> HostResult<Point> {
        self.desktop.mouse_position()
    }

    fn left_click(&mut self) -> HostResult<()> {
        tracing::info!(at = %self.desktop.cursor(), "left click");
        self.desktop.left_click()
    }

    fn send_input(&mut self, kind: &str, key: &str, action: &str) -> HostResult<()> {
        tracing::info!(kind, key, action, "input");
        self.desktop.send_input(kind, key, action)
    }

    fn press_and_release(&mut self, delay_ms: u64, keys: &[String]) -> HostResult<()> {
        tracing::info!(?keys, delay_ms, "press and release");
        thread::sleep(Duration::from_millis(delay_ms));
        self.desktop.press_and_release(0, keys)
    }

    fn find_templates(&mut self, query: &TemplateQuery) -> HostResult<Vec<Point>> {
        let path = query.path();
        if !path.exists() {
            tracing::warn!(template = %path.display(), "template image not found");
        }
        self.desktop.find_templates(query)
    }

    fn pixel_at(&mut self, point: Point) -> HostResult<Rgb> {
        self.desktop.pixel_at(point)
    }

    fn coordinates(&mut self, label: &str, use_cache: bool) -> HostResult<Point> {
        if use_cache {
            if let Some(known) = self.desktop.known_coordinates(label) {
                return Ok(known);
            }
        }

        let current = self.desktop.cursor();
        let prompt = format!("Position for '{label}' as X Y (blank for {current}): ");
        let at = match self.ask_numbers(&prompt, 2)? {
            Some(numbers) => Point::new(numbers[0], numbers[1]),
            None => current,
        };

        self.desktop.remember_coordinates(label, at);
        self.coordinates.insert(label, (at.x, at.y))?;
        Ok(at)
    }

    fn pixel_color(&mut self, alias: &str, use_cache: bool) -> HostResult<Rgb> {
        if use_cache {
            if let Some(known) = self.desktop.known_color(alias) {
                return Ok(known);
            }
        }

        let under_cursor = self.desktop.pixel_at(self.desktop.cursor())?;
        let prompt = format!(
            "Colour for '{alias}' as R G B (blank for {} {} {}): ",
            under_cursor.r, under_cursor.g, under_cursor.b
        );
        let color = match self.ask_numbers(&prompt, 3)? {
            Some(numbers) => rgb_from(&numbers)?,
            None => under_cursor,
        };

        self.desktop.remember_color(alias, color);
        self.colors.insert(alias, (color.r, color.g, color.b))?;
        Ok(color)
    }

    fn capture_region(&mut self, key: &str, overwrite: bool) -> HostResult<Bounds> {
        if !overwrite {
            if let Some(known) = self.desktop.known_region(key) {
                return Ok(known);
            }
        }

        let prompt = format!("Corners of region '{key}' as LEFT TOP RIGHT BOTTOM: ");
        let bounds = loop {
            if let Some(numbers) = self.ask_numbers(&prompt, 4)? {
                break Bounds::from_corners(
                    Point::new(numbers[0], numbers[1]),
                    Point::new(numbers[2], numbers[3]),
                );
            }
        };

        self.desktop.remember_region(key, bounds);
        self.regions
            .insert(key, (bounds.left, bounds.top, bounds.right, bounds.bottom))?;
        Ok(bounds)
    }

    fn ocr_find_text(&mut self, query: &OcrQuery) -> HostResult<Vec<OcrMatch>> {
        self.desktop.ocr_find_text(query)
    }

    fn record(&mut self, name: &str, start_key: &str, stop_key: &str) -> HostResult<usize> {
        self.say(&format!(
            "Recording '{name}': enter events as `move X Y`, `click [BUTTON] down|up` or `key NAME down|up`"
        ))?;
        self.say(&format!("Send `key {start_key} down` to start and `key {stop_key} down` to stop"))?;

        let listener = TextListener::new(stdin_reader());
        let events = Recorder::new(start_key, stop_key)
            .record(listener, Some(self.desktop.cursor()))?;

        let count = events.len();
        self.desktop.store_recording(name, events.clone());
        self.recordings.insert(name, events)?;
        Ok(count)
    }

    fn playback(&mut self, name: &str, stop_key: &str) -> HostResult<usize> {
        let events = self
            .desktop
            .recording(name)
            .map(<[RecordedEvent]>::to_vec)
            .ok_or_else(|| HostError::MissingRecording {
                name: name.to_string(),
            })?;

        tracing::info!(recording = name, events = events.len(), stop_key, "playback started");
        let stop = StopFlag::new();
        let mut sink = PacedSink {
            desktop: &mut self.desktop,
            started: Instant::now(),
        };
        replay(&events, &mut sink, &stop)
    }

    fn recording_exists(&mut self, name: &str) -> bool {
        self.desktop.recording_exists(name)
    }
}

/// Replays onto the desktop in wall-clock time
struct PacedSink<'a> {
    desktop: &'a mut HeadlessHost,
    started: Instant,
}

impl EventSink for PacedSink<'_> {
    fn apply(&mut self, event: &RecordedEvent) -> HostResult<()> {
        match event.kind {
            EventKind::MouseMove => match event.target() {
                Some(target) => self.desktop.mouse_move(target, 0.0, false),
                None => Ok(()),
            },
            EventKind::MouseClick => {
                if let Some(target) = event.target() {
                    self.desktop.mouse_move(target, 0.0, false)?;
                }
                self.desktop.send_input("mouse", &event.key, &event.action)
            }
            EventKind::KeyDown | EventKind::KeyUp => {
                self.desktop.send_input("keyboard", &event.key, &event.action)
            }
        }
    }

    fn now(&mut self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Stdin without read-ahead, so the debugger console and the recorder
/// thread see every line this host does not consume
fn stdin_reader() -> BufReader<io::Stdin> {
    BufReader::with_capacity(1, io::stdin())
}

/// Reads textual input events, one per line, for `@record`
pub struct TextListener<R> {
    reader: R,
    started: Instant,
}

impl<R: BufRead + Send + 'static> TextListener<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            started: Instant::now(),
        }
    }
}

impl<R: BufRead + Send + 'static> InputListener for TextListener<R> {
    fn next_event(&mut self) -> Option<RecordedEvent> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) | Err(_) => return None,
                Ok(_) => {}
            }
            let timestamp = self.started.elapsed().as_secs_f64();
            match parse_event(&line, timestamp) {
                Ok(Some(event)) => return Some(event),
                Ok(None) => {}
                Err(message) => tracing::warn!(line = line.trim(), %message, "ignoring input"),
            }
        }
    }
}

/// Parse one input line; blank lines and `#` comments yield `None`
pub fn parse_event(line: &str, timestamp: f64) -> Result<Option<RecordedEvent>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let pressed = |action: &str| match action {
        "down" => Ok(true),
        "up" => Ok(false),
        other => Err(format!("expected down or up, got '{other}'")),
    };
    let coordinate = |text: &str| {
        text.parse::<i64>()
            .map_err(|_| format!("'{text}' is not a whole number"))
    };

    let event = match words.as_slice() {
        [] => return Ok(None),
        [first, ..] if first.starts_with('#') => return Ok(None),
        ["move", x, y] => RecordedEvent::mouse_move(
            timestamp,
            Point::new(coordinate(*x)?, coordinate(*y)?),
            None,
        ),
        ["click", action] => {
            RecordedEvent::mouse_click(timestamp, "left", pressed(*action)?, Point::default())
        }
        ["click", button, action] => {
            RecordedEvent::mouse_click(timestamp, button, pressed(*action)?, Point::default())
        }
        ["key", key, action] => RecordedEvent::key(timestamp, key, pressed(*action)?),
        _ => return Err("unrecognised event".to_string()),
    };
    Ok(Some(event))
}

fn parse_numbers(answer: &str, count: usize) -> Option<Vec<i64>> {
    let numbers: Vec<i64> = answer
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    (numbers.len() == count).then_some(numbers)
}

fn rgb_from(numbers: &[i64]) -> HostResult<Rgb> {
    let channel = |value: i64| {
        u8::try_from(value)
            .map_err(|_| HostError::input(format!("colour channel {value} is outside 0..=255")))
    };
    Ok(Rgb::new(
        channel(numbers[0])?,
        channel(numbers[1])?,
        channel(numbers[2])?,
    ))
}
