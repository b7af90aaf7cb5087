//! `@`-prefixed built-ins.
//!
//! Arguments are evaluated like any other expression list, checked for
//! count and kind here, and the side effect is handed to the [`Host`].
//! Collection helpers and randomness never touch the host.

use crate::context::{ExecutionContext, Node};
use crate::control::{values_of, Outcome, SignalKind};
use crate::error::{EvalError, HostError, Result};
use crate::host::{
    Bounds, Host, MAX_PIXEL_RADIUS, OcrMatch, OcrQuery, Point, Region, Rgb, TemplateQuery,
};
use crate::interpreter::Interpreter;
use crate::value::Value;
use macroni_parser::{Builtin, BuiltinCall, ExpressionKind};
use rand::Rng;
use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TOP_K: usize = 10;
const DEFAULT_START_KEY: &str = "space";
const DEFAULT_STOP_KEY: &str = "esc";

impl<H: Host> Interpreter<H> {
    pub(crate) fn call_builtin(
        &mut self,
        ctx: &ExecutionContext<'_>,
        call: &BuiltinCall,
    ) -> Result<Outcome> {
        let builtin = call.builtin;
        if builtin == Builtin::ForeachTick {
            return self.foreach_tick(ctx, call);
        }

        // Nothing may pause while the user is recording or watching a replay
        let args = if matches!(builtin, Builtin::Record | Builtin::Playback) {
            let quiet = ctx.clone().with_debug(false);
            values_of!(self, &quiet, &call.arguments)
        } else {
            values_of!(self, ctx, &call.arguments)
        };

        tracing::trace!(builtin = builtin.name(), arguments = args.len(), "calling built-in");
        self.dispatch(builtin, args).map(Outcome::Value)
    }

    /// Poll `provider` and run `handler` once per non-null tick.
    ///
    /// Both bodies run in the caller's frame. The provider ends the loop by
    /// producing null (directly or via `return null;`) or by `break`; a
    /// `continue` from the provider skips the handler for that tick. A
    /// `break` in the handler also ends the loop.
    fn foreach_tick(&mut self, ctx: &ExecutionContext<'_>, call: &BuiltinCall) -> Result<Outcome> {
        let names: Vec<&str> = call
            .arguments
            .iter()
            .filter_map(|argument| match &argument.kind {
                ExpressionKind::Identifier(name) => Some(name.name.as_str()),
                _ => None,
            })
            .collect();
        let &[provider, handler] = names.as_slice() else {
            return Err(EvalError::arity_mismatch("@foreach_tick", "two function names", names.len()));
        };

        let mut ticks = 0usize;
        loop {
            let provider_fn = ctx
                .function(provider)
                .ok_or_else(|| EvalError::undefined_function(provider))?;

            let tick = match self.eval_sibling(ctx, Node::Block(&provider_fn.body))? {
                Outcome::Value(value) => value,
                Outcome::Signal(signal) => match signal.kind {
                    SignalKind::Return => signal.into_payload(),
                    SignalKind::Break => break,
                    SignalKind::Continue => continue,
                },
            };
            if tick.is_null() {
                break;
            }

            let handler_fn = ctx
                .function(handler)
                .ok_or_else(|| EvalError::undefined_function(handler))?;
            ticks += 1;
            if let Outcome::Signal(signal) = self.eval_sibling(ctx, Node::Block(&handler_fn.body))? {
                if signal.kind == SignalKind::Break {
                    break;
                }
            }
        }

        tracing::debug!(provider, handler, ticks, "foreach_tick finished");
        Ok(Outcome::null())
    }

    fn dispatch(&mut self, builtin: Builtin, args: Vec<Value>) -> Result<Value> {
        let host_error = |error: HostError| EvalError::host(builtin.name(), error);

        match builtin {
            Builtin::Print => {
                let line: Vec<String> = args.iter().map(ToString::to_string).collect();
                self.host.print(&line.join(" ")).map_err(host_error)?;
                Ok(Value::Null)
            }

            Builtin::Wait => {
                arity_between(builtin, &args, 1, 3)?;
                let base = args[0].to_float("@wait duration")?;
                let total = match args.len() {
                    1 => args[0].clone(),
                    2 => {
                        let extra = self.uniform(0.0, args[1].to_float("@wait range")?)?;
                        Value::Float(base + extra)
                    }
                    _ => {
                        let extra = self.uniform(
                            args[1].to_float("@wait range")?,
                            args[2].to_float("@wait range")?,
                        )?;
                        Value::Float(base + extra)
                    }
                };

                let millis = total.to_float("@wait duration")?;
                tracing::info!(millis, "waiting");
                if millis > 0.0 {
                    let duration = Duration::try_from_secs_f64(millis / 1000.0).map_err(|_| {
                        EvalError::type_error(format!("@wait duration {millis} is out of range"))
                    })?;
                    self.host.sleep(duration).map_err(host_error)?;
                }
                Ok(total)
            }

            Builtin::Rand => {
                arity_between(builtin, &args, 1, 2)?;
                let (low, high) = match args.len() {
                    1 => (0.0, args[0].to_float("@rand bound")?),
                    _ => (args[0].to_float("@rand bound")?, args[1].to_float("@rand bound")?),
                };
                Ok(Value::Float(self.uniform(low, high)?))
            }

            Builtin::RandInt => {
                arity_between(builtin, &args, 1, 2)?;
                let (low, high) = match args.len() {
                    1 => (0, args[0].to_int("@rand_i bound")?),
                    _ => (args[0].to_int("@rand_i bound")?, args[1].to_int("@rand_i bound")?),
                };
                if low > high {
                    return Err(EvalError::type_error(format!(
                        "@rand_i range {low}..{high} is empty"
                    )));
                }
                Ok(Value::Integer(self.rng.gen_range(low..=high)))
            }

            Builtin::Time => Ok(Value::Float(self.host.epoch_seconds())),

            Builtin::MouseMove => {
                arity_between(builtin, &args, 3, 4)?;
                if args[0].is_null() || args[1].is_null() {
                    return Ok(Value::Null);
                }
                let target = Point::new(args[0].to_int("x")?, args[1].to_int("y")?);
                let speed = args[2].to_float("pixels per second")?;
                let humanlike = args.get(3).is_none_or(Value::is_truthy);
                self.host
                    .mouse_move(target, speed, humanlike)
                    .map_err(host_error)?;
                Ok(Value::Integer(0))
            }

            Builtin::SetTemplateDir => {
                arity_exactly(builtin, &args, 1)?;
                let dir = args[0].to_string();
                tracing::info!(dir = %dir, "template directory set");
                self.template_dir = PathBuf::from(&dir);
                Ok(Value::String(dir))
            }

            Builtin::FindTemplate => {
                arity_one_of(builtin, &args, &[1, 5])?;
                let query = TemplateQuery {
                    template_dir: self.template_dir.clone(),
                    name: args[0].to_string(),
                    region: region_from(&args[1..])?,
                    top_k: 1,
                };
                let found = self.host.find_templates(&query).map_err(host_error)?;
                Ok(match found.first() {
                    Some(point) => point_value(*point),
                    None => Value::tuple(vec![Value::Null, Value::Null]),
                })
            }

            Builtin::FindTemplates => {
                arity_one_of(builtin, &args, &[1, 2, 5, 6])?;
                let (region, top_k) = match args.len() {
                    2 => (None, Some(&args[1])),
                    5 => (region_from(&args[1..5])?, None),
                    6 => (region_from(&args[1..5])?, Some(&args[5])),
                    _ => (None, None),
                };
                let top_k = match top_k {
                    Some(value) => usize::try_from(value.to_int("top_k")?).unwrap_or(0),
                    None => DEFAULT_TOP_K,
                };
                let query = TemplateQuery {
                    template_dir: self.template_dir.clone(),
                    name: args[0].to_string(),
                    region,
                    top_k,
                };
                let found = self.host.find_templates(&query).map_err(host_error)?;
                Ok(Value::tuple(
                    found.into_iter().take(top_k).map(point_value).collect(),
                ))
            }

            Builtin::GetCoordinates => {
                arity_between(builtin, &args, 1, 2)?;
                let label = args[0].to_string();
                let use_cache = args.get(1).is_some_and(Value::is_truthy);
                let point = self
                    .host
                    .coordinates(&label, use_cache)
                    .map_err(host_error)?;
                Ok(point_value(point))
            }

            Builtin::CheckPixelColor => {
                arity_between(builtin, &args, 6, 7)?;
                let center = Point::new(args[0].to_int("x")?, args[1].to_int("y")?);
                let radius = args[2].to_int("radius")?;
                if radius > MAX_PIXEL_RADIUS {
                    return Err(EvalError::type_error(format!(
                        "@check_pixel_color radius {radius} exceeds {MAX_PIXEL_RADIUS}"
                    )));
                }
                let color = Rgb::new(
                    channel(&args[3], "red")?,
                    channel(&args[4], "green")?,
                    channel(&args[5], "blue")?,
                );
                let tolerance = match args.get(6) {
                    Some(value) => value.to_int("tolerance")?.clamp(0, 255) as u8,
                    None => 0,
                };
                let found = self
                    .host
                    .check_pixel_color(center, radius, color, tolerance)
                    .map_err(host_error)?;
                Ok(Value::from_bool(found))
            }

            Builtin::GetPixelColor => {
                arity_between(builtin, &args, 1, 2)?;
                let alias = args[0].to_string();
                let use_cache = args.get(1).is_some_and(Value::is_truthy);
                let color = self
                    .host
                    .pixel_color(&alias, use_cache)
                    .map_err(host_error)?;
                Ok(rgb_value(color))
            }

            Builtin::GetPixelAt => {
                arity_exactly(builtin, &args, 2)?;
                let point = Point::new(args[0].to_int("x")?, args[1].to_int("y")?);
                let color = self.host.pixel_at(point).map_err(host_error)?;
                Ok(rgb_value(color))
            }

            Builtin::LeftClick => {
                self.host.left_click().map_err(host_error)?;
                Ok(Value::Integer(0))
            }

            Builtin::SendInput => {
                arity_exactly(builtin, &args, 3)?;
                self.host
                    .send_input(&args[0].to_string(), &args[1].to_string(), &args[2].to_string())
                    .map_err(host_error)?;
                Ok(Value::Integer(0))
            }

            Builtin::PressAndRelease => {
                arity_at_least(builtin, &args, 2)?;
                let delay = u64::try_from(args[0].to_int("delay")?).unwrap_or(0);
                let keys: Vec<String> = args[1..].iter().map(ToString::to_string).collect();
                self.host
                    .press_and_release(delay, &keys)
                    .map_err(host_error)?;
                Ok(Value::Integer(0))
            }

            Builtin::Record => {
                arity_between(builtin, &args, 1, 3)?;
                let name = args[0].to_string();
                let start = text_or(args.get(1), DEFAULT_START_KEY);
                let stop = text_or(args.get(2), DEFAULT_STOP_KEY);
                let events = self
                    .host
                    .record(&name, &start, &stop)
                    .map_err(host_error)?;
                tracing::info!(recording = %name, events, "recording saved");
                Ok(Value::Integer(0))
            }

            Builtin::Playback => {
                arity_between(builtin, &args, 1, 2)?;
                let name = args[0].to_string();
                let stop = text_or(args.get(1), DEFAULT_STOP_KEY);
                let events = self.host.playback(&name, &stop).map_err(host_error)?;
                tracing::info!(recording = %name, events, "playback finished");
                Ok(Value::Integer(0))
            }

            Builtin::RecordingExists => {
                arity_exactly(builtin, &args, 1)?;
                Ok(Value::from_bool(
                    self.host.recording_exists(&args[0].to_string()),
                ))
            }

            Builtin::Len => {
                arity_exactly(builtin, &args, 1)?;
                let len = match &args[0] {
                    Value::Null => 0,
                    Value::List(items) => items.borrow().len(),
                    Value::Tuple(items) => items.len(),
                    Value::String(text) => text.chars().count(),
                    other => return Err(wrong_kind(builtin, "a list, tuple or string", other)),
                };
                Ok(Value::Integer(i64::try_from(len).unwrap_or(i64::MAX)))
            }

            Builtin::Shuffle => {
                arity_exactly(builtin, &args, 1)?;
                match &args[0] {
                    Value::Null => Ok(Value::tuple(Vec::new())),
                    Value::List(items) => {
                        let mut shuffled = items.borrow().clone();
                        shuffled.shuffle(&mut self.rng);
                        Ok(Value::list(shuffled))
                    }
                    Value::Tuple(items) => {
                        let mut shuffled = items.clone();
                        shuffled.shuffle(&mut self.rng);
                        Ok(Value::tuple(shuffled))
                    }
                    other => Err(wrong_kind(builtin, "a list or tuple", other)),
                }
            }

            Builtin::Append => {
                arity_exactly(builtin, &args, 2)?;
                let Value::List(items) = &args[0] else {
                    return Err(wrong_kind(builtin, "a list", &args[0]));
                };
                items.borrow_mut().push(args[1].clone());
                Ok(args[0].clone())
            }

            Builtin::Pop => {
                arity_between(builtin, &args, 1, 2)?;
                let Value::List(items) = &args[0] else {
                    return Err(wrong_kind(builtin, "a list", &args[0]));
                };
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    return Err(EvalError::type_error("@pop from an empty list"));
                }
                let position = match args.get(1) {
                    Some(index) => list_position(index, items.len(), builtin)?,
                    None => items.len() - 1,
                };
                Ok(items.remove(position))
            }

            Builtin::Swap => {
                arity_exactly(builtin, &args, 3)?;
                let Value::List(items) = &args[0] else {
                    return Err(wrong_kind(builtin, "a list", &args[0]));
                };
                {
                    let mut items = items.borrow_mut();
                    let first = list_position(&args[1], items.len(), builtin)?;
                    let second = list_position(&args[2], items.len(), builtin)?;
                    items.swap(first, second);
                }
                Ok(args[0].clone())
            }

            Builtin::Copy => {
                arity_exactly(builtin, &args, 1)?;
                Ok(args[0].shallow_copy())
            }

            Builtin::CaptureRegion => {
                arity_between(builtin, &args, 1, 2)?;
                let key = args[0].to_string();
                let overwrite = args.get(1).is_some_and(Value::is_truthy);
                let bounds = self
                    .host
                    .capture_region(&key, overwrite)
                    .map_err(host_error)?;
                Ok(bounds_value(bounds))
            }

            Builtin::OcrFindText => {
                arity_between(builtin, &args, 0, 4)?;
                let defaults = OcrQuery::default();
                let query = OcrQuery {
                    region: match args.first() {
                        Some(value) if !value.is_null() => Some(bounds_from(value)?),
                        _ => None,
                    },
                    min_confidence: match args.get(1) {
                        Some(value) => value.to_float("min_conf")?,
                        None => defaults.min_confidence,
                    },
                    filters: match args.get(2) {
                        Some(value) => filters_from(value),
                        None => Vec::new(),
                    },
                    upscale: match args.get(3) {
                        Some(value) => value.to_float("upscale")?,
                        None => defaults.upscale,
                    },
                };
                let matches = self.host.ocr_find_text(&query).map_err(host_error)?;
                Ok(Value::list(matches.into_iter().map(ocr_value).collect()))
            }

            Builtin::MousePosition => {
                let point = self.host.mouse_position().map_err(host_error)?;
                Ok(point_value(point))
            }

            Builtin::ForeachTick => Err(EvalError::internal(
                "@foreach_tick must be evaluated with its call site",
            )),
        }
    }

    /// Uniform float in `[low, high]`, bounds in either order
    fn uniform(&mut self, low: f64, high: f64) -> Result<f64> {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        if !(high - low).is_finite() {
            return Err(EvalError::type_error(format!(
                "random range {low}..{high} is too wide"
            )));
        }
        Ok(self.rng.gen_range(low..=high))
    }
}

fn arity_exactly(builtin: Builtin, args: &[Value], count: usize) -> Result<()> {
    arity_between(builtin, args, count, count)
}

fn arity_at_least(builtin: Builtin, args: &[Value], min: usize) -> Result<()> {
    if args.len() < min {
        return Err(EvalError::arity_mismatch(
            builtin.to_string(),
            format!("at least {min}"),
            args.len(),
        ));
    }
    Ok(())
}

fn arity_between(builtin: Builtin, args: &[Value], min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{min} to {max}")
    };
    Err(EvalError::arity_mismatch(builtin.to_string(), expected, args.len()))
}

fn arity_one_of(builtin: Builtin, args: &[Value], allowed: &[usize]) -> Result<()> {
    if allowed.contains(&args.len()) {
        return Ok(());
    }
    let counts: Vec<String> = allowed.iter().map(ToString::to_string).collect();
    let expected = match counts.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
        _ => counts.join(""),
    };
    Err(EvalError::arity_mismatch(builtin.to_string(), expected, args.len()))
}

fn wrong_kind(builtin: Builtin, expected: &str, found: &Value) -> EvalError {
    EvalError::type_error(format!(
        "{builtin} requires {expected}, got {}",
        found.type_name()
    ))
}

fn text_or(value: Option<&Value>, default: &str) -> String {
    value.map_or_else(|| default.to_string(), ToString::to_string)
}

fn channel(value: &Value, name: &str) -> Result<u8> {
    let level = value.to_int(name)?;
    u8::try_from(level)
        .map_err(|_| EvalError::type_error(format!("{name} must be between 0 and 255, got {level}")))
}

/// Index into a list of `len` items; only `0..len` is accepted
fn list_position(index: &Value, len: usize, builtin: Builtin) -> Result<usize> {
    let Value::Integer(position) = index else {
        return Err(EvalError::index_type(index.type_name()));
    };
    usize::try_from(*position)
        .ok()
        .filter(|position| *position < len)
        .ok_or_else(|| {
            EvalError::type_error(format!(
                "{builtin} index {position} out of range for list of length {len}"
            ))
        })
}

/// `left, top, width, height` following the template name, if present
fn region_from(args: &[Value]) -> Result<Option<Region>> {
    match args {
        [left, top, width, height] => Ok(Some(Region {
            left: left.to_int("region left")?,
            top: top.to_int("region top")?,
            width: width.to_int("region width")?,
            height: height.to_int("region height")?,
        })),
        _ => Ok(None),
    }
}

/// OCR regions are corner tuples as returned by `@capture_region`
fn bounds_from(value: &Value) -> Result<Bounds> {
    let items = value
        .sequence_items()
        .ok_or_else(|| EvalError::type_error(format!("region must be a tuple, got {}", value.type_name())))?;
    match items.as_slice() {
        [left, top, right, bottom] => Ok(Bounds::from_corners(
            Point::new(left.to_int("region")?, top.to_int("region")?),
            Point::new(right.to_int("region")?, bottom.to_int("region")?),
        )),
        _ => Err(EvalError::type_error(format!(
            "region needs 4 coordinates, got {}",
            items.len()
        ))),
    }
}

fn filters_from(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::List(_) | Value::Tuple(_) => value
            .sequence_items()
            .unwrap_or_default()
            .iter()
            .map(ToString::to_string)
            .collect(),
        other => vec![other.to_string()],
    }
}

fn point_value(point: Point) -> Value {
    Value::pair(point.x, point.y)
}

fn rgb_value(color: Rgb) -> Value {
    Value::tuple(vec![
        Value::Integer(i64::from(color.r)),
        Value::Integer(i64::from(color.g)),
        Value::Integer(i64::from(color.b)),
    ])
}

fn bounds_value(bounds: Bounds) -> Value {
    Value::tuple(vec![
        Value::Integer(bounds.left),
        Value::Integer(bounds.top),
        Value::Integer(bounds.right),
        Value::Integer(bounds.bottom),
    ])
}

fn ocr_value(found: OcrMatch) -> Value {
    Value::tuple(vec![
        Value::String(found.text),
        Value::Float(found.confidence),
        Value::tuple(found.bbox.into_iter().map(point_value).collect()),
    ])
}
