//! Runtime value representation for the Macroni interpreter.
//!
//! Booleans are the integers 1 and 0. Lists are shared mutable handles, so a
//! list passed into a function and appended to there is seen by the caller;
//! tuples are plain immutable vectors.

use crate::error::{EvalError, Result};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

pub type ListHandle = Rc<RefCell<Vec<Value>>>;

/// Identity of a list handle, used to spot a list that contains itself
type ListId = *const RefCell<Vec<Value>>;

/// Largest string (in bytes) or sequence `*` may build
pub const MAX_REPEATED_LEN: usize = 1 << 24;

/// Runtime values in the Macroni interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Null,
    /// Ordered mutable sequence, shared by reference
    List(ListHandle),
    /// Ordered immutable sequence
    Tuple(Vec<Value>),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items)
    }

    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    pub fn from_bool(flag: bool) -> Self {
        Value::Integer(i64::from(flag))
    }

    /// Point-like pair, as returned by the coordinate built-ins
    pub fn pair(x: i64, y: i64) -> Self {
        Value::Tuple(vec![Value::Integer(x), Value::Integer(y)])
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Null => "null",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness for `if`, `&&` and `||`
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Null => false,
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
        }
    }

    /// Elements of a list or tuple, copied out of the container
    pub fn sequence_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.borrow().clone()),
            Value::Tuple(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// Integer view of a numeric value; floats truncate toward zero
    pub fn to_int(&self, what: &str) -> Result<i64> {
        match self {
            Value::Integer(n) => Ok(*n),
            Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
            other => Err(EvalError::type_error(format!(
                "{what} must be a number, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn to_float(&self, what: &str) -> Result<f64> {
        match self {
            Value::Integer(n) => Ok(*n as f64),
            Value::Float(f) => Ok(*f),
            other => Err(EvalError::type_error(format!(
                "{what} must be a number, got {}",
                other.type_name()
            ))),
        }
    }

    /// Representation used inside collections: strings are quoted
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => format!("{s:?}"),
            _ => self.to_string(),
        }
    }

    /// A list already being written is shown as `[...]`
    fn write_to(
        &self,
        f: &mut fmt::Formatter<'_>,
        quoted: bool,
        open: &mut Vec<ListId>,
    ) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.abs() < 1e16 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::String(s) if quoted => write!(f, "{s:?}"),
            Value::String(s) => f.write_str(s),
            Value::Null => f.write_str("null"),
            Value::List(items) => {
                let id = Rc::as_ptr(items);
                if open.contains(&id) {
                    return f.write_str("[...]");
                }
                open.push(id);
                f.write_str("[")?;
                write_items(f, &items.borrow(), open)?;
                open.pop();
                f.write_str("]")
            }
            Value::Tuple(items) => {
                f.write_str("(")?;
                write_items(f, items, open)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }

    /// Shallow copy: a new list handle with the same elements
    pub fn shallow_copy(&self) -> Value {
        match self {
            Value::List(items) => Value::list(items.borrow().clone()),
            other => other.clone(),
        }
    }

    // Arithmetic operations

    /// `+`: string coercion when either side is a string, numeric otherwise,
    /// concatenation for two lists or two tuples
    pub fn add(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{self}{other}")))
            }
            (Value::Integer(a), Value::Integer(b)) => a
                .checked_add(*b)
                .map(Value::Integer)
                .ok_or_else(|| EvalError::overflow("addition")),
            (Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::list(items))
            }
            (Value::Tuple(a), Value::Tuple(b)) => {
                let mut items = a.clone();
                items.extend(b.iter().cloned());
                Ok(Value::Tuple(items))
            }
            _ => self.float_op(other, "+", |a, b| a + b),
        }
    }

    pub fn subtract(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a
                .checked_sub(*b)
                .map(Value::Integer)
                .ok_or_else(|| EvalError::overflow("subtraction")),
            _ => self.float_op(other, "-", |a, b| a - b),
        }
    }

    /// `*`: numeric, or repetition of a string or sequence by an integer
    pub fn multiply(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a
                .checked_mul(*b)
                .map(Value::Integer)
                .ok_or_else(|| EvalError::overflow("multiplication")),
            (Value::String(s), Value::Integer(n)) | (Value::Integer(n), Value::String(s)) => {
                let count = repeat_count(s.len(), *n)?;
                Ok(Value::String(s.repeat(count)))
            }
            (Value::List(items), Value::Integer(n)) | (Value::Integer(n), Value::List(items)) => {
                let items = items.borrow();
                let count = repeat_count(items.len(), *n)?;
                Ok(Value::list(repeat_items(&items, count)))
            }
            (Value::Tuple(items), Value::Integer(n)) | (Value::Integer(n), Value::Tuple(items)) => {
                let count = repeat_count(items.len(), *n)?;
                Ok(Value::Tuple(repeat_items(items, count)))
            }
            _ => self.float_op(other, "*", |a, b| a * b),
        }
    }

    /// `/` always produces a float
    pub fn divide(&self, other: &Value) -> Result<Value> {
        let (a, b) = self.numeric_pair(other, "/")?;
        if b == 0.0 {
            return Err(EvalError::division_by_zero());
        }
        Ok(Value::Float(a / b))
    }

    /// `%` is floored (the result takes the divisor's sign); whole float
    /// results become integers
    pub fn modulo(&self, other: &Value) -> Result<Value> {
        if let (Value::Integer(a), Value::Integer(b)) = (self, other) {
            if *b == 0 {
                return Err(EvalError::division_by_zero());
            }
            let rem = a
                .checked_rem(*b)
                .ok_or_else(|| EvalError::overflow("modulo"))?;
            let floored = if rem != 0 && (rem < 0) != (*b < 0) {
                rem + b
            } else {
                rem
            };
            return Ok(Value::Integer(floored));
        }

        let (a, b) = self.numeric_pair(other, "%")?;
        if b == 0.0 {
            return Err(EvalError::division_by_zero());
        }
        let mut rem = a % b;
        if rem != 0.0 && (rem < 0.0) != (b < 0.0) {
            rem += b;
        }
        if rem.fract() == 0.0 && rem.abs() < i64::MAX as f64 {
            Ok(Value::Integer(rem as i64))
        } else {
            Ok(Value::Float(rem))
        }
    }

    pub fn negate(&self) -> Result<Value> {
        match self {
            Value::Integer(n) => n
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| EvalError::overflow("negation")),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(EvalError::type_error(format!(
                "bad operand type for unary -: {}",
                other.type_name()
            ))),
        }
    }

    fn numeric_pair(&self, other: &Value, op: &str) -> Result<(f64, f64)> {
        match (self, other) {
            (
                Value::Integer(_) | Value::Float(_),
                Value::Integer(_) | Value::Float(_),
            ) => Ok((self.to_float(op)?, other.to_float(op)?)),
            _ => Err(unsupported(op, self, other)),
        }
    }

    fn float_op(&self, other: &Value, op: &str, apply: impl Fn(f64, f64) -> f64) -> Result<Value> {
        let (a, b) = self.numeric_pair(other, op)?;
        Ok(Value::Float(apply(a, b)))
    }

    // Comparison operations

    /// Language equality: numbers compare across int/float, sequences and
    /// strings structurally, null only equals null. Two distinct lists that
    /// each contain themselves cannot be compared.
    pub fn equals(&self, other: &Value) -> Result<bool> {
        self.equals_within(other, &mut Vec::new())
    }

    fn equals_within(&self, other: &Value, open: &mut Vec<(ListId, ListId)>) -> Result<bool> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(a == b),
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                Ok(self.to_float("")? == other.to_float("")?)
            }
            (Value::String(a), Value::String(b)) => Ok(a == b),
            (Value::Null, Value::Null) => Ok(true),
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                enter(a, b, open)?;
                let equal = sequences_equal(&a.borrow(), &b.borrow(), open);
                open.pop();
                equal
            }
            (Value::Tuple(a), Value::Tuple(b)) => sequences_equal(a, b, open),
            _ => Ok(false),
        }
    }

    /// Ordering for `<`, `<=`, `>`, `>=`; `None` when floats are unordered
    pub fn compare(&self, other: &Value, op: &str) -> Result<Option<Ordering>> {
        self.compare_within(other, op, &mut Vec::new())
    }

    fn compare_within(
        &self,
        other: &Value,
        op: &str,
        open: &mut Vec<(ListId, ListId)>,
    ) -> Result<Option<Ordering>> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Some(a.cmp(b))),
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                let (a, b) = self.numeric_pair(other, op)?;
                Ok(a.partial_cmp(&b))
            }
            (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(Some(Ordering::Equal));
                }
                enter(a, b, open)?;
                let ordering = compare_sequences(&a.borrow(), &b.borrow(), op, open);
                open.pop();
                ordering
            }
            (Value::Tuple(a), Value::Tuple(b)) => compare_sequences(a, b, op, open),
            _ => Err(unsupported(op, self, other)),
        }
    }

    /// `container[index]`: negative indexes count from the end; anything out
    /// of range, and a null container, yields null
    pub fn index(&self, index: &Value) -> Result<Value> {
        let Value::Integer(position) = index else {
            return Err(EvalError::index_type(index.type_name()));
        };

        match self {
            Value::Null => Ok(Value::Null),
            Value::List(items) => Ok(element_at(&items.borrow(), *position)),
            Value::Tuple(items) => Ok(element_at(items, *position)),
            Value::String(text) => {
                let chars: Vec<char> = text.chars().collect();
                Ok(resolve_index(chars.len(), *position)
                    .map(|i| Value::String(chars[i].to_string()))
                    .unwrap_or(Value::Null))
            }
            other => Err(EvalError::type_error(format!(
                "'{}' value is not indexable",
                other.type_name()
            ))),
        }
    }
}

/// Repetition count for `*`; negative counts give an empty result
fn repeat_count(len: usize, n: i64) -> Result<usize> {
    let count = usize::try_from(n).unwrap_or(0);
    match len.checked_mul(count) {
        Some(total) if total <= MAX_REPEATED_LEN => Ok(count),
        _ => Err(EvalError::overflow("repetition")),
    }
}

fn repeat_items(items: &[Value], count: usize) -> Vec<Value> {
    if items.is_empty() {
        return Vec::new();
    }
    let mut repeated = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        repeated.extend_from_slice(items);
    }
    repeated
}

/// Mark the pair of lists `a`, `b` as under comparison; meeting the same
/// pair again means both are self-referencing
fn enter(a: &ListHandle, b: &ListHandle, open: &mut Vec<(ListId, ListId)>) -> Result<()> {
    let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
    if open.contains(&pair) {
        return Err(EvalError::type_error("cannot compare lists that contain themselves"));
    }
    open.push(pair);
    Ok(())
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value], open: &mut Vec<ListId>) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.write_to(f, true, open)?;
    }
    Ok(())
}

fn unsupported(op: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::type_error(format!(
        "unsupported operand types for {op}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

fn sequences_equal(a: &[Value], b: &[Value], open: &mut Vec<(ListId, ListId)>) -> Result<bool> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (x, y) in a.iter().zip(b) {
        if !x.equals_within(y, open)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn compare_sequences(
    a: &[Value],
    b: &[Value],
    op: &str,
    open: &mut Vec<(ListId, ListId)>,
) -> Result<Option<Ordering>> {
    for (x, y) in a.iter().zip(b) {
        if x.equals_within(y, open)? {
            continue;
        }
        return x.compare_within(y, op, open);
    }
    Ok(Some(a.len().cmp(&b.len())))
}

fn resolve_index(len: usize, position: i64) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if position < 0 { len + position } else { position };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

fn element_at(items: &[Value], position: i64) -> Value {
    resolve_index(items.len(), position)
        .map(|i| items[i].clone())
        .unwrap_or(Value::Null)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, false, &mut Vec::new())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}
