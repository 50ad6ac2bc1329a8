use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::EvalError;

// ── Object ────────────────────────────────────────────────────────────────

/// A name → value mapping that expressions can read from.
///
/// Anything that implements `Object` can sit in a context stack as a scope,
/// be the receiver of a method call, or be the result of a property lookup.
/// Implementors may compute values on the fly (getters) and may have side
/// effects; that is how templates reach into application logic.
pub trait Object: 'static {
    /// Returns the value stored under `key` if this object owns it.
    fn get_own(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key`. Returns `false` if the object is read-only.
    fn set(&self, _key: &str, _value: Value) -> bool {
        false
    }

    /// Owned keys, in iteration order.
    fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Name used when the object is rendered as text (`[object <name>]`).
    fn type_name(&self) -> &str {
        "Object"
    }
}

// ── Record ────────────────────────────────────────────────────────────────

/// The stock mutable object: an insertion-ordered map with interior
/// mutability, so application code can keep an `Rc<Record>` and change data
/// between updates.
///
/// ```rust
/// use std::rc::Rc;
/// use nabu_expr::value::{Record, Value};
///
/// let data = Rc::new(Record::new().with("title", "Inbox").with("count", 3));
/// let scope = Value::from(data.clone());
/// data.insert("count", 4);
/// assert_eq!(scope.get_named("count"), Value::Int(4));
/// ```
#[derive(Default)]
pub struct Record {
    fields: RefCell<IndexMap<String, Value>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.borrow_mut().insert(key.into(), value.into());
        self
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.borrow_mut().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.fields.borrow_mut().shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Value {
        self.fields.borrow().get(key).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.borrow().is_empty()
    }
}

impl Object for Record {
    fn get_own(&self, key: &str) -> Option<Value> {
        self.fields.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> bool {
        self.fields.borrow_mut().insert(key.to_string(), value);
        true
    }

    fn keys(&self) -> Vec<String> {
        self.fields.borrow().keys().cloned().collect()
    }
}

// ── Function ──────────────────────────────────────────────────────────────

type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value, EvalError>;

/// A callable value. The first argument passed to the native closure is the
/// receiver (`this`): for `a.b()` that is `a`, for a bare `f()` it is the
/// scope that owns `f`.
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    call: Rc<NativeFn>,
}

impl Function {
    pub fn native<F>(name: impl Into<Rc<str>>, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + 'static,
    {
        Self { name: name.into(), call: Rc::new(f) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
        (self.call)(receiver, args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.call, &other.call)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

// ── Value ─────────────────────────────────────────────────────────────────

/// A dynamically typed value produced by a resolver.
///
/// Arrays, objects and functions are reference values: cloning a `Value`
/// shares them, and equality compares them by identity. Primitives compare
/// by value, with `Int` and `Float` compared numerically.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<dyn Object>),
    Function(Function),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object<O: Object>(object: Rc<O>) -> Self {
        Value::Object(object)
    }

    pub fn function<F>(name: &str, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + 'static,
    {
        Value::Function(Function::native(name, f))
    }

    /// Short type tag used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined   => "undefined",
            Value::Null        => "null",
            Value::Bool(_)     => "boolean",
            Value::Int(_)      => "integer",
            Value::Float(_)    => "float",
            Value::Str(_)      => "string",
            Value::Array(_)    => "array",
            Value::Object(_)   => "object",
            Value::Function(_) => "function",
        }
    }

    /// Identity for reference values, value equality for primitives.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Condition semantics for `if` directives.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Property owned by this value, if any.
    ///
    /// Objects answer through [`Object::get_own`]; arrays and strings own
    /// their integer indices and `length`. Every other value owns nothing.
    pub fn get_own(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(obj) => obj.get_own(key),
            Value::Array(items) => {
                let items = items.borrow();
                if key == "length" {
                    return Some(Value::Int(items.len() as i64));
                }
                key.parse::<usize>().ok().and_then(|i| items.get(i).cloned())
            }
            Value::Str(s) => {
                if key == "length" {
                    return Some(Value::Int(s.chars().count() as i64));
                }
                let i = key.parse::<usize>().ok()?;
                s.chars().nth(i).map(|c| Value::str(c.to_string()))
            }
            _ => None,
        }
    }

    /// Property lookup keyed by an evaluated value (`obj[key]`, `obj.key`).
    pub fn get(&self, key: &Value) -> Value {
        self.get_named(&key.to_string())
    }

    pub fn get_named(&self, key: &str) -> Value {
        self.get_own(key).unwrap_or_default()
    }

    /// Snapshot of the items a `forEach` directive walks.
    ///
    /// `undefined` and `null` iterate as empty lists so optional data can be
    /// left out of the context without failing the render. A string iterates
    /// its characters.
    pub fn items(&self) -> Result<Vec<Value>, EvalError> {
        match self {
            Value::Array(items) => Ok(items.borrow().clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
            Value::Undefined | Value::Null => Ok(Vec::new()),
            other => Err(EvalError::NotIterable { found: other.type_name().to_string() }),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Clones the items out of an array value.
    pub fn to_vec(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) => Some(items.borrow().clone()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

fn fmt_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        f.write_str("NaN")
    } else if v.is_infinite() {
        f.write_str(if v > 0.0 { "Infinity" } else { "-Infinity" })
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        write!(f, "{}", v as i64)
    } else {
        write!(f, "{}", v)
    }
}

/// Text form used by string interpolation and property keys.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => fmt_float(f, *v),
            Value::Str(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    // Holes render as empty, matching list joining elsewhere.
                    if !matches!(item, Value::Undefined | Value::Null) {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
            Value::Object(obj) => write!(f, "[object {}]", obj.type_name()),
            Value::Function(func) => write!(f, "function {}", func.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Object(obj) => {
                let mut map = f.debug_map();
                for key in obj.keys() {
                    let value = obj.get_own(&key).unwrap_or_default();
                    map.entry(&key, &value);
                }
                map.finish()
            }
            Value::Function(func) => write!(f, "{:?}", func),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl<O: Object> From<Rc<O>> for Value {
    fn from(obj: Rc<O>) -> Self {
        Value::Object(obj)
    }
}

/// Raw (non-string) template values become constants through this.
impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::str(s.as_str()),
            serde_json::Value::Array(items) => Value::array(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                let record = Record::new();
                for (key, value) in map {
                    record.insert(key.as_str(), Value::from(value));
                }
                Value::from(Rc::new(record))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_floats_print_without_fraction() {
        assert_eq!(Value::Float(2.0).to_string(), "2");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn arrays_join_with_commas() {
        let v = Value::array(vec![Value::Int(1), Value::str("a"), Value::Undefined]);
        assert_eq!(v.to_string(), "1,a,");
    }

    #[test]
    fn arrays_compare_by_identity() {
        let a = Value::array(vec![Value::Int(1)]);
        let b = Value::array(vec![Value::Int(1)]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn int_and_float_compare_numerically() {
        assert_eq!(Value::Int(3), Value::Float(3.0));
    }

    #[test]
    fn array_owns_indices_and_length() {
        let v = Value::array(vec![Value::Int(7), Value::Int(8)]);
        assert_eq!(v.get_named("1"), Value::Int(8));
        assert_eq!(v.get_named("length"), Value::Int(2));
        assert_eq!(v.get_own("5"), None);
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Undefined.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::str("").truthy());
        assert!(Value::str("0").truthy());
        assert!(Value::array(Vec::new()).truthy());
    }

    #[test]
    fn null_and_undefined_iterate_empty() {
        assert!(Value::Undefined.items().unwrap().is_empty());
        assert!(matches!(Value::Int(1).items(), Err(EvalError::NotIterable { .. })));
    }

    #[test]
    fn strings_iterate_their_characters() {
        let chars = Value::str("añb").items().unwrap();
        assert_eq!(chars, vec![Value::str("a"), Value::str("ñ"), Value::str("b")]);
        assert!(Value::str("").items().unwrap().is_empty());
    }

    #[test]
    fn json_objects_become_records() {
        let json = serde_json::json!({ "a": 1, "b": [true, 2.5], "c": null });
        let v = Value::from(&json);
        assert_eq!(v.get_named("a"), Value::Int(1));
        assert_eq!(v.get_named("b").get_named("1"), Value::Float(2.5));
        assert_eq!(v.get_own("c"), Some(Value::Null));
    }
}
