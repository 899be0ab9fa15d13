//! The `Value` tagged union and its container payloads.
//!
//! Strings, arrays, objects, and enums are reference-semantic at the host
//! level: the source language treats them as owning raw pointers with no
//! cycles (objects and arrays only ever contain `Value`s; templates are
//! addressed by bytecode offset, not by pointer), so `Rc`/`RefCell` is a
//! correct, single-threaded substitute — see `DESIGN.md` for the full
//! reasoning. GEN is strictly single-threaded (no `Arc` needed, unlike the
//! teacher's multi-strand runtime).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Backing storage for an `object` instance: an ordinary property table.
#[derive(Debug, Default, PartialEq)]
pub struct ObjectData {
    pub properties: HashMap<String, Value>,
}

impl ObjectData {
    pub fn new() -> Self {
        ObjectData {
            properties: HashMap::new(),
        }
    }
}

/// Backing storage for an `enum`: members bound to sequential integers,
/// immutable once `ENUM_END` finalizes it.
#[derive(Debug, PartialEq)]
pub struct EnumData {
    pub members: HashMap<String, i64>,
}

/// What the GEN language talks about.
///
/// Copied by value except for `String`/`Array`/`Object`/`Enum`, whose
/// payload is shared via `Rc` so that mutation (property/element writes)
/// is visible through every outstanding reference — see §9(c) of the spec.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<ObjectData>>),
    Enum(Rc<EnumData>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Rc::from(s.into()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(data: ObjectData) -> Self {
        Value::Object(Rc::new(RefCell::new(data)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Boolean(_) => "Boolean",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Enum(_) => "Enum",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Length used by `SIZEOF`: character count for strings, element count
    /// for arrays. Returns `None` for types that have no length.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(a) => Some(a.borrow().len()),
            _ => None,
        }
    }
}

// Arrays/objects/enums compare by structural equality of their current
// contents; `HashMap`'s own `PartialEq` (keys+values equal, order
// irrelevant) makes the derive-equivalent hand impl below straightforward.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => *a.borrow() == *b.borrow(),
            (Value::Enum(a), Value::Enum(b)) => Rc::ptr_eq(a, b) || a.members == b.members,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{:.2}", n)
                }
            }
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Value::String(s) => write!(f, "\"{}\"", s)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                write!(f, "]")
            }
            Value::Object(_) => write!(f, "[object]"),
            Value::Enum(_) => write!(f, "[enum]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_print_without_decimals() {
        assert_eq!(Value::Number(14.0).to_string(), "14");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
    }

    #[test]
    fn fractional_numbers_print_with_two_decimals() {
        assert_eq!(Value::Number(3.14159).to_string(), "3.14");
    }

    #[test]
    fn arrays_quote_string_elements_only() {
        let arr = Value::array(vec![Value::Number(1.0), Value::string("hi")]);
        assert_eq!(arr.to_string(), "[1, \"hi\"]");
    }

    #[test]
    fn sizeof_counts_chars_and_elements() {
        assert_eq!(Value::string("hello").len(), Some(5));
        assert_eq!(Value::array(vec![Value::Number(1.0); 3]).len(), Some(3));
        assert_eq!(Value::Number(1.0).len(), None);
    }

    #[test]
    fn object_mutation_is_visible_through_shared_handles() {
        let obj = Value::object(ObjectData::new());
        let alias = obj.clone();
        if let Value::Object(cell) = &obj {
            cell.borrow_mut()
                .properties
                .insert("x".to_string(), Value::Number(3.0));
        }
        if let Value::Object(cell) = &alias {
            assert_eq!(cell.borrow().properties.get("x"), Some(&Value::Number(3.0)));
        } else {
            panic!("expected object");
        }
    }
}
