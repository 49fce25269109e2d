//! The dynamic value union the evaluator operates over.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::callable::NativeFunction;
use crate::class::{LoxClass, LoxInstance, LoxMetaClass};
use crate::function::LoxFunction;

/// Every value a Lox program can produce or store.
///
/// Primitives are held inline; functions, classes, metaclasses, and
/// instances are shared by reference (`Rc`), which is what gives closures
/// and bound methods their "lifetime = longest holder" semantics without a
/// tracing collector.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    NativeFunction(NativeFunction),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Metaclass(Rc<LoxMetaClass>),
    Instance(Rc<RefCell<LoxInstance>>),
}

impl PartialEq for Value {
    /// Structural equality for primitives; `nil == nil` is true; reference
    /// identity for callables and instances.  No implicit coercion across
    /// types: mixed comparisons are simply unequal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::NativeFunction(a), Value::NativeFunction(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Metaclass(a), Value::Metaclass(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                // Integral doubles print without the trailing ".0".
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::NativeFunction(native) => write!(f, "<native fn {}>", native.name),

            Value::Function(function) => write!(f, "{}", function),

            Value::Class(class) => write!(f, "{}", class),

            Value::Metaclass(meta) => write!(f, "{}", meta),

            Value::Instance(instance) => write!(f, "{}", instance.borrow()),
        }
    }
}
