//! The "can be invoked with N arguments" capability.
//!
//! Implemented by user functions, classes, metaclasses, and host natives,
//! so the evaluator's call dispatch never needs to know which it is
//! invoking.  Adding another native touches nothing but the globals seed.

use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::debug;

use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Anything a Lox program can call.
///
/// `call` returns `Result<Value, RuntimeError>` rather than the
/// interpreter's unwinding result: the `return` control signal is absorbed
/// at the call boundary by each implementation and can never leak through
/// this interface.
pub trait LoxCallable {
    /// Number of arguments the callable expects.  Checked by the evaluator
    /// before `call` is invoked.
    fn arity(&self) -> usize;

    /// Invoke with an argument list whose length equals `arity()`.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError>;
}

/// A host‑provided native function: a plain function pointer with a name
/// and fixed arity.  Cheap to clone and compare, and trivially `Callable`.
#[derive(Debug, Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.func as usize == other.func as usize
    }
}

impl LoxCallable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _: &mut Interpreter, arguments: &[Value]) -> Result<Value, RuntimeError> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(arguments).map_err(RuntimeError::Native)
    }
}

/// The one native every interpreter seeds: wall‑clock time in seconds.
pub fn clock() -> NativeFunction {
    NativeFunction {
        name: "clock",
        arity: 0,
        func: |_args: &[Value]| {
            let timestamp: f64 = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                .as_secs_f64();
            Ok(Value::Number(timestamp))
        },
    }
}
