//! User‑defined functions and bound methods.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::LoxCallable;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::interpreter::{Interpreter, Unwind};
use crate::parser::FunctionDecl;
use crate::value::Value;

/// A function value: the shared declaration plus the environment captured
/// at declaration time.  Immutable once created; [`LoxFunction::bind`]
/// produces a *new* function rather than mutating this one, so a single
/// declaration can be bound to many instances independently.
#[derive(Debug, Clone)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Re‑close over a fresh child environment that defines `this` as the
    /// given instance (or class — class methods bind to the class object).
    pub fn bind(&self, instance: Value) -> LoxFunction {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", instance);

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(environment)),
            is_initializer: self.is_initializer,
        }
    }

    /// The `this` binding an initializer implicitly returns.  A bound
    /// initializer always has `this` in its immediate closure scope.
    fn bound_this(&self) -> Result<Value, RuntimeError> {
        Environment::get_at(&self.closure, 0, "this").ok_or_else(|| {
            RuntimeError::UndefinedVariable {
                name: "this".to_string(),
                line: self.declaration.name.line,
            }
        })
    }
}

impl LoxCallable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Execute the body under a fresh environment chained to the closure.
    ///
    /// The `Return` unwinding signal is captured *here* and nowhere else:
    /// an initializer yields its bound `this` regardless of any explicit
    /// `return;`, any other function yields the signalled value, and a body
    /// that falls through yields `nil`.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        debug!(
            "Calling function '{}' with {} argument(s)",
            self.name(),
            arguments.len()
        );

        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments.iter()) {
            environment.define(&param.lexeme, argument.clone());
        }

        let result =
            interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(environment)));

        match result {
            Ok(()) => {
                if self.is_initializer {
                    self.bound_this()
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(Unwind::Return(value)) => {
                if self.is_initializer {
                    self.bound_this()
                } else {
                    Ok(value)
                }
            }

            Err(Unwind::Error(e)) => Err(e),
        }
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
