//! Lexical scopes: a chain of mutable name → value maps.
//!
//! Each environment points at most once to the environment that was current
//! when it was created, so the chain is a tree by construction and never
//! cycles.  Closures and nested blocks share their defining environment
//! through `Rc<RefCell<…>>`; a scope stays alive exactly as long as some
//! closure, bound method, or inner scope can still reach it.

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// A root scope with no parent (the globals).
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    /// A child scope chained to `enclosing`.
    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// The scope this one was created under, if any.
    pub fn enclosing(&self) -> Option<Rc<RefCell<Environment>>> {
        self.enclosing.as_ref().map(Rc::clone)
    }

    /// Insert or overwrite a binding in *this* scope only.  Never fails.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Name‑walking lookup: this scope, else the enclosing chain.
    ///
    /// Only used for **global** references; locals go through the
    /// resolver‑computed distance path ([`Environment::get_at`]).
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.lexeme.clone(),
                line: name.line,
            })
        }
    }

    /// Same walk as [`Environment::get`], but overwrites the first scope
    /// where the name already exists.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if self.values.contains_key(&name.lexeme) {
            self.values.insert(name.lexeme.clone(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.lexeme.clone(),
                line: name.line,
            })
        }
    }

    /// Hop exactly `distance` enclosing links up from `env` (0 = `env`
    /// itself).  `distance` must equal the value the resolver computed for
    /// the reference being evaluated; `None` means that invariant was
    /// violated.
    fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.as_ref().map(Rc::clone)?;
            current = next;
        }

        Some(current)
    }

    /// Read `name` directly in the scope `distance` links up from `env`,
    /// bypassing the name walk.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
        let target = Self::ancestor(env, distance)?;
        let value = target.borrow().values.get(name).cloned();
        value
    }

    /// Write `name` directly in the scope `distance` links up from `env`.
    /// Returns `false` if the chain is shorter than `distance`.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> bool {
        match Self::ancestor(env, distance) {
            Some(target) => {
                target.borrow_mut().values.insert(name.lexeme.clone(), value);
                true
            }
            None => false,
        }
    }
}
