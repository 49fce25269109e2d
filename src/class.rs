//! The object model: instances, classes, and metaclasses.
//!
//! A class is itself an instance of its metaclass: the class object carries
//! a field map and resolves properties through the metaclass's method table,
//! which is where `class fun` ("static") methods live.  Classes and
//! metaclasses are distinct types sharing the method‑resolution contract
//! through [`ClassRef`] — composition over an inheritance chain.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::LoxCallable;
use crate::error::RuntimeError;
use crate::function::LoxFunction;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// The capability an instance needs from whatever constructed it:
/// "has a name; can resolve a method by name".
#[derive(Debug, Clone)]
pub enum ClassRef {
    Class(Rc<LoxClass>),
    Metaclass(Rc<LoxMetaClass>),
}

impl ClassRef {
    pub fn name(&self) -> &str {
        match self {
            ClassRef::Class(class) => &class.name,
            ClassRef::Metaclass(meta) => &meta.name,
        }
    }

    /// Most‑specific table first, then the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<LoxFunction> {
        match self {
            ClassRef::Class(class) => class.find_method(name),
            ClassRef::Metaclass(meta) => meta.find_method(name),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            ClassRef::Class(class) => Value::Class(Rc::clone(class)),
            ClassRef::Metaclass(meta) => Value::Metaclass(Rc::clone(meta)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metaclass
// ─────────────────────────────────────────────────────────────────────────────

/// The class‑of‑a‑class.  Holds the class‑level method table; calling a
/// metaclass instantiates it, which is what makes a class "an instance of
/// its metaclass".
#[derive(Debug)]
pub struct LoxMetaClass {
    pub name: String,
    /// Metaclass‑level method inheritance.  No surface syntax produces a
    /// non‑empty chain today, but resolution honours it.
    pub superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, LoxFunction>,
}

impl LoxMetaClass {
    pub fn new(
        name: impl Into<String>,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, LoxFunction>,
    ) -> Self {
        LoxMetaClass {
            name: name.into(),
            superclass,
            methods,
        }
    }

    pub fn find_method(&self, name: &str) -> Option<LoxFunction> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }
}

impl LoxCallable for Rc<LoxMetaClass> {
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Instantiate the metaclass, running a bound `init` if one exists.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        debug!("Instantiating metaclass '{}'", self.name);

        let instance = Rc::new(RefCell::new(LoxInstance::new(ClassRef::Metaclass(
            Rc::clone(self),
        ))));

        if let Some(initializer) = self.find_method("init") {
            initializer
                .bind(Value::Instance(Rc::clone(&instance)))
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Display for LoxMetaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} metaclass", self.name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Class
// ─────────────────────────────────────────────────────────────────────────────

/// A user‑defined class: instance‑method table, optional superclass, the
/// metaclass it is an instance of, and — because it *is* an instance — its
/// own field map.
#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, LoxFunction>,
    pub metaclass: Rc<LoxMetaClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxClass {
    pub fn new(
        name: impl Into<String>,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, LoxFunction>,
        metaclass: Rc<LoxMetaClass>,
    ) -> Self {
        LoxClass {
            name: name.into(),
            superclass,
            methods,
            metaclass,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Method resolution order: own table, then the superclass chain.
    /// Single inheritance only, so this is a straight walk to the root.
    pub fn find_method(&self, name: &str) -> Option<LoxFunction> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Property read on the class *object*: the `klass` pseudo‑field yields
    /// the metaclass, then class fields, then class‑level methods bound to
    /// the class itself.
    pub fn get(class: &Rc<LoxClass>, name: &Token) -> Result<Value, RuntimeError> {
        if name.lexeme == "klass" {
            return Ok(Value::Metaclass(Rc::clone(&class.metaclass)));
        }

        if let Some(value) = class.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = class.metaclass.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(
                method.bind(Value::Class(Rc::clone(class))),
            )));
        }

        Err(RuntimeError::UndefinedProperty {
            name: name.lexeme.clone(),
            line: name.line,
        })
    }

    /// Property write on the class object: straight into its field map.
    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

impl LoxCallable for Rc<LoxClass> {
    /// A class's call arity mirrors its initializer's, or 0 without one.
    /// `init` lookup includes inherited initializers.
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Construct a new instance, invoking a bound `init` when present.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        debug!("Instantiating class '{}'", self.name);

        let instance = Rc::new(RefCell::new(LoxInstance::new(ClassRef::Class(Rc::clone(
            self,
        )))));

        if let Some(initializer) = self.find_method("init") {
            initializer
                .bind(Value::Instance(Rc::clone(&instance)))
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Instance
// ─────────────────────────────────────────────────────────────────────────────

/// A bag of fields plus a reference to the class (or metaclass) that
/// created it.  Created only by invoking a class or metaclass as a callable.
#[derive(Debug)]
pub struct LoxInstance {
    klass: ClassRef,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(klass: ClassRef) -> Self {
        LoxInstance {
            klass,
            fields: HashMap::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        self.klass.name()
    }

    /// Property read.  Order: the reserved `klass` pseudo‑field (always the
    /// owning class reference, regardless of the field map), then fields,
    /// then methods bound to this instance, then — when the owning class is
    /// itself an instance of its metaclass — the class object's own
    /// properties.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> Result<Value, RuntimeError> {
        if name.lexeme == "klass" {
            return Ok(instance.borrow().klass.to_value());
        }

        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let klass = instance.borrow().klass.clone();

        if let Some(method) = klass.find_method(&name.lexeme) {
            let bound = method.bind(Value::Instance(Rc::clone(instance)));
            return Ok(Value::Function(Rc::new(bound)));
        }

        // The owning class is an object too; fall through to its
        // class‑level fields and methods before giving up.
        if let ClassRef::Class(class) = &klass {
            if let Ok(value) = LoxClass::get(class, name) {
                return Ok(value);
            }
        }

        Err(RuntimeError::UndefinedProperty {
            name: name.lexeme.clone(),
            line: name.line,
        })
    }

    /// Property write: straight into the field map, never through the
    /// method tables.  Creates the field if absent.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.klass.name())
    }
}
