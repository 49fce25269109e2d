//! The tree‑walking evaluator.
//!
//! Walks statements and expressions directly, maintaining the current
//! environment and the resolver's distance side‑table.  All runtime
//! semantics live here or in the object model it drives.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::callable::{clock, LoxCallable};
use crate::class::{LoxClass, LoxInstance, LoxMetaClass};
use crate::environment::Environment;
use crate::error::{LoxError, Result, RuntimeError};
use crate::function::LoxFunction;
use crate::parser::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non‑local exits that unwind through statement execution.
///
/// This is the explicit three‑way outcome of every execution step:
/// `Ok(())` is normal completion, `Return` is the `return` control signal,
/// and `Error` is a genuine runtime failure.  `Return` is absorbed exactly
/// at the function‑call boundary ([`LoxFunction::call`]) and must never
/// reach [`Interpreter::interpret`]'s error handling.
#[derive(Debug)]
pub enum Unwind {
    /// The `return` control signal, carrying the returned value.
    Return(Value),

    /// A runtime error; aborts the current top‑level statement sequence.
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(e: RuntimeError) -> Self {
        Unwind::Error(e)
    }
}

/// Result alias for statement execution and expression evaluation.
pub type Exec<T> = std::result::Result<T, Unwind>;

pub struct Interpreter {
    /// The fixed outermost scope, pre‑seeded with host natives.
    globals: Rc<RefCell<Environment>>,

    /// The scope statements currently execute in; swapped (and always
    /// restored) around block and function bodies.
    environment: Rc<RefCell<Environment>>,

    /// Resolver side‑table: expression node identity → binding distance.
    /// References absent from this map are globals.
    locals: HashMap<ExprId, usize>,

    /// Sink for `print` statements.  Stdout by default; tests substitute
    /// a capture buffer.
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter and defines native functions such as `clock`.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Like [`Interpreter::new`], but `print` writes to the given sink.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");
        globals
            .borrow_mut()
            .define("clock", Value::NativeFunction(clock()));

        let environment = Rc::clone(&globals);

        Self {
            globals,
            environment,
            locals: HashMap::new(),
            output,
        }
    }

    /// Resolver callback: record that the expression node `id` binds at
    /// `depth` enclosing scopes from its evaluation environment.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Interprets a list of statements (a "program").
    ///
    /// A runtime error aborts the remaining statements of this run; the
    /// caller decides whether the process (or REPL loop) continues.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(Unwind::Error(e)) => return Err(LoxError::Runtime(e)),
                // The resolver rejects top-level `return`, so this signal
                // cannot escape a call boundary in a resolved program.
                Err(Unwind::Return(_)) => {
                    return Err(LoxError::Runtime(RuntimeError::Native(
                        "Cannot return from top-level code.".to_string(),
                    )))
                }
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────── statements ─────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Exec<()> {
        match stmt {
            Stmt::Expression(expr) => {
                let _ = self.evaluate(expr)?;
                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                debug!("Printing value: {}", value);
                writeln!(self.output, "{}", value)
                    .map_err(|e| RuntimeError::Native(e.to_string()))?;
                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }

            Stmt::Block(statements) => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));
                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }
                Ok(())
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Return signal with value: {}", value);
                Err(Unwind::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Execute `statements` inside `environment`, restoring the previous
    /// current environment on **every** exit path — normal completion, a
    /// runtime error, or the `return` signal.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Exec<()> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;
        result
    }

    /// Class declaration: build the metaclass and the class pointing at it,
    /// then assign into the slot declared (as `nil`) beforehand so methods
    /// can close over the class name.
    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Exec<()> {
        debug!("Declaring class '{}'", name.lexeme);

        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => {
                let value = self.evaluate(expr)?;
                match value {
                    Value::Class(class) => Some(class),
                    _ => {
                        let line = match expr {
                            Expr::Variable { name, .. } => name.line,
                            _ => name.line,
                        };
                        return Err(
                            RuntimeError::type_error(line, "Superclass must be a class.").into()
                        );
                    }
                }
            }
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Methods of a subclass resolve `super` one scope deeper; mirror
        // the resolver's extra scope here.
        if let Some(ref class) = superclass_value {
            let enclosing = Rc::clone(&self.environment);
            self.environment = Rc::new(RefCell::new(Environment::with_enclosing(enclosing)));
            self.environment
                .borrow_mut()
                .define("super", Value::Class(Rc::clone(class)));
        }

        let mut instance_methods: HashMap<String, LoxFunction> = HashMap::new();
        let mut class_methods: HashMap<String, LoxFunction> = HashMap::new();

        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function = LoxFunction::new(
                Rc::clone(method),
                Rc::clone(&self.environment),
                is_initializer,
            );

            if method.is_class_method {
                class_methods.insert(method.name.lexeme.clone(), function);
            } else {
                instance_methods.insert(method.name.lexeme.clone(), function);
            }
        }

        let metaclass = Rc::new(LoxMetaClass::new(
            name.lexeme.clone(),
            None,
            class_methods,
        ));
        let class = Rc::new(LoxClass::new(
            name.lexeme.clone(),
            superclass_value.clone(),
            instance_methods,
            metaclass,
        ));

        if superclass_value.is_some() {
            let enclosing = self.environment.borrow().enclosing();
            match enclosing {
                Some(env) => self.environment = env,
                None => {
                    return Err(RuntimeError::Native(
                        "No enclosing environment after class body.".to_string(),
                    )
                    .into())
                }
            }
        }

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(class))?;

        Ok(())
    }

    // ─────────────────────────── expressions ────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Exec<Value> {
        match expr {
            Expr::Literal(literal) => Ok(evaluate_literal(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        if !Environment::assign_at(
                            &self.environment,
                            distance,
                            name,
                            value.clone(),
                        ) {
                            return Err(RuntimeError::UndefinedVariable {
                                name: name.lexeme.clone(),
                                line: name.line,
                            }
                            .into());
                        }
                    }
                    None => {
                        self.globals.borrow_mut().assign(name, value.clone())?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value = self.evaluate(callee)?;

                let mut argument_values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_values.push(self.evaluate(argument)?);
                }

                self.call_value(&callee_value, paren, &argument_values)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        LoxInstance::get(&instance, name).map_err(Unwind::Error)
                    }
                    Value::Class(class) => LoxClass::get(&class, name).map_err(Unwind::Error),
                    _ => Err(RuntimeError::type_error(
                        name.line,
                        "Only instances have properties.",
                    )
                    .into()),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;
                        instance.borrow_mut().set(name, value.clone());
                        Ok(value)
                    }
                    Value::Class(class) => {
                        let value = self.evaluate(value)?;
                        class.set(name, value.clone());
                        Ok(value)
                    }
                    _ => {
                        Err(RuntimeError::type_error(name.line, "Only instances have fields.")
                            .into())
                    }
                }
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Exec<Value> {
        let right = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(
                    RuntimeError::type_error(operator.line, "Operand must be a number.").into(),
                ),
            },

            // Bang yields the operand's truthiness.
            TokenType::BANG => Ok(Value::Bool(is_truthy(&right))),

            _ => Err(RuntimeError::type_error(operator.line, "Invalid unary operator.").into()),
        }
    }

    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Exec<Value> {
        let left = self.evaluate(left)?;

        // Short-circuit returns the operand value itself, uncoerced.
        match operator.token_type {
            TokenType::OR if is_truthy(&left) => Ok(left),
            TokenType::AND if !is_truthy(&left) => Ok(left),
            _ => self.evaluate(right),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Exec<Value> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        let numbers = |l: &Value, r: &Value| -> std::result::Result<(f64, f64), Unwind> {
            match (l, r) {
                (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
                _ => Err(
                    RuntimeError::type_error(operator.line, "Operands must be numbers.").into(),
                ),
            }
        };

        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(RuntimeError::type_error(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )
                .into()),
            },

            TokenType::MINUS => {
                let (a, b) = numbers(&left, &right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = numbers(&left, &right)?;
                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                let (a, b) = numbers(&left, &right)?;
                if b == 0.0 {
                    Err(RuntimeError::DivisionByZero {
                        line: operator.line,
                    }
                    .into())
                } else {
                    Ok(Value::Number(a / b))
                }
            }

            TokenType::GREATER => {
                let (a, b) = numbers(&left, &right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = numbers(&left, &right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = numbers(&left, &right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = numbers(&left, &right)?;
                Ok(Value::Bool(a <= b))
            }

            // Equality also requires numeric operands in this dialect.
            TokenType::EQUAL_EQUAL => {
                numbers(&left, &right)?;
                Ok(Value::Bool(is_equal(&left, &right)))
            }

            TokenType::BANG_EQUAL => {
                numbers(&left, &right)?;
                Ok(Value::Bool(!is_equal(&left, &right)))
            }

            _ => Err(RuntimeError::type_error(operator.line, "Invalid binary operator.").into()),
        }
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Exec<Value> {
        // The resolver records a distance for every legal `super`.
        let distance = match self.locals.get(&id) {
            Some(&distance) => distance,
            None => {
                return Err(RuntimeError::type_error(
                    keyword.line,
                    "Cannot use 'super' outside of a class.",
                )
                .into())
            }
        };

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,
            _ => {
                return Err(
                    RuntimeError::type_error(keyword.line, "No superclass found.").into(),
                )
            }
        };

        // `this` lives one scope closer than `super`.
        let instance = match Environment::get_at(&self.environment, distance - 1, "this") {
            Some(value) => value,
            None => {
                return Err(
                    RuntimeError::type_error(keyword.line, "No instance found for 'this'.").into(),
                )
            }
        };

        // Resolution starts at the *defining* superclass, not the
        // instance's most-derived class.
        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(RuntimeError::UndefinedProperty {
                name: method.lexeme.clone(),
                line: method.line,
            }
            .into()),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Exec<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| {
                    Unwind::Error(RuntimeError::UndefinedVariable {
                        name: name.lexeme.clone(),
                        line: name.line,
                    })
                }),
            None => self.globals.borrow().get(name).map_err(Unwind::Error),
        }
    }

    /// Invoke a callable value: user function, class, metaclass, or native.
    fn call_value(&mut self, callee: &Value, paren: &Token, arguments: &[Value]) -> Exec<Value> {
        let callable: &dyn LoxCallable = match callee {
            Value::NativeFunction(native) => native,
            Value::Function(function) => function.as_ref(),
            Value::Class(class) => class,
            Value::Metaclass(meta) => meta,
            _ => {
                return Err(RuntimeError::type_error(
                    paren.line,
                    "Can only call functions and classes.",
                )
                .into())
            }
        };

        if arguments.len() != callable.arity() {
            return Err(RuntimeError::ArityMismatch {
                expected: callable.arity(),
                got: arguments.len(),
                line: paren.line,
            }
            .into());
        }

        callable.call(self, arguments).map_err(Unwind::Error)
    }
}

// ─────────────────────────────── helpers ────────────────────────────────

fn evaluate_literal(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

/// `nil` and `false` are falsy; every other value is truthy, including
/// `0` and the empty string.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// Structural equality for primitives, reference equality for objects
/// (see `Value::eq`).
fn is_equal(left: &Value, right: &Value) -> bool {
    left == right
}
