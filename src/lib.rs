pub mod ast;
pub mod cli;
pub mod environment;
pub mod error;
pub mod object;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod stdlib;
pub mod tokenizer;

use environment::Env;
use error::{Error, Result};
use object::Object;
use runtime::Evaluator;
use std::rc::Rc;

pub use parser::parse;

/// Parses and evaluates `source` against `env`, keeping any bindings it
/// makes. A program that ends in an error object becomes [`Error::Runtime`].
pub fn interpret(source: &str, env: &Env) -> Result<Object> {
    let program = parse(source)?;

    match Evaluator::new(Rc::clone(env)).eval(&program) {
        Object::Error(message) => Err(Error::Runtime { message }),
        value => Ok(value),
    }
}
