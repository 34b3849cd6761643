use crate::object::{Object, NULL};
use log::trace;
use std::{
    fmt::{self, Debug, Formatter},
    io::{self, Write},
};

pub type BuiltinFn = fn(&[Object]) -> Object;

/// A native function. Builtins validate their own arguments and report
/// misuse as an `Object::Error`.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl Debug for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<built-in {}>", self.name)
    }
}

// Helper macro to declare the builtin table
macro_rules! define_builtins {
    ($($name:literal => $func:ident),* $(,)?) => {
        static BUILTINS: &[Builtin] = &[
            $(Builtin { name: $name, func: $func },)*
        ];
    };
}

define_builtins! {
    "len" => len,
    "puts" => puts,
    "first" => first,
    "last" => last,
    "rest" => rest,
    "push" => push,
}

pub fn lookup(name: &str) -> Option<Builtin> {
    BUILTINS.iter().find(|b| b.name == name).copied()
}

pub fn builtins() -> &'static [Builtin] {
    BUILTINS
}

fn check_arity(args: &[Object], want: usize) -> Option<Object> {
    (args.len() != want).then(|| {
        Object::error(format!(
            "wrong number of arguments. got={}, want={}",
            args.len(),
            want
        ))
    })
}

fn expect_array<'a>(name: &str, arg: &'a Object) -> Result<&'a [Object], Object> {
    match arg {
        Object::Array(elements) => Ok(elements.as_slice()),
        other => Err(Object::error(format!(
            "argument to `{}` must be ARRAY, got {}",
            name,
            other.object_type()
        ))),
    }
}

fn len(args: &[Object]) -> Object {
    if let Some(err) = check_arity(args, 1) {
        return err;
    }

    match &args[0] {
        Object::String(s) => Object::Integer(s.chars().count() as i64),
        Object::Array(elements) => Object::Integer(elements.len() as i64),
        other => Object::error(format!(
            "argument to `len` not supported, got {}",
            other.object_type()
        )),
    }
}

fn puts(args: &[Object]) -> Object {
    match write_lines(&mut io::stdout().lock(), args) {
        Ok(()) => NULL,
        Err(err) => Object::error(format!("puts failed: {}", err)),
    }
}

// One inspection text per line.
fn write_lines(out: &mut impl Write, args: &[Object]) -> io::Result<()> {
    for arg in args {
        writeln!(out, "{}", arg)?;
    }
    out.flush()
}

fn first(args: &[Object]) -> Object {
    if let Some(err) = check_arity(args, 1) {
        return err;
    }

    match expect_array("first", &args[0]) {
        Ok(elements) => elements.first().cloned().unwrap_or(NULL),
        Err(err) => err,
    }
}

fn last(args: &[Object]) -> Object {
    if let Some(err) = check_arity(args, 1) {
        return err;
    }

    match expect_array("last", &args[0]) {
        Ok(elements) => elements.last().cloned().unwrap_or(NULL),
        Err(err) => err,
    }
}

fn rest(args: &[Object]) -> Object {
    if let Some(err) = check_arity(args, 1) {
        return err;
    }

    match expect_array("rest", &args[0]) {
        Ok([]) => NULL,
        Ok([_, tail @ ..]) => Object::array(tail.to_vec()),
        Err(err) => err,
    }
}

fn push(args: &[Object]) -> Object {
    if let Some(err) = check_arity(args, 2) {
        return err;
    }

    match expect_array("push", &args[0]) {
        Ok(elements) => {
            trace!("push onto array of {}", elements.len());
            let mut extended = elements.to_vec();
            extended.push(args[1].clone());
            Object::array(extended)
        }
        Err(err) => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Object>) -> Object {
        let builtin = lookup(name).unwrap_or_else(|| panic!("missing builtin {}", name));
        (builtin.func)(&args)
    }

    fn ints(values: &[i64]) -> Object {
        Object::array(values.iter().map(|&n| Object::Integer(n)).collect())
    }

    #[test]
    fn test_table() {
        let names: Vec<&str> = builtins().iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["len", "puts", "first", "last", "rest", "push"]);
        assert!(lookup("print").is_none());
    }

    #[test]
    fn test_len() {
        assert_eq!(call("len", vec![Object::string("")]), Object::Integer(0));
        assert_eq!(call("len", vec![Object::string("four")]), Object::Integer(4));
        assert_eq!(call("len", vec![Object::string("héllo")]), Object::Integer(5));
        assert_eq!(call("len", vec![ints(&[1, 2, 3])]), Object::Integer(3));
        assert_eq!(
            call("len", vec![Object::Integer(1)]),
            Object::error("argument to `len` not supported, got INTEGER")
        );
        assert_eq!(
            call("len", vec![Object::string("one"), Object::string("two")]),
            Object::error("wrong number of arguments. got=2, want=1")
        );
    }

    #[test]
    fn test_first_and_last() {
        assert_eq!(call("first", vec![ints(&[1, 2, 3])]), Object::Integer(1));
        assert_eq!(call("last", vec![ints(&[1, 2, 3])]), Object::Integer(3));
        assert_eq!(call("first", vec![ints(&[])]), NULL);
        assert_eq!(call("last", vec![ints(&[])]), NULL);
        assert_eq!(
            call("first", vec![Object::Integer(1)]),
            Object::error("argument to `first` must be ARRAY, got INTEGER")
        );
        assert_eq!(
            call("last", vec![Object::string("x")]),
            Object::error("argument to `last` must be ARRAY, got STRING")
        );
    }

    #[test]
    fn test_rest() {
        assert_eq!(call("rest", vec![ints(&[1, 2, 3])]), ints(&[2, 3]));
        assert_eq!(call("rest", vec![ints(&[1])]), ints(&[]));
        assert_eq!(call("rest", vec![ints(&[])]), NULL);
        assert_eq!(
            call("rest", vec![]),
            Object::error("wrong number of arguments. got=0, want=1")
        );
    }

    #[test]
    fn test_push_does_not_mutate() {
        let original = ints(&[]);
        let pushed = call("push", vec![original.clone(), Object::Integer(1)]);

        assert_eq!(pushed, ints(&[1]));
        assert_eq!(original, ints(&[]));
        assert_eq!(
            call("push", vec![Object::Integer(1), Object::Integer(1)]),
            Object::error("argument to `push` must be ARRAY, got INTEGER")
        );
        assert_eq!(
            call("push", vec![ints(&[])]),
            Object::error("wrong number of arguments. got=1, want=2")
        );
    }

    #[test]
    fn test_puts_output() -> io::Result<()> {
        let mut out = Vec::new();
        write_lines(
            &mut out,
            &[Object::string("hello"), Object::Integer(1), ints(&[1, 2]), NULL],
        )?;
        assert_eq!(String::from_utf8_lossy(&out), "hello\n1\n[1, 2]\nnull\n");

        let mut out = Vec::new();
        write_lines(&mut out, &[])?;
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn test_puts_returns_null() {
        assert_eq!(call("puts", vec![Object::string("hello"), Object::Integer(1)]), NULL);
        assert_eq!(call("puts", vec![]), NULL);
    }
}
