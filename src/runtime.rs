use crate::{
    ast::{BinaryOp, BlockStatement, Expression, Program, Statement, UnaryOp},
    environment::{Env, Environment},
    object::{Function, HashPair, HashTable, Hashable, Object, NULL},
    stdlib,
};
use log::{trace, warn};
use std::rc::Rc;

// Returns early from the enclosing evaluation when `$obj` is an Error or a
// ReturnValue, otherwise yields it.
macro_rules! propagate {
    ($obj:expr) => {{
        let obj = $obj;
        if obj.is_signal() {
            return obj;
        }
        obj
    }};
}

/// Tree-walking evaluator for a single session.
///
/// Holds the root environment so that successive programs (for example REPL
/// lines) see each other's bindings, and an optional step budget that turns
/// runaway evaluation into an `Error` object.
pub struct Evaluator {
    env: Env,
    steps: usize,
    step_limit: Option<usize>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Environment::root())
    }
}

impl Evaluator {
    pub fn new(env: Env) -> Self {
        Self {
            env,
            steps: 0,
            step_limit: None,
        }
    }

    /// Caps the number of evaluation steps for each call to [`Evaluator::eval`].
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Evaluates a whole program to its terminal object. The result is never
    /// a `ReturnValue`; it is an `Error` when evaluation failed.
    pub fn eval(&mut self, program: &Program) -> Object {
        self.steps = 0;
        let env = Rc::clone(&self.env);

        let mut result = NULL;
        for statement in &program.statements {
            result = self.eval_statement(statement, &env);
            match result {
                Object::ReturnValue(value) => return *value,
                Object::Error(_) => return result,
                _ => (),
            }
        }
        result
    }

    fn tick(&mut self) -> Option<Object> {
        self.steps += 1;
        match self.step_limit {
            Some(limit) if self.steps > limit => {
                warn!("evaluation stopped after {} steps", limit);
                Some(Object::error(format!(
                    "evaluation budget exceeded: {} steps",
                    limit
                )))
            }
            _ => None,
        }
    }

    fn eval_block(&mut self, block: &BlockStatement, env: &Env) -> Object {
        let mut result = NULL;
        for statement in &block.statements {
            result = propagate!(self.eval_statement(statement, env));
        }
        result
    }

    fn eval_statement(&mut self, statement: &Statement, env: &Env) -> Object {
        if let Some(err) = self.tick() {
            return err;
        }

        match statement {
            Statement::Let { name, value } => {
                let value = propagate!(self.eval_expression(value, env));
                env.borrow_mut().set(name.as_str(), value);
                NULL
            }
            Statement::Return(value) => {
                let value = propagate!(self.eval_expression(value, env));
                Object::ReturnValue(Box::new(value))
            }
            Statement::Expression(expr) => self.eval_expression(expr, env),
        }
    }

    fn eval_expression(&mut self, expr: &Expression, env: &Env) -> Object {
        if let Some(err) = self.tick() {
            return err;
        }

        match expr {
            Expression::Integer(n) => Object::Integer(*n),
            Expression::Boolean(b) => Object::from_bool(*b),
            Expression::String(s) => Object::string(s),
            Expression::Identifier(name) => eval_identifier(name, env),
            Expression::Prefix { operator, right } => {
                let right = propagate!(self.eval_expression(right, env));
                eval_prefix(*operator, right)
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => {
                let left = propagate!(self.eval_expression(left, env));
                let right = propagate!(self.eval_expression(right, env));
                eval_infix(*operator, &left, &right)
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = propagate!(self.eval_expression(condition, env));
                if condition.is_truthy() {
                    self.eval_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env)
                } else {
                    NULL
                }
            }
            Expression::Function { parameters, body } => Object::Function(Rc::new(Function {
                parameters: parameters.clone(),
                body: Rc::clone(body),
                env: Rc::clone(env),
            })),
            Expression::Call {
                function,
                arguments,
            } => {
                let function = propagate!(self.eval_expression(function, env));
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(propagate!(self.eval_expression(argument, env)));
                }
                self.apply_function(function, args)
            }
            Expression::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(propagate!(self.eval_expression(element, env)));
                }
                Object::array(values)
            }
            Expression::Index { left, index } => {
                let left = propagate!(self.eval_expression(left, env));
                let index = propagate!(self.eval_expression(index, env));
                eval_index(&left, &index)
            }
            Expression::Hash(pairs) => self.eval_hash(pairs, env),
        }
    }

    fn eval_hash(&mut self, pairs: &[(Expression, Expression)], env: &Env) -> Object {
        let mut table = HashTable::new();

        for (key_expr, value_expr) in pairs {
            let key = propagate!(self.eval_expression(key_expr, env));
            let Some(hash_key) = key.hash_key() else {
                return Object::error(format!("unusable as hash key: {}", key.object_type()));
            };
            let value = propagate!(self.eval_expression(value_expr, env));
            table.insert(hash_key, HashPair { key, value });
        }

        Object::Hash(Rc::new(table))
    }

    fn apply_function(&mut self, function: Object, args: Vec<Object>) -> Object {
        match function {
            Object::Function(function) => {
                if function.parameters.len() != args.len() {
                    return Object::error(format!(
                        "wrong number of arguments: want={}, got={}",
                        function.parameters.len(),
                        args.len()
                    ));
                }

                trace!("calling fn({})", function.parameters.join(", "));
                let call_env = Environment::enclosed(&function.env);
                {
                    let mut frame = call_env.borrow_mut();
                    for (param, arg) in function.parameters.iter().zip(args) {
                        frame.set(param.as_str(), arg);
                    }
                }

                match self.eval_block(&function.body, &call_env) {
                    Object::ReturnValue(value) => *value,
                    other => other,
                }
            }
            Object::Builtin(builtin) => {
                trace!("calling builtin {}", builtin.name);
                (builtin.func)(&args)
            }
            other => Object::error(format!("not a function: {}", other.object_type())),
        }
    }
}

fn eval_identifier(name: &str, env: &Env) -> Object {
    if let Some(value) = env.borrow().get(name) {
        return value;
    }

    match stdlib::lookup(name) {
        Some(builtin) => Object::Builtin(builtin),
        None => Object::error(format!("identifier not found: {}", name)),
    }
}

fn eval_prefix(operator: UnaryOp, right: Object) -> Object {
    match operator {
        UnaryOp::Not => Object::from_bool(!right.is_truthy()),
        UnaryOp::Negate => match right {
            Object::Integer(n) => Object::Integer(n.wrapping_neg()),
            other => Object::error(format!("unknown operator: -{}", other.object_type())),
        },
    }
}

fn eval_infix(operator: BinaryOp, left: &Object, right: &Object) -> Object {
    match (left, right) {
        (Object::Integer(a), Object::Integer(b)) => eval_integer_infix(operator, *a, *b),
        (Object::String(a), Object::String(b)) if operator == BinaryOp::Add => {
            Object::String(format!("{}{}", a, b).into())
        }
        _ if left.object_type() != right.object_type() => Object::error(format!(
            "type mismatch: {} {} {}",
            left.object_type(),
            operator,
            right.object_type()
        )),
        (Object::String(_), Object::String(_)) => unknown_operator(operator, left, right),
        _ => match operator {
            BinaryOp::Equal => Object::from_bool(same_value(left, right)),
            BinaryOp::NotEqual => Object::from_bool(!same_value(left, right)),
            _ => unknown_operator(operator, left, right),
        },
    }
}

fn unknown_operator(operator: BinaryOp, left: &Object, right: &Object) -> Object {
    Object::error(format!(
        "unknown operator: {} {} {}",
        left.object_type(),
        operator,
        right.object_type()
    ))
}

// Booleans and null compare by value; collections and functions by identity.
fn same_value(left: &Object, right: &Object) -> bool {
    match (left, right) {
        (Object::Boolean(a), Object::Boolean(b)) => a == b,
        (Object::Null, Object::Null) => true,
        (Object::Array(a), Object::Array(b)) => Rc::ptr_eq(a, b),
        (Object::Hash(a), Object::Hash(b)) => Rc::ptr_eq(a, b),
        (Object::Function(a), Object::Function(b)) => Rc::ptr_eq(a, b),
        (Object::Builtin(a), Object::Builtin(b)) => a.name == b.name,
        _ => false,
    }
}

fn eval_integer_infix(operator: BinaryOp, a: i64, b: i64) -> Object {
    match operator {
        BinaryOp::Add => Object::Integer(a.wrapping_add(b)),
        BinaryOp::Subtract => Object::Integer(a.wrapping_sub(b)),
        BinaryOp::Multiply => Object::Integer(a.wrapping_mul(b)),
        BinaryOp::Divide => match b {
            0 => Object::error("division by zero"),
            _ => Object::Integer(a.wrapping_div(b)),
        },
        BinaryOp::Less => Object::from_bool(a < b),
        BinaryOp::Greater => Object::from_bool(a > b),
        BinaryOp::Equal => Object::from_bool(a == b),
        BinaryOp::NotEqual => Object::from_bool(a != b),
    }
}

fn eval_index(left: &Object, index: &Object) -> Object {
    match (left, index) {
        (Object::Array(elements), Object::Integer(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or(NULL),
        (Object::Hash(table), key) => match key.hash_key() {
            Some(hash_key) => table
                .get(&hash_key)
                .map(|pair| pair.value.clone())
                .unwrap_or(NULL),
            None => Object::error(format!("unusable as hash key: {}", key.object_type())),
        },
        _ => Object::error(format!(
            "index operator not supported: {}",
            left.object_type()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Result,
        object::{FALSE, TRUE},
        parse,
    };

    fn eval_str(source: &str) -> Result<Object> {
        let program = parse(source)?;
        Ok(Evaluator::default().eval(&program))
    }

    fn assert_evals(cases: &[(&str, Object)]) -> Result<()> {
        for (source, expected) in cases {
            assert_eq!(&eval_str(source)?, expected, "source: {}", source);
        }
        Ok(())
    }

    fn int(n: i64) -> Object {
        Object::Integer(n)
    }

    #[test]
    fn test_integer_expressions() -> Result<()> {
        assert_evals(&[
            ("5", int(5)),
            ("-10", int(-10)),
            ("5 + 5 + 5 + 5 - 10", int(10)),
            ("2 * 2 * 2 * 2 * 2", int(32)),
            ("-50 + 100 + -50", int(0)),
            ("5 + 2 * 10", int(25)),
            ("20 + 2 * -10", int(0)),
            ("50 / 2 * 2 + 10", int(60)),
            ("2 * (5 + 10)", int(30)),
            ("3 * (3 * 3) + 10", int(37)),
            ("(5 + 10 * 2 + 15 / 3) * 2 + -10", int(50)),
            ("7 / 2", int(3)),
            ("-7 / 2", int(-3)),
        ])
    }

    #[test]
    fn test_boolean_expressions() -> Result<()> {
        assert_evals(&[
            ("true", TRUE),
            ("false", FALSE),
            ("1 < 2", TRUE),
            ("1 > 2", FALSE),
            ("1 < 1", FALSE),
            ("1 == 1", TRUE),
            ("1 != 1", FALSE),
            ("true == true", TRUE),
            ("true != false", TRUE),
            ("false == false", TRUE),
            ("(1 < 2) == true", TRUE),
            ("(1 > 2) == true", FALSE),
        ])
    }

    #[test]
    fn test_bang_operator() -> Result<()> {
        assert_evals(&[
            ("!true", FALSE),
            ("!false", TRUE),
            ("!5", FALSE),
            ("!0", FALSE),
            ("!!true", TRUE),
            ("!!5", TRUE),
            ("!if (false) { 1 }", TRUE),
        ])
    }

    #[test]
    fn test_if_else_expressions() -> Result<()> {
        assert_evals(&[
            ("if (true) { 10 }", int(10)),
            ("if (false) { 10 }", NULL),
            ("if (0) { 10 }", int(10)),
            ("if (1 < 2) { 10 }", int(10)),
            ("if (1 > 2) { 10 } else { 20 }", int(20)),
            ("if (1 < 2) { 10 } else { 20 }", int(10)),
            ("if (\"\") { 1 } else { 2 }", int(1)),
        ])
    }

    #[test]
    fn test_return_statements() -> Result<()> {
        assert_evals(&[
            ("return 10;", int(10)),
            ("return 10; 9;", int(10)),
            ("return 2 * 5; 9;", int(10)),
            ("9; return 2 * 5; 9;", int(10)),
            (
                "if (10 > 1) { if (10 > 1) { return 10; } return 1; }",
                int(10),
            ),
            (
                "let f = fn(x) { return x; x + 10; }; f(10);",
                int(10),
            ),
            (
                "let f = fn(x) { let result = x + 10; return result; return 10; }; f(10);",
                int(20),
            ),
        ])
    }

    #[test]
    fn test_error_handling() -> Result<()> {
        assert_evals(&[
            ("5 + true;", Object::error("type mismatch: INTEGER + BOOLEAN")),
            ("5 + true; 5;", Object::error("type mismatch: INTEGER + BOOLEAN")),
            ("5 == true", Object::error("type mismatch: INTEGER == BOOLEAN")),
            ("-true", Object::error("unknown operator: -BOOLEAN")),
            ("true + false;", Object::error("unknown operator: BOOLEAN + BOOLEAN")),
            ("5; true + false; 5", Object::error("unknown operator: BOOLEAN + BOOLEAN")),
            (
                "if (10 > 1) { true + false; }",
                Object::error("unknown operator: BOOLEAN + BOOLEAN"),
            ),
            (
                "if (10 > 1) { if (10 > 1) { return true + false; } return 1; }",
                Object::error("unknown operator: BOOLEAN + BOOLEAN"),
            ),
            ("foobar", Object::error("identifier not found: foobar")),
            (
                "\"Hello\" - \"World\"",
                Object::error("unknown operator: STRING - STRING"),
            ),
            (
                "\"a\" == \"a\"",
                Object::error("unknown operator: STRING == STRING"),
            ),
            (
                "{\"name\": \"Monkey\"}[fn(x) { x }];",
                Object::error("unusable as hash key: FUNCTION"),
            ),
            ("1 / 0", Object::error("division by zero")),
            ("5()", Object::error("not a function: INTEGER")),
            ("1[0]", Object::error("index operator not supported: INTEGER")),
        ])
    }

    #[test]
    fn test_errors_short_circuit() -> Result<()> {
        assert_evals(&[
            ("let x = foo; x", Object::error("identifier not found: foo")),
            ("[1, missing, 3]", Object::error("identifier not found: missing")),
            ("len(missing)", Object::error("identifier not found: missing")),
            ("missing(1)", Object::error("identifier not found: missing")),
            ("-missing", Object::error("identifier not found: missing")),
            ("if (missing) { 1 }", Object::error("identifier not found: missing")),
            ("[1][missing]", Object::error("identifier not found: missing")),
            (
                "{missing: undefined_value}",
                Object::error("identifier not found: missing"),
            ),
            (
                "{[1]: undefined_value}",
                Object::error("unusable as hash key: ARRAY"),
            ),
        ])
    }

    #[test]
    fn test_left_operand_evaluates_first() -> Result<()> {
        assert_evals(&[(
            "left + right",
            Object::error("identifier not found: left"),
        )])
    }

    #[test]
    fn test_let_statements() -> Result<()> {
        assert_evals(&[
            ("let a = 5; a;", int(5)),
            ("let a = 5 * 5; a;", int(25)),
            ("let a = 5; let b = a; b;", int(5)),
            ("let a = 5; let b = a; let c = a + b + 5; c;", int(15)),
            ("let a = 5;", NULL),
            ("", NULL),
        ])
    }

    #[test]
    fn test_failed_let_does_not_bind() {
        let env = Environment::root();
        let mut evaluator = Evaluator::new(Rc::clone(&env));

        let program = crate::parse("let x = 1 / 0;").unwrap();
        assert!(evaluator.eval(&program).is_error());
        assert_eq!(env.borrow().get("x"), None);
    }

    #[test]
    fn test_functions() -> Result<()> {
        let result = eval_str("fn(x) { x + 2; };")?;
        match result {
            Object::Function(function) => {
                assert_eq!(function.parameters, vec!["x"]);
                assert_eq!(function.body.to_string(), "{ (x + 2) }");
            }
            other => panic!("expected function, got {:?}", other),
        }

        assert_evals(&[
            ("let identity = fn(x) { x; }; identity(5);", int(5)),
            ("let identity = fn(x) { return x; }; identity(5);", int(5)),
            ("let double = fn(x) { x * 2; }; double(5);", int(10)),
            ("let add = fn(x, y) { x + y; }; add(5, 5);", int(10)),
            ("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", int(20)),
            ("fn(x) { x; }(5)", int(5)),
            ("fn() {}()", NULL),
        ])
    }

    #[test]
    fn test_closures() -> Result<()> {
        assert_evals(&[
            (
                "let newAdder = fn(x) { fn(y) { x + y } }; let addTwo = newAdder(2); addTwo(3);",
                int(5),
            ),
            (
                "let x = 1; let f = fn() { x }; let x = 2; f()",
                int(2),
            ),
            (
                "let fib = fn(n) { if (n < 2) { n } else { fib(n - 1) + fib(n - 2) } }; fib(10)",
                int(55),
            ),
            (
                "let apply_twice = fn(f, x) { f(f(x)) }; apply_twice(fn(x) { x + 1 }, 5)",
                int(7),
            ),
            ("let x = 10; let f = fn(x) { x }; f(1); x", int(10)),
        ])
    }

    #[test]
    fn test_arity_mismatch() -> Result<()> {
        assert_evals(&[
            (
                "let f = fn(x) { x }; f(1, 2)",
                Object::error("wrong number of arguments: want=1, got=2"),
            ),
            (
                "fn(x, y) { x }(1)",
                Object::error("wrong number of arguments: want=2, got=1"),
            ),
        ])
    }

    #[test]
    fn test_strings() -> Result<()> {
        assert_evals(&[
            ("\"Hello World!\"", Object::string("Hello World!")),
            ("\"Hello\" + \" \" + \"World!\"", Object::string("Hello World!")),
        ])
    }

    #[test]
    fn test_builtins() -> Result<()> {
        assert_evals(&[
            ("len(\"\")", int(0)),
            ("len(\"four\")", int(4)),
            ("len(\"hello world\")", int(11)),
            (
                "len(1)",
                Object::error("argument to `len` not supported, got INTEGER"),
            ),
            (
                "len(\"one\", \"two\")",
                Object::error("wrong number of arguments. got=2, want=1"),
            ),
            ("len([1, 2, 3])", int(3)),
            ("first([1, 2, 3])", int(1)),
            ("last([1, 2, 3])", int(3)),
            ("rest([1, 2, 3])", Object::array(vec![int(2), int(3)])),
            ("rest([])", NULL),
            ("push([], 1)", Object::array(vec![int(1)])),
            ("let a = []; let b = push(a, 1); len(a)", int(0)),
            ("let len = fn(x) { 42 }; len([1])", int(42)),
        ])
    }

    #[test]
    fn test_builtin_values() -> Result<()> {
        let result = eval_str("len")?;
        assert_eq!(result.object_type().to_string(), "BUILTIN");
        assert_eq!(result.inspect(), "builtin function");
        assert_evals(&[("len == len", TRUE), ("len == first", FALSE)])
    }

    #[test]
    fn test_arrays() -> Result<()> {
        assert_eq!(
            eval_str("[1, 2 * 2, 3 + 3]")?,
            Object::array(vec![int(1), int(4), int(6)])
        );

        assert_evals(&[
            ("[1, 2, 3][0]", int(1)),
            ("[1, 2, 3][2]", int(3)),
            ("let i = 0; [1][i];", int(1)),
            ("[1, 2, 3][1 + 1];", int(3)),
            ("let myArray = [1, 2, 3]; myArray[2];", int(3)),
            (
                "let myArray = [1, 2, 3]; myArray[0] + myArray[1] + myArray[2];",
                int(6),
            ),
            ("[1, 2, 3][3]", NULL),
            ("[1, 2, 3][-1]", NULL),
            ("let a = [1]; a == a", TRUE),
            ("[1] == [1]", FALSE),
        ])
    }

    #[test]
    fn test_hashes() -> Result<()> {
        let result = eval_str(
            "let two = \"two\"; {\"one\": 10 - 9, two: 1 + 1, \"thr\" + \"ee\": 6 / 2, 4: 4, true: 5, false: 6}",
        )?;
        assert_eq!(
            result.inspect(),
            "{one: 1, two: 2, three: 3, 4: 4, true: 5, false: 6}"
        );

        assert_evals(&[
            ("{\"one\": 1}[\"one\"]", int(1)),
            ("{\"foo\": 5}[\"foo\"]", int(5)),
            ("{\"foo\": 5}[\"bar\"]", NULL),
            ("let key = \"foo\"; {\"foo\": 5}[key]", int(5)),
            ("{}[\"x\"]", NULL),
            ("{5: 5}[5]", int(5)),
            ("{true: 5}[true]", int(5)),
            ("{false: 5}[false]", int(5)),
            ("{1: 1, 1: 2}[1]", int(2)),
            ("{1: \"int\", true: \"bool\"}[true]", Object::string("bool")),
        ])
    }

    #[test]
    fn test_step_budget() -> Result<()> {
        let program = parse("let loop = fn(n) { loop(n + 1) }; loop(0)")?;
        let mut evaluator = Evaluator::default().with_step_limit(1_000);
        assert_eq!(
            evaluator.eval(&program),
            Object::error("evaluation budget exceeded: 1000 steps")
        );

        // The budget applies per evaluation, not per session.
        let program = parse("1 + 1")?;
        assert_eq!(evaluator.eval(&program), int(2));
        Ok(())
    }

    #[test]
    fn test_session_keeps_bindings() -> Result<()> {
        let mut evaluator = Evaluator::default();
        evaluator.eval(&parse("let add = fn(a, b) { a + b };")?);
        assert_eq!(evaluator.eval(&parse("add(2, 3)")?), int(5));
        assert!(evaluator.env().borrow().get("add").is_some());
        Ok(())
    }
}
