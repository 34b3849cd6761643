use crate::object::Object;
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// Shared handle to a scope. Functions hold one to the scope they were
/// defined in; call frames hold one to their enclosing scope.
pub type Env = Rc<RefCell<Environment>>;

/// One level of the lexical scope chain. Links only ever point outward.
#[derive(Default)]
pub struct Environment {
    store: HashMap<String, Object>,
    outer: Option<Env>,
}

impl Environment {
    /// A fresh top-level scope.
    pub fn root() -> Env {
        Rc::new(RefCell::new(Self::default()))
    }

    /// A child scope whose lookups fall back to `outer`.
    pub fn enclosed(outer: &Env) -> Env {
        Rc::new(RefCell::new(Self {
            store: HashMap::new(),
            outer: Some(Rc::clone(outer)),
        }))
    }

    pub fn get(&self, name: &str) -> Option<Object> {
        match self.store.get(name) {
            Some(value) => Some(value.clone()),
            None => self
                .outer
                .as_ref()
                .and_then(|outer| outer.borrow().get(name)),
        }
    }

    /// Binds `name` in this scope, shadowing any outer binding.
    pub fn set(&mut self, name: impl Into<String>, value: Object) {
        self.store.insert(name.into(), value);
    }
}
