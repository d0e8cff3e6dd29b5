//! A generic lexical scope stack shared by the declaration engine and the
//! code generator's frame layout (each needs the same block-nesting and
//! shadowing rules, just attached to different per-identifier payloads).

use std::collections::HashMap;

pub struct ScopeStack<V> {
    scopes: Vec<HashMap<String, V>>,
}

impl<V> ScopeStack<V> {
    #[must_use]
    pub fn new() -> Self {
        ScopeStack { scopes: vec![HashMap::new()] }
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the file scope");
        self.scopes.pop();
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn is_file_scope(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Declares `name` in the *current* scope, returning the entry it
    /// replaced (if any) in that same scope -- callers use this to detect
    /// same-scope redeclaration without being fooled by shadowing.
    pub fn declare(&mut self, name: &str, value: V) -> Option<V> {
        self.scopes.last_mut().unwrap().insert(name.to_string(), value)
    }

    /// Looks up `name` starting from the innermost scope outward.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&V> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    #[must_use]
    pub fn lookup_current(&self, name: &str) -> Option<&V> {
        self.scopes.last().unwrap().get(name)
    }

    #[must_use]
    pub fn lookup_file_scope(&self, name: &str) -> Option<&V> {
        self.scopes[0].get(name)
    }
}

impl<V> Default for ScopeStack<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_outer() {
        let mut s: ScopeStack<i32> = ScopeStack::new();
        s.declare("x", 1);
        s.push();
        s.declare("x", 2);
        assert_eq!(s.lookup("x"), Some(&2));
        s.pop();
        assert_eq!(s.lookup("x"), Some(&1));
    }

    #[test]
    fn redeclare_in_same_scope_returns_previous() {
        let mut s: ScopeStack<i32> = ScopeStack::new();
        assert_eq!(s.declare("x", 1), None);
        assert_eq!(s.declare("x", 2), Some(1));
    }
}
