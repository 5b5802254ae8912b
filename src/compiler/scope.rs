//! two distinct notions of "scope" live in the compiler, grounded on two
//! different original files:
//!
//! - [`ScopeStack`] is the parser's semantic-analysis stack of
//!   `name -> Type` maps (`util/scope_stack.hpp`): used to resolve
//!   identifiers and check types while building the AST.
//! - [`Scope`] is the code generator's model of the physical machine stack
//!   (`util/scope.{hpp,cpp}`): each entry is one pushed byte, named or
//!   anonymous, and `offset(name)` mirrors `[SP-k]` addressing.

use std::collections::HashMap;

use crate::compiler::types::Type;

/// the parser's name/type resolution stack. one frame per lexical scope -
/// global (functions), then one per function body, one per block.
#[derive(Default)]
pub struct ScopeStack {
    frames: Vec<HashMap<String, Type>>,
}

impl ScopeStack {
    pub fn new() -> ScopeStack {
        let mut stack = ScopeStack::default();
        stack.push(); // global scope
        stack
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn declare(&mut self, name: &str, ty: Type) -> bool {
        let frame = self.frames.last_mut().expect("at least the global frame exists");
        if frame.contains_key(name) {
            return false;
        }
        frame.insert(name.to_string(), ty);
        true
    }

    /// looks up `name`, innermost frame first.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn is_declared_in_current_frame(&self, name: &str) -> bool {
        self.frames
            .last()
            .map(|frame| frame.contains_key(name))
            .unwrap_or(false)
    }
}

/// one entry in the physical-stack model: a named slot with its declared
/// size, or an anonymous placeholder pushed by expression evaluation.
#[derive(Clone, Debug)]
struct Slot {
    name: Option<String>,
    size_bytes: usize,
}

/// mirrors the bytes actually pushed above a function's base pointer.
/// `offset(name)` returns the count of bytes above the named slot, plus
/// one - the `k` in `[SP-k]`.
#[derive(Default)]
pub struct Scope {
    slots: Vec<Slot>,
}

impl Scope {
    pub fn new() -> Scope {
        Scope::default()
    }

    /// declares a named variable occupying `size_bytes` stack bytes (one
    /// slot per byte, matching `declareVariable`'s placeholder padding).
    pub fn declare_variable(&mut self, name: &str, size_bytes: usize) {
        self.slots.push(Slot {
            name: Some(name.to_string()),
            size_bytes: 1,
        });
        for _ in 1..size_bytes {
            self.add_placeholder();
        }
    }

    pub fn add_placeholder(&mut self) {
        self.slots.push(Slot {
            name: None,
            size_bytes: 1,
        });
    }

    pub fn pop(&mut self) {
        self.slots.pop();
    }

    pub fn pop_n(&mut self, n: usize) {
        for _ in 0..n {
            self.pop();
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s.name.as_deref() == Some(name))
    }

    /// `1 + (slots pushed after the named slot)` - the `k` in `[SP-k]`.
    /// returns the offset of the *lowest-addressed* byte of a multi-byte
    /// variable (the first one declared via `declare_variable`).
    pub fn offset(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for slot in self.slots.iter().rev() {
            offset += 1;
            if slot.name.as_deref() == Some(name) {
                return Some(offset);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_of_top_slot_is_one() {
        let mut scope = Scope::new();
        scope.declare_variable("a", 1);
        assert_eq!(scope.offset("a"), Some(1));
    }

    #[test]
    fn placeholder_increases_prior_offsets_by_one() {
        let mut scope = Scope::new();
        scope.declare_variable("a", 1);
        let before = scope.offset("a").unwrap();
        scope.add_placeholder();
        assert_eq!(scope.offset("a"), Some(before + 1));
    }

    #[test]
    fn three_int_declarations_match_the_documented_stack_layout() {
        let mut scope = Scope::new();
        scope.declare_variable("a", 2);
        scope.declare_variable("b", 2);
        scope.declare_variable("c", 2);
        assert_eq!(scope.offset("a"), Some(6));
        assert_eq!(scope.offset("b"), Some(4));
        assert_eq!(scope.offset("c"), Some(2));

        scope.add_placeholder();
        assert_eq!(scope.offset("a"), Some(7));
        assert_eq!(scope.offset("b"), Some(5));
        assert_eq!(scope.offset("c"), Some(3));
    }

    #[test]
    fn scope_stack_resolves_innermost_first() {
        let mut stack = ScopeStack::new();
        stack.declare("x", Type::int());
        stack.push();
        stack.declare("x", Type::bool_());
        assert_eq!(stack.lookup("x"), Some(&Type::bool_()));
        stack.pop();
        assert_eq!(stack.lookup("x"), Some(&Type::int()));
    }
}
