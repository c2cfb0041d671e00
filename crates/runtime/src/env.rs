//! Symbol interning and the environment chain
//!
//! The intern table maps string content to one canonical symbol cell;
//! interning the same spelling twice answers the same cell, which is what
//! makes symbol identity meaningful. Interned cells are retained by the
//! table and live for the life of the interpreter.
//!
//! An environment is a hash whose parent field forms the lexical-scope
//! chain. Lookup walks the chain; `define` writes the current frame;
//! `set!` writes the frame that already binds the name, or the root.

use cellisp_core::hash;
use cellisp_core::heap::Heap;
use cellisp_core::string;
use cellisp_core::value::Value;

use crate::interp::Interp;

/// Canonicalise a string (or symbol) cell into the interned symbol of the
/// same spelling. A fresh spelling is retagged in place and stored; the
/// table keeps it alive permanently.
pub fn intern(interp: &mut Interp, name: Value) -> Value {
    let key = string::as_string_key(name);
    let found = hash::get(&interp.heap, interp.symbols, key);
    if found != Value::Nil {
        return found;
    }
    let sym = string::into_symbol(&mut interp.heap, name);
    if sym == Value::Nil {
        return Value::Nil;
    }
    // the cell is stored once, under both of its tags
    hash::set(&mut interp.heap, interp.symbols, string::as_string_key(sym), sym);
    sym
}

/// A fresh frame whose parent link is retained: a child keeps its whole
/// chain alive.
pub fn env_new(heap: &mut Heap, parent: Value) -> Value {
    let e = hash::new(heap);
    if e == Value::Nil {
        return Value::Nil;
    }
    heap.retain(parent);
    hash::set_parent(heap, e, parent);
    e
}

/// Walk the chain until a binding is found; nil when exhausted.
pub fn env_find(heap: &Heap, env: Value, key: Value) -> Value {
    let mut frame = env;
    while frame != Value::Nil {
        let found = hash::get(heap, frame, key);
        if found != Value::Nil {
            return found;
        }
        frame = hash::parent(heap, frame);
    }
    Value::Nil
}

/// The `set!` rule: write the frame that already binds `key`, falling
/// back to the root frame when no binding exists anywhere.
pub fn env_find_and_set(heap: &mut Heap, env: Value, key: Value, value: Value) -> Value {
    let mut frame = env;
    let mut last = env;
    while frame != Value::Nil {
        if hash::get(heap, frame, key) != Value::Nil {
            return hash::set(heap, frame, key, value);
        }
        last = frame;
        frame = hash::parent(heap, frame);
    }
    hash::set(heap, last, key, value)
}

/// `define`: bind unconditionally in the current frame.
pub fn env_define(heap: &mut Heap, env: Value, key: Value, value: Value) -> Value {
    hash::set(heap, env, key, value)
}
