//! Interpreter state
//!
//! One [`Interp`] owns everything the language touches: the heap, the
//! symbol intern table and the global environment. There is deliberately
//! no process-global state; tests run as many interpreters side by side
//! as they like.

use cellisp_core::error::ErrorKind;
use cellisp_core::heap::Heap;
use cellisp_core::value::Value;
use cellisp_core::{cfunc, hash, string};

use crate::builtins;
use crate::env;
use crate::eval;
use crate::reader;

/// Signature of a host primitive: it receives the interpreter and the
/// already-evaluated argument array.
pub type PrimFn = fn(&mut Interp, Value) -> Value;

pub struct Interp {
    pub heap: Heap,
    /// Intern table: string key -> canonical symbol, retained forever
    pub symbols: Value,
    /// Root environment frame
    pub globals: Value,
}

impl Interp {
    /// Reserve the arena, create the intern table and the global
    /// environment, and register the built-in primitives.
    pub fn new(arena_bytes: usize) -> Result<Interp, String> {
        let mut heap = Heap::new(arena_bytes)?;
        let symbols = hash::new(&mut heap);
        let globals = hash::new(&mut heap);
        if symbols == Value::Nil || globals == Value::Nil {
            return Err("arena too small for the interpreter tables".to_string());
        }
        heap.retain(symbols);
        heap.retain(globals);
        let mut interp = Interp {
            heap,
            symbols,
            globals,
        };
        builtins::install(&mut interp);
        Ok(interp)
    }

    /// Bind a host primitive under `name` in the global environment.
    pub fn define_native(&mut self, name: &str, f: PrimFn) {
        let s = string::from_str(&mut self.heap, name);
        let sym = env::intern(self, s);
        let cell = cfunc::new(&mut self.heap, f as usize);
        hash::set(&mut self.heap, self.globals, sym, cell);
    }

    /// Invoke a c-function cell with an argument array.
    pub fn call_native(&mut self, f: Value, args: Value) -> Value {
        let Some(raw) = cfunc::raw(&self.heap, f) else {
            return self.heap.fail(
                ErrorKind::TypeMismatch,
                "call",
                format!("expected cfunc, have '{}'", f.tag().name()),
            );
        };
        // Safety: the word was stored by define_native from a PrimFn and
        // cfunc cells are created nowhere else.
        let func: PrimFn = unsafe { std::mem::transmute::<usize, PrimFn>(raw) };
        func(self, args)
    }

    /// Read and evaluate one input line. Comment lines (leading `;`)
    /// evaluate to nil without touching the reader.
    pub fn eval_line(&mut self, line: &str) -> Value {
        if line.as_bytes().first() == Some(&b';') {
            return Value::Nil;
        }
        let source = string::from_str(&mut self.heap, line);
        let form = reader::parse(self, source);
        eval::eval(self, form, Value::Nil)
    }

    /// Reclaim everything only the allocator still holds. Called between
    /// REPL iterations, never mid-evaluation.
    pub fn collect(&mut self) -> usize {
        self.heap.sweep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_survive_collection() {
        let mut interp = Interp::new(16 << 20).unwrap();
        interp.collect();
        assert!(interp.heap.refcount(interp.symbols).unwrap() >= 2);
        assert!(interp.heap.refcount(interp.globals).unwrap() >= 2);
        // the registered primitives are still reachable
        let v = interp.eval_line("(+ 20 22)");
        assert_eq!(v, Value::Int(42));
    }

    #[test]
    fn test_comment_lines_are_nil() {
        let mut interp = Interp::new(16 << 20).unwrap();
        assert_eq!(interp.eval_line("; just a note"), Value::Nil);
        assert!(!interp.heap.has_error());
    }
}
