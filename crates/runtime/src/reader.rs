//! Reader: source line -> expression tree
//!
//! Two phases, both running on the heap's own containers:
//! 1. tokenize: pad every `(` and `)` with spaces via string replacement,
//!    then split on spaces into an array of string cells
//! 2. read_from: consume the token array front-to-back, building nested
//!    arrays; atoms parse as int, then float, then intern as a symbol
//!
//! The error slot is reset at the start of each top-level parse.

use cellisp_core::error::ErrorKind;
use cellisp_core::value::Value;
use cellisp_core::{array, string};
use tracing::trace;

use crate::env;
use crate::interp::Interp;

/// Pad parentheses and split. Nil input (a comment or blank line) stays
/// nil.
pub fn tokenize(interp: &mut Interp, source: Value) -> Value {
    if source == Value::Nil {
        return Value::Nil;
    }
    let heap = &mut interp.heap;
    let open = string::from_str(heap, "(");
    let open_pad = string::from_str(heap, " ( ");
    let close = string::from_str(heap, ")");
    let close_pad = string::from_str(heap, " ) ");
    let padded = string::replace(heap, source, open, open_pad);
    let padded = string::replace(heap, padded, close, close_pad);
    string::split(heap, padded)
}

/// Parse one token: strict int, then float, then interned symbol.
fn atom(interp: &mut Interp, token: Value) -> Value {
    let text = string::to_owned(&interp.heap, token);
    if let Ok(i) = text.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        return Value::Float(f);
    }
    env::intern(interp, token)
}

/// Build one expression from the front of the token queue.
pub fn read_from(interp: &mut Interp, tokens: Value) -> Value {
    if tokens == Value::Nil {
        return Value::Nil;
    }
    if array::len(&interp.heap, tokens) == 0 {
        return interp.heap.fail(
            ErrorKind::ReaderError,
            "read",
            "unexpected EOF while reading",
        );
    }
    let token = array::unshift(&mut interp.heap, tokens);
    if string::equals_lit(&interp.heap, token, "(") {
        let list = array::new(&mut interp.heap);
        loop {
            let front = array::index(&interp.heap, tokens, 0);
            if string::equals_lit(&interp.heap, front, ")") {
                break;
            }
            if array::len(&interp.heap, tokens) == 0 {
                interp.heap.fail(
                    ErrorKind::ReaderError,
                    "read",
                    "unexpected EOF while reading",
                );
                break;
            }
            let sub = read_from(interp, tokens);
            array::push(&mut interp.heap, list, sub);
            if interp.heap.has_error() {
                break;
            }
        }
        // consume the closing parenthesis
        array::unshift(&mut interp.heap, tokens);
        return list;
    }
    if string::equals_lit(&interp.heap, token, ")") {
        return interp.heap.fail(ErrorKind::ReaderError, "read", "unexpected )");
    }
    atom(interp, token)
}

/// Top-level read of one source line.
pub fn parse(interp: &mut Interp, source: Value) -> Value {
    interp.heap.reset_errors();
    let tokens = tokenize(interp, source);
    trace!(tokens = array::len(&interp.heap, tokens), "tokenized line");
    read_from(interp, tokens)
}
