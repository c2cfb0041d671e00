//! Printer: expression tree -> string cell
//!
//! Rendering runs on the heap's own strings and arrays, the same as the
//! reader. Strings and symbols render as themselves (the cell is handed
//! back untouched); arrays render as parenthesised, space-joined
//! renderings of their entries.

use cellisp_core::heap::Heap;
use cellisp_core::value::Value;
use cellisp_core::{array, string};

/// Render a value as a string cell. Nil prints as `null`, matching its
/// role as the false word.
pub fn to_string_cell(heap: &mut Heap, v: Value) -> Value {
    match v {
        Value::Nil => string::from_str(heap, "null"),
        Value::Bool(true) => string::from_str(heap, "true"),
        Value::Bool(false) => string::from_str(heap, "false"),
        Value::Int(_) | Value::Float(_) => string::from_number(heap, v),
        Value::CFunc(_) => string::from_str(heap, "CFUNC"),
        Value::Str(_) | Value::Sym(_) => v,
        Value::Hash(_) => string::from_str(heap, "HASH"),
        Value::Pair(_) => string::from_str(heap, "PAIR"),
        Value::Array(_) => {
            let parts = array::map(heap, v, to_string_cell);
            let sep = string::from_str(heap, " ");
            let body = array::join(heap, parts, sep);
            let out = string::from_str(heap, "(");
            string::append(heap, out, body);
            let close = string::from_str(heap, ")");
            string::append(heap, out, close)
        }
    }
}

/// Host copy of the rendering, for the REPL's `-> ` line.
pub fn to_display_string(heap: &mut Heap, v: Value) -> String {
    let cell = to_string_cell(heap, v);
    string::to_owned(heap, cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Interp;
    use crate::reader;
    use cellisp_core::string::from_str;

    fn interp() -> Interp {
        Interp::new(16 << 20).unwrap()
    }

    fn parse_str(it: &mut Interp, src: &str) -> Value {
        let s = from_str(&mut it.heap, src);
        reader::parse(it, s)
    }

    #[test]
    fn test_scalars() {
        let mut it = interp();
        assert_eq!(to_display_string(&mut it.heap, Value::Nil), "null");
        assert_eq!(to_display_string(&mut it.heap, Value::Bool(true)), "true");
        assert_eq!(to_display_string(&mut it.heap, Value::Int(-3)), "-3");
    }

    #[test]
    fn test_floats_keep_their_point() {
        let mut it = interp();
        assert_eq!(to_display_string(&mut it.heap, Value::Float(1.0)), "1.0");
        assert_eq!(to_display_string(&mut it.heap, Value::Float(3.25)), "3.25");
    }

    #[test]
    fn test_list_rendering() {
        let mut it = interp();
        let form = parse_str(&mut it, "(a (b 1) 2.5)");
        assert_eq!(to_display_string(&mut it.heap, form), "(a (b 1) 2.5)");
    }

    #[test]
    fn test_parse_print_round_trip() {
        let mut it = interp();
        for src in ["42", "sym", "(+ 1 2)", "(a (b (c)) d)", "()", "(1 2.5 x)"] {
            let first = parse_str(&mut it, src);
            let printed = to_display_string(&mut it.heap, first);
            let second = parse_str(&mut it, &printed);
            let reprinted = to_display_string(&mut it.heap, second);
            assert_eq!(printed, reprinted, "round trip drifted for {src}");
        }
    }
}
