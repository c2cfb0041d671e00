//! Built-in primitive registry
//!
//! Every primitive receives the evaluated argument array and answers one
//! value. Arithmetic and comparison take their first two operands: when
//! both are ints the result is an int, when both are floats a float, and
//! a mixed pair first tries the int path (which accepts the bool words,
//! true as 1 and nil as 0, but never a float) and then falls back to
//! computing in float. Missing operands read as nil, i.e. 0 on the int
//! path.

use std::io::Write;

use cellisp_core::error::ErrorKind;
use cellisp_core::value::{Value, is_truthy, values_equal};
use cellisp_core::{array, string};
use cellisp_core::heap::Heap;

use crate::interp::Interp;
use crate::printer;

enum Operands {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn as_int(v: Value) -> Option<i64> {
    match v {
        Value::Int(i) => Some(i),
        Value::Bool(b) => Some(b as i64),
        Value::Nil => Some(0),
        _ => None,
    }
}

fn as_float(v: Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(i as f64),
        Value::Float(f) => Some(f),
        _ => None,
    }
}

/// Numeric coercion over the first two arguments.
fn coerce_pair(heap: &mut Heap, args: Value) -> Option<Operands> {
    let a = array::index(heap, args, 0);
    let b = array::index(heap, args, 1);
    if let (Value::Int(x), Value::Int(y)) = (a, b) {
        return Some(Operands::Ints(x, y));
    }
    if let (Value::Float(x), Value::Float(y)) = (a, b) {
        return Some(Operands::Floats(x, y));
    }
    if let (Some(x), Some(y)) = (as_int(a), as_int(b)) {
        return Some(Operands::Ints(x, y));
    }
    if let (Some(x), Some(y)) = (as_float(a), as_float(b)) {
        return Some(Operands::Floats(x, y));
    }
    heap.fail(
        ErrorKind::TypeMismatch,
        "arithmetic",
        format!(
            "expected numbers, have '{}' and '{}'",
            a.tag().name(),
            b.tag().name()
        ),
    );
    None
}

fn prim_add(interp: &mut Interp, args: Value) -> Value {
    match coerce_pair(&mut interp.heap, args) {
        Some(Operands::Ints(a, b)) => Value::Int(a.wrapping_add(b)),
        Some(Operands::Floats(a, b)) => Value::Float(a + b),
        None => Value::Nil,
    }
}

fn prim_sub(interp: &mut Interp, args: Value) -> Value {
    match coerce_pair(&mut interp.heap, args) {
        Some(Operands::Ints(a, b)) => Value::Int(a.wrapping_sub(b)),
        Some(Operands::Floats(a, b)) => Value::Float(a - b),
        None => Value::Nil,
    }
}

fn prim_mul(interp: &mut Interp, args: Value) -> Value {
    match coerce_pair(&mut interp.heap, args) {
        Some(Operands::Ints(a, b)) => Value::Int(a.wrapping_mul(b)),
        Some(Operands::Floats(a, b)) => Value::Float(a * b),
        None => Value::Nil,
    }
}

fn prim_div(interp: &mut Interp, args: Value) -> Value {
    match coerce_pair(&mut interp.heap, args) {
        Some(Operands::Ints(_, 0)) => {
            interp
                .heap
                .fail(ErrorKind::DivideByZero, "divide", "division by zero")
        }
        Some(Operands::Ints(a, b)) => Value::Int(a.wrapping_div(b)),
        Some(Operands::Floats(a, b)) => Value::Float(a / b),
        None => Value::Nil,
    }
}

/// Logical negation of the first argument's truthiness.
fn prim_not(interp: &mut Interp, args: Value) -> Value {
    let a = array::index(&interp.heap, args, 0);
    Value::truth(!is_truthy(&interp.heap, a))
}

fn prim_gt(interp: &mut Interp, args: Value) -> Value {
    match coerce_pair(&mut interp.heap, args) {
        Some(Operands::Ints(a, b)) => Value::truth(a > b),
        Some(Operands::Floats(a, b)) => Value::truth(a > b),
        None => Value::Nil,
    }
}

fn prim_lt(interp: &mut Interp, args: Value) -> Value {
    match coerce_pair(&mut interp.heap, args) {
        Some(Operands::Ints(a, b)) => Value::truth(a < b),
        Some(Operands::Floats(a, b)) => Value::truth(a < b),
        None => Value::Nil,
    }
}

fn prim_ge(interp: &mut Interp, args: Value) -> Value {
    match coerce_pair(&mut interp.heap, args) {
        Some(Operands::Ints(a, b)) => Value::truth(a >= b),
        Some(Operands::Floats(a, b)) => Value::truth(a >= b),
        None => Value::Nil,
    }
}

fn prim_le(interp: &mut Interp, args: Value) -> Value {
    match coerce_pair(&mut interp.heap, args) {
        Some(Operands::Ints(a, b)) => Value::truth(a <= b),
        Some(Operands::Floats(a, b)) => Value::truth(a <= b),
        None => Value::Nil,
    }
}

/// `=`, `equal?`, `eq?`: value equality, strings by content, everything
/// else by word.
fn prim_eq(interp: &mut Interp, args: Value) -> Value {
    let a = array::index(&interp.heap, args, 0);
    let b = array::index(&interp.heap, args, 1);
    Value::truth(values_equal(&interp.heap, a, b))
}

fn prim_length(interp: &mut Interp, args: Value) -> Value {
    let a = array::index(&interp.heap, args, 0);
    if !matches!(a, Value::Array(_)) {
        return interp.heap.fail(
            ErrorKind::TypeMismatch,
            "length",
            format!("expected array, have '{}'", a.tag().name()),
        );
    }
    Value::Int(array::len(&interp.heap, a) as i64)
}

fn prim_cons(interp: &mut Interp, args: Value) -> Value {
    let a = array::index(&interp.heap, args, 0);
    let b = array::index(&interp.heap, args, 1);
    array::new_join(&mut interp.heap, a, b)
}

fn prim_car(interp: &mut Interp, args: Value) -> Value {
    let a = array::index(&interp.heap, args, 0);
    if !matches!(a, Value::Array(_)) {
        return interp.heap.fail(
            ErrorKind::TypeMismatch,
            "car",
            format!("expected array, have '{}'", a.tag().name()),
        );
    }
    array::index(&interp.heap, a, 0)
}

fn prim_cdr(interp: &mut Interp, args: Value) -> Value {
    let a = array::index(&interp.heap, args, 0);
    let rest = array::clone(&mut interp.heap, a);
    if rest == Value::Nil {
        return Value::Nil;
    }
    array::unshift(&mut interp.heap, rest);
    rest
}

fn prim_list(_interp: &mut Interp, args: Value) -> Value {
    args
}

fn prim_is_list(interp: &mut Interp, args: Value) -> Value {
    let a = array::index(&interp.heap, args, 0);
    Value::truth(matches!(a, Value::Array(_)))
}

fn prim_is_null(interp: &mut Interp, args: Value) -> Value {
    let a = array::index(&interp.heap, args, 0);
    let empty = a == Value::Nil
        || (matches!(a, Value::Array(_)) && array::len(&interp.heap, a) == 0);
    Value::truth(empty)
}

fn prim_is_symbol(interp: &mut Interp, args: Value) -> Value {
    let a = array::index(&interp.heap, args, 0);
    Value::truth(matches!(a, Value::Sym(_)))
}

/// Print the arguments space-joined, no newline.
fn prim_display(interp: &mut Interp, args: Value) -> Value {
    let heap = &mut interp.heap;
    let parts = array::map(heap, args, printer::to_string_cell);
    let sep = string::from_str(heap, " ");
    let joined = array::join(heap, parts, sep);
    let out = string::to_owned(heap, joined);
    print!("{out}");
    let _ = std::io::stdout().flush();
    Value::Nil
}

fn prim_newline(_interp: &mut Interp, _args: Value) -> Value {
    println!();
    Value::Nil
}

/// Populate the global environment with every primitive.
pub fn install(interp: &mut Interp) {
    interp.define_native("+", prim_add);
    interp.define_native("-", prim_sub);
    interp.define_native("*", prim_mul);
    interp.define_native("/", prim_div);
    interp.define_native("not", prim_not);
    interp.define_native(">", prim_gt);
    interp.define_native("<", prim_lt);
    interp.define_native(">=", prim_ge);
    interp.define_native("<=", prim_le);
    interp.define_native("=", prim_eq);
    interp.define_native("equal?", prim_eq);
    interp.define_native("eq?", prim_eq);
    interp.define_native("length", prim_length);
    interp.define_native("cons", prim_cons);
    interp.define_native("car", prim_car);
    interp.define_native("cdr", prim_cdr);
    interp.define_native("list", prim_list);
    interp.define_native("list?", prim_is_list);
    interp.define_native("null?", prim_is_null);
    interp.define_native("symbol?", prim_is_symbol);
    interp.define_native("display", prim_display);
    interp.define_native("newline", prim_newline);
}
