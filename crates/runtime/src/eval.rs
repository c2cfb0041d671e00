//! Evaluator
//!
//! A recursive interpreter over seven special forms plus application.
//! Immediates and strings are self-evaluating; a symbol is an environment
//! lookup (an unbound symbol is nil, which only becomes an error at a call
//! site); an array is a form dispatched on its head.
//!
//! A lambda evaluates to a three-element array `[params, body, captured
//! env]`; applying it builds a fresh frame whose parent is the captured
//! environment. Heads are resolved through the environment without being
//! evaluated, as in the source language.

use cellisp_core::error::ErrorKind;
use cellisp_core::value::{Value, is_truthy};
use cellisp_core::{array, hash, string};
use tracing::trace;

use crate::env;
use crate::interp::Interp;
use crate::printer;

pub fn eval(interp: &mut Interp, x: Value, env: Value) -> Value {
    let env = if env == Value::Nil {
        interp.globals
    } else {
        env
    };
    match x {
        Value::Sym(_) => return env::env_find(&interp.heap, env, x),
        Value::Array(_) => {}
        // constant literal
        other => return other,
    }

    let head = array::index(&interp.heap, x, 0);
    if string::equals_lit(&interp.heap, head, "quote") {
        return array::index(&interp.heap, x, 1);
    }
    if string::equals_lit(&interp.heap, head, "if") {
        let test = array::index(&interp.heap, x, 1);
        let outcome = eval(interp, test, env);
        let picked = if is_truthy(&interp.heap, outcome) {
            array::index(&interp.heap, x, 2)
        } else {
            array::index(&interp.heap, x, 3)
        };
        return eval(interp, picked, env);
    }
    if string::equals_lit(&interp.heap, head, "set!") {
        let var = array::index(&interp.heap, x, 1);
        let exp = array::index(&interp.heap, x, 2);
        let value = eval(interp, exp, env);
        env::env_find_and_set(&mut interp.heap, env, var, value);
        return Value::Nil;
    }
    if string::equals_lit(&interp.heap, head, "define") {
        let var = array::index(&interp.heap, x, 1);
        let exp = array::index(&interp.heap, x, 2);
        let value = eval(interp, exp, env);
        env::env_define(&mut interp.heap, env, var, value);
        return Value::Nil;
    }
    if string::equals_lit(&interp.heap, head, "lambda") {
        let triple = array::new(&mut interp.heap);
        let params = array::index(&interp.heap, x, 1);
        let body = array::index(&interp.heap, x, 2);
        array::push(&mut interp.heap, triple, params);
        array::push(&mut interp.heap, triple, body);
        array::push(&mut interp.heap, triple, env);
        return triple;
    }
    if string::equals_lit(&interp.heap, head, "begin") {
        let mut cursor = 1;
        let mut value = Value::Nil;
        loop {
            let exp = array::iterate(&interp.heap, x, &mut cursor);
            if exp == Value::Nil {
                return value;
            }
            value = eval(interp, exp, env);
        }
    }

    apply(interp, x, head, env)
}

/// Application: evaluate the arguments left to right, resolve the head,
/// and invoke a primitive or a lambda triple.
fn apply(interp: &mut Interp, x: Value, head: Value, env: Value) -> Value {
    let args = array::new(&mut interp.heap);
    let mut cursor = 1;
    loop {
        let exp = array::iterate(&interp.heap, x, &mut cursor);
        if exp == Value::Nil {
            break;
        }
        let v = eval(interp, exp, env);
        array::push(&mut interp.heap, args, v);
    }

    let proc = env::env_find(&interp.heap, env, head);
    trace!(
        arity = array::len(&interp.heap, args),
        kind = proc.tag().name(),
        "apply"
    );
    if proc == Value::Nil {
        let name = printer::to_display_string(&mut interp.heap, head);
        return interp.heap.fail(
            ErrorKind::UnknownProc,
            "eval",
            format!("unknown proc '{name}'"),
        );
    }
    if matches!(proc, Value::CFunc(_)) {
        return interp.call_native(proc, args);
    }
    if !matches!(proc, Value::Array(_)) {
        return interp.heap.fail(
            ErrorKind::TypeMismatch,
            "eval",
            format!("'{}' is not applicable", proc.tag().name()),
        );
    }

    let params = array::index(&interp.heap, proc, 0);
    let wanted = array::len(&interp.heap, params);
    let got = array::len(&interp.heap, args);
    if wanted != got {
        let name = printer::to_display_string(&mut interp.heap, head);
        return interp.heap.fail(
            ErrorKind::ArityMismatch,
            "eval",
            format!("'{name}' expects {wanted} arguments, got {got}"),
        );
    }
    let captured = array::index(&interp.heap, proc, 2);
    let frame = env::env_new(&mut interp.heap, captured);
    let mut cursor = 0;
    loop {
        let param = array::iterate(&interp.heap, params, &mut cursor);
        if param == Value::Nil {
            break;
        }
        let arg = array::index(&interp.heap, args, cursor - 1);
        hash::set(&mut interp.heap, frame, param, arg);
    }
    let body = array::index(&interp.heap, proc, 1);
    eval(interp, body, frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp() -> Interp {
        // tree-recursive programs allocate a frame and an argument array
        // per call before any sweep can run, so leave real headroom
        Interp::new(256 << 20).unwrap()
    }

    fn run(it: &mut Interp, src: &str) -> Value {
        let v = it.eval_line(src);
        it.collect();
        v
    }

    fn show(it: &mut Interp, src: &str) -> String {
        let v = it.eval_line(src);
        let s = printer::to_display_string(&mut it.heap, v);
        it.collect();
        s
    }

    #[test]
    fn test_self_evaluating() {
        let mut it = interp();
        assert_eq!(run(&mut it, "5"), Value::Int(5));
        assert_eq!(run(&mut it, "2.5"), Value::Float(2.5));
    }

    #[test]
    fn test_unbound_symbol_is_nil() {
        let mut it = interp();
        assert_eq!(run(&mut it, "ghost"), Value::Nil);
        assert!(!it.heap.has_error());
    }

    #[test]
    fn test_quote_returns_verbatim() {
        let mut it = interp();
        assert_eq!(show(&mut it, "(quote (1 2 three))"), "(1 2 three)");
        assert_eq!(run(&mut it, "(quote 7)"), Value::Int(7));
    }

    #[test]
    fn test_if_truthiness() {
        let mut it = interp();
        // 0 is truthy by this design
        assert_eq!(run(&mut it, "(if 0 1 2)"), Value::Int(1));
        // the empty array is false
        assert_eq!(run(&mut it, "(if (list) 1 2)"), Value::Int(2));
        assert_eq!(run(&mut it, "(if (quote ()) 1 2)"), Value::Int(2));
        // a missing alternative evaluates to nil
        assert_eq!(run(&mut it, "(if (list) 1)"), Value::Nil);
    }

    #[test]
    fn test_define_and_lookup() {
        let mut it = interp();
        assert_eq!(run(&mut it, "(define r 10)"), Value::Nil);
        assert_eq!(run(&mut it, "r"), Value::Int(10));
    }

    #[test]
    fn test_set_updates_binding_frame() {
        let mut it = interp();
        run(&mut it, "(define counter 1)");
        run(&mut it, "(set! counter 2)");
        assert_eq!(run(&mut it, "counter"), Value::Int(2));
    }

    #[test]
    fn test_set_on_unbound_writes_root() {
        let mut it = interp();
        run(&mut it, "(set! fresh 11)");
        assert_eq!(run(&mut it, "fresh"), Value::Int(11));
    }

    #[test]
    fn test_begin_returns_last() {
        let mut it = interp();
        assert_eq!(run(&mut it, "(begin 1 2 3)"), Value::Int(3));
        assert_eq!(run(&mut it, "(begin)"), Value::Nil);
    }

    #[test]
    fn test_begin_define_writes_current_frame() {
        let mut it = interp();
        run(&mut it, "(define x 1)");
        assert_eq!(run(&mut it, "(begin (define x 2) x)"), Value::Int(2));
        // begin does not open a frame: the outer binding was overwritten
        assert_eq!(run(&mut it, "x"), Value::Int(2));
    }

    #[test]
    fn test_lambda_application() {
        let mut it = interp();
        run(&mut it, "(define double (lambda (n) (* n 2)))");
        assert_eq!(run(&mut it, "(double 21)"), Value::Int(42));
    }

    #[test]
    fn test_lambda_captures_definition_env() {
        let mut it = interp();
        run(&mut it, "(define base 100)");
        run(&mut it, "(define add-base (lambda (n) (+ n base)))");
        assert_eq!(run(&mut it, "(add-base 1)"), Value::Int(101));
    }

    #[test]
    fn test_recursion() {
        let mut it = interp();
        run(
            &mut it,
            "(define fact (lambda (n) (if (<= n 1) 1 (* n (fact (- n 1))))))",
        );
        assert_eq!(run(&mut it, "(fact 5)"), Value::Int(120));
        assert_eq!(run(&mut it, "(fact 10)"), Value::Int(3628800));
    }

    #[test]
    fn test_arity_mismatch_binds_nothing() {
        let mut it = interp();
        run(&mut it, "(define three (lambda (a b c) a))");
        assert_eq!(it.eval_line("(three 1 2)"), Value::Nil);
        assert_eq!(
            it.heap.last_error().unwrap().kind,
            ErrorKind::ArityMismatch
        );
        it.collect();
        // no parameter leaked into any reachable frame
        assert_eq!(run(&mut it, "a"), Value::Nil);
    }

    #[test]
    fn test_unknown_proc() {
        let mut it = interp();
        assert_eq!(it.eval_line("(frobnicate 1)"), Value::Nil);
        let err = it.heap.last_error().unwrap();
        assert_eq!(err.kind, ErrorKind::UnknownProc);
        assert!(err.message.contains("frobnicate"));
    }

    #[test]
    fn test_nested_application_order() {
        let mut it = interp();
        assert_eq!(run(&mut it, "(- (+ 5 4) (* 2 3))"), Value::Int(3));
    }

    #[test]
    fn test_repl_survives_many_collections() {
        let mut it = interp();
        run(
            &mut it,
            "(define fib (lambda (n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2))))))",
        );
        for _ in 0..5 {
            assert_eq!(run(&mut it, "(fib 10)"), Value::Int(55));
        }
    }
}
