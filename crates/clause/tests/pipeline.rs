//! Chaîne complète : source → valeur.

use clause::lexer::LexErrorKind;
use clause::parser::ParseError;
use clause::vm::RuntimeError;
use clause::{compile_str, eval_str, host_object, Engine, Error, HostHandle, Opcode, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn eval(src: &str) -> Value {
    match eval_str(src) {
        Ok(Some(v)) => v,
        other => panic!("{src:?} evaluated to {other:?}"),
    }
}

#[derive(Serialize)]
struct Role {
    name: String,
}

#[derive(Serialize)]
struct User {
    role: Role,
    age: u32,
    tags: Vec<String>,
}

fn user_engine() -> Engine {
    let mut engine = Engine::new();
    engine.register_serde("user", || User {
        role: Role { name: "HI".into() },
        age: 42,
        tags: vec!["admin".into(), "ops".into()],
    });
    engine
}

#[test]
fn literals_round_trip() {
    assert_eq!(eval("42"), Value::Double(42.0));
    assert_eq!(eval(r#""hi""#), Value::from("hi"));
    assert_eq!(eval("true"), Value::Bool(true));
    assert_eq!(eval_str("").unwrap(), None);
    assert_eq!(eval_str("   ").unwrap(), None);
}

#[test]
fn arithmetic() {
    assert_eq!(eval("2 + 3 * 4"), Value::Double(14.0));
    assert_eq!(eval("1 + 2 + 3"), Value::Double(6.0));
    assert_eq!(eval("10 - 2 - 3"), Value::Double(5.0));
    assert_eq!(eval("2 ** 3"), Value::Double(8.0));
    assert_eq!(eval("7 / 2"), Value::Double(3.5));
    assert_eq!(eval("0.5 + 0.25"), Value::Double(0.75));
}

#[test]
fn host_ints_do_not_widen_in_arithmetic() {
    let mut engine = Engine::new();
    engine.register_static("n", || Ok(Value::Int(2)));
    for src in ["@n + 1", "@n * 3", "@n - 0.5"] {
        assert!(
            matches!(engine.eval(src), Err(Error::Runtime(RuntimeError::TypeMismatch { .. }))),
            "{src}"
        );
    }
    assert!(matches!(
        engine.eval("@n + 1"),
        Err(Error::Runtime(RuntimeError::TypeMismatch { opcode: Opcode::DAdd, found: clause::ValueKind::Int, .. }))
    ));
    // Les comparaisons restent inter-genres.
    assert_eq!(engine.eval("@n > 1.5").unwrap(), Some(Value::Int(1)));
}

#[test]
fn nested_concat_does_not_leak_into_outer_add() {
    assert!(matches!(
        eval_str(r#""a" + "b" + x"#),
        Err(Error::Runtime(RuntimeError::StackUnderflow { opcode: Opcode::IAdd, .. }))
    ));
    assert!(matches!(
        eval_str(r#""a" + "b" + 1"#),
        Err(Error::Runtime(RuntimeError::TypeMismatch { opcode: Opcode::DAdd, found: clause::ValueKind::String, .. }))
    ));
    assert_eq!(eval(r#""a" + "b" + "c""#), Value::from("abc"));
}

#[test]
fn chained_single_step_operators_are_rejected() {
    assert!(matches!(eval_str("2 ** 3 ** 2"), Err(Error::Parse(ParseError::UnexpectedToken { .. }))));
    assert!(matches!(eval_str("2 * 3 * 4"), Err(Error::Parse(ParseError::UnexpectedToken { .. }))));
}

#[test]
fn strings() {
    assert_eq!(eval(r#""a" + "b""#), Value::from("ab"));
    assert_eq!(eval(r#""say \"hi\"""#), Value::from(r#"say \"hi\""#));
    assert!(matches!(
        eval_str(r#""a" + 1"#),
        Err(Error::Runtime(RuntimeError::TypeMismatch { opcode: Opcode::SConcat, .. }))
    ));
}

#[test]
fn comparisons_and_logic() {
    assert_eq!(eval("1 == 1"), Value::Int(1));
    assert_eq!(eval("1 != 1"), Value::Int(0));
    assert_eq!(eval("2 > 1"), Value::Int(1));
    assert_eq!(eval("2 <= 1"), Value::Int(0));
    assert_eq!(eval(r#""x" == "x""#), Value::Int(1));
    assert_eq!(eval("true and false"), Value::Int(0));
    assert_eq!(eval("1 < 2 or false"), Value::Int(1));
    assert_eq!(eval("1 < 2 and 3 > 2"), Value::Int(1));
}

#[test]
fn demo_with_host_struct() {
    let engine = user_engine();
    assert_eq!(engine.eval("@user.role.name").unwrap(), Some(Value::from("HI")));
    assert_eq!(engine.eval(r#"@user.role.name + "I" == "HII""#).unwrap(), Some(Value::Int(1)));
    assert_eq!(engine.eval("@user.age >= 18").unwrap(), Some(Value::Int(1)));
    assert_eq!(engine.eval("@user.tags.1").ok(), None);
    assert_eq!(engine.eval(r#"@user.tags. admin == "admin""#).ok(), None);
}

#[test]
fn array_indices_through_attributes() {
    let mut engine = Engine::new();
    engine.register_static("xs", || Ok(Value::object([("items", Value::Array(vec![Value::Int(5), Value::Int(6)]))])));
    // Un index décimal n'est pas un identifiant : seule la voie hôte y accède.
    let program = {
        let mut p = clause::Program::new();
        let owner = p.emit_with_const(Opcode::GetStatic, Value::DataRef { name: "xs".into(), scope: clause::Scope::Static });
        let owner = p.emit_with_const(Opcode::GetAttr, Value::AttrRef { name: "items".into(), owner });
        p.emit_with_const(Opcode::GetAttr, Value::AttrRef { name: "1".into(), owner });
        p
    };
    assert_eq!(engine.run(&program).unwrap(), Some(Value::Int(6)));
}

#[test]
fn unresolved_and_missing_attributes() {
    assert!(matches!(
        eval_str("@missing.x"),
        Err(Error::Runtime(RuntimeError::UnresolvedBinding { ref name, .. })) if name == "missing"
    ));
    let engine = user_engine();
    assert!(matches!(
        engine.eval("@user.role.title"),
        Err(Error::Runtime(RuntimeError::AttributeNotFound { ref name, .. })) if name == "title"
    ));
}

#[test]
fn runtime_failures() {
    assert!(matches!(eval_str("1 / 0"), Err(Error::Runtime(RuntimeError::DivisionByZero { .. }))));
}

#[test]
fn lexical_failures() {
    for (src, kind) in [
        ("007", LexErrorKind::MalformedNumber),
        ("1.2.3", LexErrorKind::MalformedNumber),
        ("\"abc", LexErrorKind::UnterminatedString),
        ("1 ; 2", LexErrorKind::IllegalCharacter(';')),
    ] {
        match eval_str(src) {
            Err(Error::Lex(e)) => assert_eq!(e.kind, kind, "{src}"),
            other => panic!("{src:?}: expected lex error, got {other:?}"),
        }
    }
    let e = eval_str("1 +\n  1.2.3").unwrap_err();
    assert_eq!(e.to_string(), "lex error: malformed number literal at 2:2");
}

#[test]
fn compilation_is_deterministic() {
    let src = r#"@user.role.name + "I" == "HII" or @user.age > 30"#;
    assert_eq!(compile_str(src).unwrap(), compile_str(src).unwrap());
}

#[test]
fn producers_are_not_cached() {
    use std::sync::atomic::AtomicI64;

    let counter = Arc::new(AtomicI64::new(0));
    let mut engine = Engine::new();
    let c = Arc::clone(&counter);
    engine.register_static("tick", move || Ok(Value::Int(c.fetch_add(1, Ordering::SeqCst))));
    let program = engine.compile("@tick").unwrap();
    assert_eq!(engine.run(&program).unwrap(), Some(Value::Int(0)));
    assert_eq!(engine.run(&program).unwrap(), Some(Value::Int(1)));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

struct Session {
    channel: HostHandle,
    user: String,
}

host_object!(Session { channel, user });

#[test]
fn host_objects_and_handles() {
    let mut engine = Engine::new();
    engine.register_value("session", Session { channel: HostHandle(7), user: "ana".into() });
    assert_eq!(engine.eval("@session.channel == 7").unwrap(), Some(Value::Int(0)));
    assert_eq!(engine.eval("@session.channel > 6").unwrap(), Some(Value::Int(1)));
    assert_eq!(engine.eval(r#"@session.user + "!""#).unwrap(), Some(Value::from("ana!")));
}

struct Counted(Arc<AtomicUsize>);

impl clause::vm::ToValue for Counted {
    fn to_value(&self) -> Result<Value, clause::vm::BridgeError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(Value::from("fresh"))
    }
}

#[test]
fn registered_values_convert_on_every_lookup() {
    let conversions = Arc::new(AtomicUsize::new(0));
    let mut engine = Engine::new();
    engine.register_value("v", Counted(Arc::clone(&conversions)));
    let program = engine.compile("@v").unwrap();
    for _ in 0..3 {
        assert_eq!(engine.run(&program).unwrap(), Some(Value::from("fresh")));
    }
    assert_eq!(conversions.load(Ordering::SeqCst), 3);
}

#[test]
fn json_documents_as_bindings() {
    let mut engine = Engine::new();
    engine.register_value("cfg", serde_json::json!({ "limits": { "max": 10.5 }, "name": "edge", "ids": [3, 4] }));
    assert_eq!(engine.eval("@cfg.limits.max > 10").unwrap(), Some(Value::Int(1)));
    assert_eq!(engine.eval(r#"@cfg.name + "!""#).unwrap(), Some(Value::from("edge!")));
    assert_eq!(engine.eval("@cfg.limits.max + 1").unwrap(), Some(Value::Double(11.5)));
}

proptest! {
    #[test]
    fn additive_chains_fold_left(a in 0u32..1000, b in 0u32..1000, c in 0u32..1000) {
        let got = eval_str(&format!("{a} + {b} - {c}")).unwrap();
        prop_assert_eq!(got, Some(Value::Double(f64::from(a) + f64::from(b) - f64::from(c))));
    }
}
