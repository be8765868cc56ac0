//! clause-cli — bibliothèque interne du binaire `clause`
//!
//! Le parsing d'arguments reste dans `main.rs` ; ici :
//! - les tâches ([`Command`]) et leurs entrées ([`Input`], [`Binding`]),
//! - leur exécution contre la façade `clause`, sortie sur un `Write`,
//! - le logger (`feature = "trace"`) et les statuts colorés (`feature = "color"`).

#![deny(unused_must_use)]
#![forbid(unsafe_code)]

use std::{
    fs::File,
    io::{self, BufReader, Read, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result};
use clause::{disasm, Engine, EngineOptions, Value};

#[cfg(feature = "color")]
use owo_colors::OwoColorize;

macro_rules! cli_log {
    ($lvl:ident, $($arg:tt)*) => {{
        #[cfg(feature = "trace")]
        log::$lvl!($($arg)*);
    }};
}

// ───────────────────────────── Types publics ─────────────────────────────

/// Commande haut-niveau (sans parsing CLI, réservé à main.rs).
#[derive(Clone, Debug)]
pub enum Command {
    /// Évalue une expression.
    Eval(EvalTask),
    /// Liste les jetons.
    Tokens(TokensTask),
    /// Affiche l'AST en JSON.
    Ast(AstTask),
    /// Compile puis désassemble.
    Disasm(DisasmTask),
}

/// `clause eval`.
#[derive(Clone, Debug, Default)]
pub struct EvalTask {
    /// Source de l'expression.
    pub input: Input,
    /// Liaisons `@nom`, dans l'ordre de la ligne de commande.
    pub bindings: Vec<Binding>,
    /// Options du moteur.
    pub options: EngineOptions,
    /// Affiche le temps d'évaluation.
    pub time: bool,
    /// Code de sortie 1 si la valeur est nulle, fausse ou absente.
    pub exit_status: bool,
}

/// `clause tokens`.
#[derive(Clone, Debug, Default)]
pub struct TokensTask {
    /// Source.
    pub input: Input,
    /// Omet les jetons d'espacement.
    pub skip_whitespace: bool,
    /// Un tableau JSON au lieu du listing.
    pub json: bool,
    /// Options du moteur (seules celles du lexer servent).
    pub options: EngineOptions,
}

/// `clause ast`.
#[derive(Clone, Debug, Default)]
pub struct AstTask {
    /// Source.
    pub input: Input,
    /// JSON sur une ligne.
    pub compact: bool,
    /// Options du moteur (seules celles du lexer servent).
    pub options: EngineOptions,
}

/// `clause disasm`.
#[derive(Clone, Debug, Default)]
pub struct DisasmTask {
    /// Source.
    pub input: Input,
    /// Code seul, sans la table des constantes.
    pub compact: bool,
    /// Options du moteur.
    pub options: EngineOptions,
}

/// Texte source : expression en ligne, fichier ou stdin.
#[derive(Clone, Debug, Default)]
pub enum Input {
    /// Expression passée en argument.
    Expr(String),
    /// Fichier.
    Path(PathBuf),
    /// Entrée standard.
    #[default]
    Stdin,
}

/// Liaison `@name` fournie sur la ligne de commande.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    /// Nom lié, sans `@`.
    pub name: String,
    /// Document JSON.
    pub value: BindingValue,
}

/// Provenance du document JSON d'une liaison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingValue {
    /// Texte JSON en ligne (`--bind name=json`).
    Json(String),
    /// Fichier JSON (`--bind-file name=path`).
    File(PathBuf),
}

impl Binding {
    /// Analyse `name=json`.
    pub fn parse_inline(arg: &str) -> Result<Self, String> {
        let (name, json) = split_binding(arg)?;
        Ok(Self { name, value: BindingValue::Json(json.to_owned()) })
    }

    /// Analyse `name=path`.
    pub fn parse_file(arg: &str) -> Result<Self, String> {
        let (name, path) = split_binding(arg)?;
        if path.is_empty() {
            return Err(format!("empty path in binding `{arg}`"));
        }
        Ok(Self { name, value: BindingValue::File(PathBuf::from(path)) })
    }

    /// Charge le document JSON.
    pub fn load(&self) -> Result<serde_json::Value> {
        match &self.value {
            BindingValue::Json(text) => {
                serde_json::from_str(text).with_context(|| format!("binding @{}: invalid JSON", self.name))
            },
            BindingValue::File(path) => {
                let f = File::open(path).with_context(|| format!("binding @{}: open {}", self.name, display(path)))?;
                serde_json::from_reader(BufReader::new(f))
                    .with_context(|| format!("binding @{}: invalid JSON in {}", self.name, display(path)))
            },
        }
    }
}

fn split_binding(arg: &str) -> Result<(String, &str), String> {
    let (name, rest) = arg.split_once('=').ok_or_else(|| format!("expected NAME=VALUE, got `{arg}`"))?;
    let name = name.strip_prefix('@').unwrap_or(name);
    if name.is_empty() || !name.chars().all(char::is_alphabetic) {
        return Err(format!("invalid binding name `{name}`"));
    }
    Ok((name.to_owned(), rest))
}

// ───────────────────────────── Initialisation ─────────────────────────────

/// Initialise le logger selon la feature `trace`.
pub fn init_logger() {
    #[cfg(feature = "trace")]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .try_init();
    }
}

// ───────────────────────────── Exécution ─────────────────────────────

/// Exécute une commande, résultats sur `out`. Retourne un code de sortie :
/// 0, ou 1 pour `eval --exit-status` sur une valeur fausse.
pub fn execute(cmd: Command, out: &mut dyn Write) -> Result<i32> {
    match cmd {
        Command::Eval(t) => eval_entry(t, out),
        Command::Tokens(t) => {
            tokens_entry(&t, out)?;
            Ok(0)
        },
        Command::Ast(t) => {
            ast_entry(&t, out)?;
            Ok(0)
        },
        Command::Disasm(t) => {
            disasm_entry(&t, out)?;
            Ok(0)
        },
    }
}

fn eval_entry(task: EvalTask, out: &mut dyn Write) -> Result<i32> {
    let src = read_source(&task.input)?;
    let mut engine = Engine::with_options(task.options);
    for binding in &task.bindings {
        let doc = binding.load()?;
        engine.register_value(binding.name.as_str(), doc);
        cli_log!(debug, "bound @{}", binding.name);
    }

    let t0 = Instant::now();
    let value = engine.eval(&src).context("evaluation failed")?;
    let elapsed = t0.elapsed();

    match &value {
        Some(v) => writeln!(out, "{v}")?,
        None => status_info("EVAL", "empty program, no value"),
    }
    if task.time {
        status_info("TIME", &format!("eval: {} µs", elapsed.as_micros()));
    }
    if task.exit_status && !value.as_ref().is_some_and(is_truthy) {
        cli_log!(debug, "falsy result, exit status 1");
        return Ok(1);
    }
    Ok(0)
}

/// Zéro numérique et `false` sont faux, le reste vrai.
fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Int(i) => *i != 0,
        Value::Bool(b) => *b,
        Value::Double(d) => *d != 0.0,
        _ => true,
    }
}

fn tokens_entry(task: &TokensTask, out: &mut dyn Write) -> Result<()> {
    let src = read_source(&task.input)?;
    let tokens: Vec<_> = Engine::with_options(task.options)
        .tokenize(&src)?
        .into_iter()
        .filter(|t| !(task.skip_whitespace && t.kind == clause::lexer::TokenKind::Whitespace))
        .collect();
    cli_log!(debug, "{} tokens", tokens.len());

    if task.json {
        serde_json::to_writer_pretty(&mut *out, &tokens)?;
        writeln!(out)?;
        return Ok(());
    }
    for t in &tokens {
        writeln!(out, "{:<8} {:<14} {:?}", t.range.to_string(), t.kind.to_string(), t.text)?;
    }
    Ok(())
}

fn ast_entry(task: &AstTask, out: &mut dyn Write) -> Result<()> {
    let src = read_source(&task.input)?;
    let ast = Engine::with_options(task.options).parse(&src)?;
    if task.compact {
        serde_json::to_writer(&mut *out, &ast)?;
    } else {
        serde_json::to_writer_pretty(&mut *out, &ast)?;
    }
    writeln!(out)?;
    Ok(())
}

fn disasm_entry(task: &DisasmTask, out: &mut dyn Write) -> Result<()> {
    let src = read_source(&task.input)?;
    let program = Engine::with_options(task.options).compile(&src)?;
    let text = if task.compact {
        disasm::disassemble_compact(&program)
    } else {
        disasm::disassemble_full(&program, &input_title(&task.input))
    };
    out.write_all(text.as_bytes())?;
    status_ok("DISASM", &format!("{} words", program.instructions.len()));
    Ok(())
}

// ───────────────────────────── Utilitaires E/S ─────────────────────────────

fn read_source(input: &Input) -> Result<String> {
    match input {
        Input::Expr(s) => Ok(s.clone()),
        Input::Stdin => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s).context("reading stdin")?;
            Ok(s)
        },
        Input::Path(p) => {
            let f = File::open(p).with_context(|| format!("open: {}", display(p)))?;
            let mut s = String::new();
            BufReader::new(f).read_to_string(&mut s).with_context(|| format!("read: {}", display(p)))?;
            if s.is_empty() {
                cli_log!(warn, "{} is empty", display(p));
            }
            Ok(s)
        },
    }
}

fn input_title(input: &Input) -> String {
    match input {
        Input::Expr(_) => "<expr>".to_owned(),
        Input::Stdin => "<stdin>".to_owned(),
        Input::Path(p) => display(p),
    }
}

fn display(p: &Path) -> String { p.to_string_lossy().to_string() }



// ───────────────────────────── Sorties jolies ─────────────────────────────

fn status_ok(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    {
        eprintln!("{} {}", tag.green().bold(), msg);
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{tag} {msg}");
    }
}

fn status_info(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    {
        eprintln!("{} {}", tag.blue().bold(), msg);
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{tag} {msg}");
    }
}

// ───────────────────────────── Tests ─────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(cmd: Command) -> Result<String> {
        let mut out = Vec::new();
        let code = execute(cmd, &mut out)?;
        assert_eq!(code, 0);
        Ok(String::from_utf8(out)?)
    }

    fn exit_code(src: &str) -> i32 {
        let task = EvalTask { input: Input::Expr(src.into()), exit_status: true, ..EvalTask::default() };
        execute(Command::Eval(task), &mut Vec::new()).unwrap()
    }

    fn eval(src: &str, bindings: &[&str]) -> Result<String> {
        let bindings = bindings.iter().map(|b| Binding::parse_inline(b).map_err(|e| anyhow::anyhow!(e))).collect::<Result<_>>()?;
        run(Command::Eval(EvalTask { input: Input::Expr(src.into()), bindings, ..EvalTask::default() }))
    }

    #[test]
    fn binding_arguments() {
        assert_eq!(
            Binding::parse_inline(r#"user={"a":1}"#),
            Ok(Binding { name: "user".into(), value: BindingValue::Json(r#"{"a":1}"#.into()) })
        );
        assert_eq!(Binding::parse_inline("@x=1").map(|b| b.name), Ok("x".into()));
        assert_eq!(
            Binding::parse_file("cfg=conf/app.json").map(|b| b.value),
            Ok(BindingValue::File(PathBuf::from("conf/app.json")))
        );
        assert!(Binding::parse_inline("novalue").is_err());
        assert!(Binding::parse_inline("=1").is_err());
        assert!(Binding::parse_inline("a_b=1").is_err());
        assert!(Binding::parse_file("x=").is_err());
    }

    #[test]
    fn eval_prints_the_value() {
        assert_eq!(eval("2 + 3 * 4", &[]).unwrap(), "14.0\n");
        assert_eq!(eval(r#""a" + "b""#, &[]).unwrap(), "ab\n");
        assert_eq!(eval("", &[]).unwrap(), "");
    }

    #[test]
    fn eval_with_json_bindings() {
        let user = r#"user={"role": {"name": "HI"}, "age": 42}"#;
        assert_eq!(eval(r#"@user.role.name + "I" == "HII""#, &[user]).unwrap(), "1\n");
        assert_eq!(eval("@user.age > 40", &[user]).unwrap(), "1\n");
        assert_eq!(eval("@n + 1", &["n=2.5"]).unwrap(), "3.5\n");
        // Un entier JSON reste Int : pas d'élargissement implicite vers Double.
        assert!(eval("@n + 1", &["n=2"]).is_err());
    }

    #[test]
    fn eval_errors_carry_context() {
        let e = eval("@missing.x", &[]).unwrap_err();
        assert_eq!(e.to_string(), "evaluation failed");
        assert!(format!("{e:#}").contains("missing"));

        let e = eval("@x", &["x={"]).unwrap_err();
        assert!(e.to_string().contains("invalid JSON"));
        assert!(eval("@x", &["x=null"]).is_err());
    }

    #[test]
    fn exit_status_follows_the_value() {
        assert_eq!(exit_code("2 > 1"), 0);
        assert_eq!(exit_code("2 < 1"), 1);
        assert_eq!(exit_code("false"), 1);
        assert_eq!(exit_code(r#""x""#), 0);
        assert_eq!(exit_code(""), 1);
        let mut out = Vec::new();
        let plain = EvalTask { input: Input::Expr("2 < 1".into()), ..EvalTask::default() };
        assert_eq!(execute(Command::Eval(plain), &mut out).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "0\n");
    }

    #[test]
    fn binding_from_missing_file() {
        let b = Binding::parse_file("x=/definitely/not/here.json").unwrap();
        assert!(b.load().unwrap_err().to_string().contains("open"));
    }

    #[test]
    fn tokens_listing() {
        let out = run(Command::Tokens(TokensTask {
            input: Input::Expr("@a + 1".into()),
            skip_whitespace: true,
            json: false,
            ..TokensTask::default()
        }))
        .unwrap();
        let kinds: Vec<_> = out.lines().map(|l| l.split_whitespace().nth(1).unwrap_or_default().to_owned()).collect();
        assert_eq!(kinds.len(), 5);
        assert!(out.lines().next().unwrap().starts_with("1:0"));
        assert!(out.lines().last().unwrap().contains("\"\""));
    }

    #[test]
    fn tokens_as_json() {
        let out = run(Command::Tokens(TokensTask { input: Input::Expr("1".into()), json: true, ..TokensTask::default() }))
            .unwrap();
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc.as_array().map(Vec::len), Some(2));
        assert_eq!(doc[0]["text"], "1");
    }

    #[test]
    fn ast_as_json() {
        let out = run(Command::Ast(AstTask { input: Input::Expr("1 + 2".into()), compact: true, ..AstTask::default() })).unwrap();
        assert_eq!(out.lines().count(), 1);
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(doc.is_object());
        assert!(run(Command::Ast(AstTask { input: Input::Expr("1 +".into()), ..AstTask::default() })).is_err());
    }

    #[test]
    fn lexer_options_reach_tokens_and_ast() {
        let mut options = EngineOptions::default();
        options.lexer.keyword_boundary = false;

        let split = run(Command::Tokens(TokensTask { input: Input::Expr("orx".into()), options, ..TokensTask::default() }))
            .unwrap();
        let whole = run(Command::Tokens(TokensTask { input: Input::Expr("orx".into()), ..TokensTask::default() })).unwrap();
        assert_eq!(split.lines().count(), 3);
        assert_eq!(whole.lines().count(), 2);

        assert!(run(Command::Ast(AstTask { input: Input::Expr("orx".into()), ..AstTask::default() })).is_ok());
        assert!(run(Command::Ast(AstTask { input: Input::Expr("orx".into()), options, ..AstTask::default() })).is_err());
    }

    #[test]
    fn disasm_listing() {
        let full = run(Command::Disasm(DisasmTask { input: Input::Expr("@user.name".into()), ..DisasmTask::default() }))
            .unwrap();
        assert!(full.starts_with("== <expr> =="));
        assert!(full.contains("getstatic"));
        assert!(full.contains("getattr"));

        let compact =
            run(Command::Disasm(DisasmTask { input: Input::Expr("1 + 2".into()), compact: true, ..DisasmTask::default() }))
                .unwrap();
        assert!(!compact.contains(";; constants"));
        assert!(compact.contains("dadd"));
    }

    #[test]
    fn source_from_file() {
        let err = run(Command::Eval(EvalTask { input: Input::Path("/no/such/file.cl".into()), ..EvalTask::default() }))
            .unwrap_err();
        assert!(err.to_string().starts_with("open: "));
    }
}
