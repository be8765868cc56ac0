//! `clause` — CLI du langage d'expressions
//!
//! Ici uniquement : parsing d'arguments, initialisation (logger, couleur),
//! puis délégation à `clause_cli` (lib).

#![forbid(unsafe_code)]

use std::{io, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use clause_cli as cli;

// ──────────────────────────── CLI (clap) ────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "clause", version, about = "clause : évaluer, tokeniser, inspecter des expressions", long_about = None)]
struct Opt {
    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux (casse la verbosité)
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, global = true)]
    quiet: bool,

    /// Force la couleur (si la feature `color` est compilée)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    /// Sous-commandes
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// Source commune : expression en argument, `-` pour stdin, ou `--file`.
#[derive(Debug, Args)]
struct SourceArgs {
    /// Expression (ou - pour stdin)
    #[arg(value_name = "EXPR", conflicts_with = "file")]
    expr: Option<String>,
    /// Lire l'expression depuis un fichier
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,
}

/// Réglages du lexer, du compilateur et de la VM.
#[derive(Debug, Args)]
struct EngineArgs {
    /// Les mots-clés collés à une lettre (`orx`) sont découpés
    #[arg(long = "no-keyword-boundary")]
    no_keyword_boundary: bool,
    /// Ne pas valider le programme compilé
    #[arg(long = "no-validate")]
    no_validate: bool,
    /// Profondeur maximale de la pile d'opérandes
    #[arg(long = "max-stack", value_name = "N")]
    max_stack: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Évaluer une expression et afficher sa valeur
    Eval {
        #[command(flatten)]
        source: SourceArgs,
        /// Lier @NAME à un document JSON (répétable)
        #[arg(long = "bind", value_name = "NAME=JSON", value_parser = cli::Binding::parse_inline)]
        bind: Vec<cli::Binding>,
        /// Lier @NAME au contenu d'un fichier JSON (répétable)
        #[arg(long = "bind-file", value_name = "NAME=PATH", value_parser = cli::Binding::parse_file)]
        bind_file: Vec<cli::Binding>,
        #[command(flatten)]
        engine: EngineArgs,
        /// Afficher le temps d'évaluation
        #[arg(long)]
        time: bool,
        /// Code de sortie 1 si le résultat est faux, nul ou absent
        #[arg(short = 'e', long = "exit-status")]
        exit_status: bool,
    },

    /// Lister les jetons
    Tokens {
        #[command(flatten)]
        source: SourceArgs,
        /// Omettre les espacements
        #[arg(long = "skip-whitespace")]
        skip_whitespace: bool,
        /// Sortie JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Afficher l'AST (JSON)
    Ast {
        #[command(flatten)]
        source: SourceArgs,
        /// JSON sur une ligne
        #[arg(long)]
        compact: bool,
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Compiler puis désassembler
    Disasm {
        #[command(flatten)]
        source: SourceArgs,
        /// Code seul, sans table des constantes
        #[arg(long)]
        compact: bool,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

// ──────────────────────────── Entrée / Options ────────────────────────────

fn input_from_opt(source: SourceArgs) -> cli::Input {
    match (source.expr, source.file) {
        (_, Some(path)) => cli::Input::Path(path),
        (Some(expr), None) if expr == "-" => cli::Input::Stdin,
        (Some(expr), None) => cli::Input::Expr(expr),
        (None, None) => cli::Input::Stdin,
    }
}

fn options_from_opt(args: &EngineArgs) -> clause::EngineOptions {
    let mut opts = clause::EngineOptions::default();
    opts.lexer.keyword_boundary = !args.no_keyword_boundary;
    opts.compiler.validate = !args.no_validate;
    if let Some(n) = args.max_stack {
        opts.vm.max_stack = n;
    }
    opts
}

// ──────────────────────────── Logger / Verbosité ────────────────────────────

fn init_telemetry(verbose: u8, quiet: bool) {
    #[cfg(feature = "trace")]
    {
        let level = if quiet {
            "error"
        } else {
            match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        };
        std::env::set_var("RUST_LOG", std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()));
        cli::init_logger();
    }
    #[cfg(not(feature = "trace"))]
    let _ = (verbose, quiet);
}

fn init_color(choice: ColorChoice) {
    // owo-colors détecte le TTY ; on ne force que sur demande.
    match choice {
        ColorChoice::Auto => {},
        ColorChoice::Always => {
            std::env::set_var("CLICOLOR_FORCE", "1");
            std::env::remove_var("NO_COLOR");
        },
        ColorChoice::Never => {
            std::env::set_var("NO_COLOR", "1");
            std::env::remove_var("CLICOLOR_FORCE");
        },
    }
}

// ──────────────────────────── main ────────────────────────────

fn main() -> ExitCode {
    match real_main() {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        },
    }
}

fn real_main() -> Result<i32> {
    let opt = Opt::parse();

    init_color(opt.color);
    init_telemetry(opt.verbose, opt.quiet);

    use cli::{AstTask, Command as C, DisasmTask, EvalTask, TokensTask};

    let command = match opt.cmd {
        Command::Eval { source, mut bind, bind_file, engine, time, exit_status } => {
            bind.extend(bind_file);
            C::Eval(EvalTask {
                input: input_from_opt(source),
                bindings: bind,
                options: options_from_opt(&engine),
                time,
                exit_status,
            })
        },
        Command::Tokens { source, skip_whitespace, json, engine } => C::Tokens(TokensTask {
            input: input_from_opt(source),
            skip_whitespace,
            json,
            options: options_from_opt(&engine),
        }),
        Command::Ast { source, compact, engine } => {
            C::Ast(AstTask { input: input_from_opt(source), compact, options: options_from_opt(&engine) })
        },
        Command::Disasm { source, compact, engine } => {
            C::Disasm(DisasmTask { input: input_from_opt(source), compact, options: options_from_opt(&engine) })
        },
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    cli::execute(command, &mut out).context("command failed")
}
