//! Web Algebra command-line interface
//!
//! Evaluates a stored JSON program with `--from-json`, or reads one JSON
//! program per line from standard input and prints each result. Errors are
//! reported with their kind; in batch mode they terminate the process with
//! a non-zero exit code.

use std::io::{BufRead, Write};

use anyhow::Context;
use clap::Parser;
use web_algebra::{Error, Evaluator, Settings, Value};

#[derive(Parser, Debug)]
#[command(name = "web-algebra")]
#[command(version)]
#[command(about = "Interpreter for a JSON-encoded expression language over Linked Data and SPARQL")]
struct Args {
    /// JSON program file to evaluate; without it a REPL reads programs from stdin
    #[arg(long, value_name = "FILE")]
    from_json: Option<String>,

    /// Path to the client certificate bundle (PEM, or PKCS#12 when a password is set)
    #[arg(long, env = "CERT_PEM_PATH")]
    cert_pem_path: Option<String>,

    /// Passphrase for the client certificate key
    #[arg(long, env = "CERT_PASSWORD")]
    cert_password: Option<String>,

    /// Skip server certificate verification (development endpoints only)
    #[arg(long)]
    no_verify_ssl: bool,

    /// API key passed through to the natural-language front-end
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Model name passed through to the natural-language front-end
    #[arg(long, env = "OPENAI_MODEL")]
    openai_model: Option<String>,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            cert_pem_path: self.cert_pem_path.clone(),
            cert_password: self.cert_password.clone(),
            verify_ssl: !self.no_verify_ssl,
            openai_api_key: self.openai_api_key.clone(),
            openai_model: self.openai_model.clone(),
        }
    }
}

fn print_value(value: &Value) {
    match value {
        Value::Null => {}
        other => println!("{}", other),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let evaluator = Evaluator::new(args.settings());

    if let Some(path) = &args.from_json {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read program file {}", path))?;
        let program: serde_json::Value =
            serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path))?;

        match evaluator.evaluate(&program) {
            Ok(value) => {
                print_value(&value);
                Ok(())
            }
            Err(error) => {
                eprintln!("{}: {}", error.kind(), error);
                std::process::exit(1);
            }
        }
    } else {
        repl(&evaluator)
    }
}

/// Reads one JSON program per line, evaluates it, and keeps going on errors.
fn repl(evaluator: &Evaluator) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut stderr = std::io::stderr();

    write!(stderr, "> ")?;
    stderr.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            match serde_json::from_str::<serde_json::Value>(trimmed) {
                Ok(program) => match evaluator.evaluate(&program) {
                    Ok(value) => print_value(&value),
                    Err(error) => eprintln!("{}: {}", error.kind(), error),
                },
                Err(error) => {
                    let error = Error::Program(format!("invalid JSON program: {}", error));
                    eprintln!("{}: {}", error.kind(), error);
                }
            }
        }
        write!(stderr, "> ")?;
        stderr.flush()?;
    }

    Ok(())
}
