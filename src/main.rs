use std::fs;

use clap::Parser as ArgParser;
use exprima::{Context, Parser, Value};

/// exprima evaluates an arithmetic/logical expression against a set of
/// variable bindings.
#[derive(ArgParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Treat the input as a file path instead of expression text.
    #[arg(short, long)]
    file: bool,

    /// Bind a context variable, e.g. `-D x=4` or `-D name=world`.
    /// Values that parse as numbers or booleans are bound as such;
    /// everything else is bound as a string.
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    define: Vec<String>,

    contents: String,
}

fn parse_binding(definition: &str) -> Option<(&str, Value)> {
    let (name, raw) = definition.split_once('=')?;

    let value = if let Ok(number) = raw.parse::<f64>() {
        Value::Number(number)
    } else if let Ok(flag) = raw.parse::<bool>() {
        Value::Bool(flag)
    } else {
        Value::Str(raw.to_string())
    };

    Some((name, value))
}

fn main() {
    let args = Args::parse();

    let expression = if args.file {
        fs::read_to_string(&args.contents).unwrap_or_else(|_| {
            eprintln!("Failed to read the input file '{}'. Perhaps this file does not exist?",
                      &args.contents);
            std::process::exit(1);
        })
    } else {
        args.contents
    };

    let context = Context::new();
    for definition in &args.define {
        match parse_binding(definition) {
            Some((name, value)) => context.set(name, value),
            None => {
                eprintln!("Invalid definition '{definition}'. Expected NAME=VALUE.");
                std::process::exit(1);
            },
        }
    }

    match Parser::new().evaluate(&expression, &context) {
        Ok(value) => println!("{value}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        },
    }
}
