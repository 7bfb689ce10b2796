use polymap::dialect::{self, Dialect};
use polymap::generator;
use polymap::unify;
use std::env;
use std::fs;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <input>... [options]", args[0]);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  -d, --dialect <name>  graph, document, keyvalue, relational");
        eprintln!("                        (default: inferred from the file name)");
        eprintln!("  -u, --unify           merge canonical documents instead of mapping");
        eprintln!("  -o, --output <file>   Output file (default: stdout)");
        process::exit(1);
    }

    let mut inputs: Vec<String> = Vec::new();
    let mut dialect_name: Option<String> = None;
    let mut output_path: Option<String> = None;
    let mut unify_mode = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-d" | "--dialect" => {
                i += 1;
                if i < args.len() {
                    dialect_name = Some(args[i].clone());
                }
            }
            "-o" | "--output" => {
                i += 1;
                if i < args.len() {
                    output_path = Some(args[i].clone());
                }
            }
            "-u" | "--unify" => unify_mode = true,
            opt if opt.starts_with('-') => {
                eprintln!("Unknown option: {}", opt);
                process::exit(1);
            }
            path => inputs.push(path.to_string()),
        }
        i += 1;
    }

    if inputs.is_empty() {
        eprintln!("No input files given");
        process::exit(1);
    }

    let result = if unify_mode {
        let mut documents = Vec::new();
        for path in &inputs {
            documents.push(read_input(path));
        }
        unify::unify(&documents)
    } else {
        if inputs.len() != 1 {
            eprintln!("Mapping takes exactly one input file (use -u to merge)");
            process::exit(1);
        }
        let input = &inputs[0];
        let name = dialect_name.unwrap_or_else(|| infer_dialect(input).name().to_string());
        let source = read_input(input);

        let output = match dialect::parse(&name, &source) {
            Ok(output) => output,
            Err(e) => {
                eprintln!("Failed to map {}: {}", input, e);
                process::exit(1);
            }
        };
        for diagnostic in &output.diagnostics {
            eprintln!("warning: {}", diagnostic.message);
        }
        generator::generate(&output.schema)
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &result) {
                eprintln!("Failed to write {}: {}", path, e);
                process::exit(1);
            }
        }
        None => println!("{}", result),
    }
}

fn read_input(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            process::exit(1);
        }
    }
}

/// Guess the dialect from the file name when none is given explicitly.
fn infer_dialect(path: &str) -> Dialect {
    let lower = path.to_lowercase();
    if lower.contains("document") {
        Dialect::Document
    } else if lower.contains("keyvalue") || lower.contains("kv") || lower.ends_with(".json") {
        Dialect::KeyValue
    } else if lower.contains("relational") || lower.ends_with(".sql") || lower.ends_with(".ddl") {
        Dialect::Relational
    } else {
        Dialect::Graph
    }
}
