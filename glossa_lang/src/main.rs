// Glossa word generator: CLI entry point.
//
// Loads a language configuration, generates words for one tag blend, and
// optionally synthesizes grammatical suffixes. Words go to stdout, one per
// line; logging and the missing-tag report go to stderr. Any generation
// failure aborts the run with a non-zero exit code.
//
// Usage:
//   generate <config.json> [OPTIONS] <tag[:weight]>...
//     --seed <N>              Random seed (default: 42)
//     --count <N>             Words to generate (default: 1)
//     --attempts <N>          Attempt budget per word (default: 100)
//     --suffix <GRAMMAR>      Also print the suffix for GRAMMAR (repeatable)
//     --missing-report <PATH> Write the missing-tag report to PATH
//
// Log verbosity follows `RUST_LOG` (default `glossa_lang=info`).

use glossa_lang::{DEFAULT_ATTEMPTS, Engine, TagInput};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Rows of the missing-tag report echoed to stderr.
const REPORT_PREVIEW: usize = 50;

struct Options {
    config: PathBuf,
    seed: u64,
    count: usize,
    attempts: usize,
    suffixes: Vec<String>,
    missing_report: Option<PathBuf>,
    tags: TagInput,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "glossa_lang=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = parse_args();

    let mut engine = match Engine::load(&options.config, options.seed) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    for _ in 0..options.count {
        match engine.generate_with_attempts(&options.tags, options.attempts) {
            Ok(word) => println!("{word}"),
            Err(e) => {
                eprintln!("Generation failed: {e}");
                std::process::exit(1);
            }
        }
    }

    for grammar_type in &options.suffixes {
        let suffix = engine.suffix_for(grammar_type);
        println!("{grammar_type}\t{suffix}");
    }

    let report = engine.missing_tag_report();
    if !report.is_empty() {
        eprintln!("--- missing tags ({} unique) ---", report.len());
        for (tag, count) in report.iter().take(REPORT_PREVIEW) {
            eprintln!("  {tag}: {count}");
        }
    }
    let written = options
        .missing_report
        .as_ref()
        .map(|path| engine.write_missing_tags(path));
    if let Some(Err(e)) = written {
        eprintln!("Failed to write missing-tag report: {e}");
        std::process::exit(1);
    }
}

/// Parse command-line arguments with plain `std::env::args()` matching.
fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut config: Option<PathBuf> = None;
    let mut options = Options {
        config: PathBuf::new(),
        seed: 42,
        count: 1,
        attempts: DEFAULT_ATTEMPTS,
        suffixes: Vec::new(),
        missing_report: None,
        tags: TagInput::default(),
    };
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                options.seed = parse_value(&args, i, "--seed requires a number");
            }
            "--count" => {
                i += 1;
                options.count = parse_value(&args, i, "--count requires a number");
            }
            "--attempts" => {
                i += 1;
                options.attempts = parse_value(&args, i, "--attempts requires a number");
            }
            "--suffix" => {
                i += 1;
                options
                    .suffixes
                    .push(parse_value(&args, i, "--suffix requires a grammar type"));
            }
            "--missing-report" => {
                i += 1;
                options.missing_report =
                    Some(parse_value(&args, i, "--missing-report requires a path"));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other if other.starts_with("--") => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
            positional if config.is_none() => config = Some(PathBuf::from(positional)),
            tag => match TagInput::parse_arg(tag) {
                Ok((tag, weight)) => options.tags.set(tag, weight),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            },
        }
        i += 1;
    }

    let Some(config) = config else {
        eprintln!("Missing config path");
        print_usage();
        std::process::exit(1);
    };
    options.config = config;

    if options.tags.is_empty() && options.count > 0 {
        eprintln!("At least one tag is required to generate words");
        print_usage();
        std::process::exit(1);
    }

    options
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, message: &str) -> T {
    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        eprintln!("{message}");
        std::process::exit(1);
    })
}

fn print_usage() {
    println!("Usage: generate <config.json> [OPTIONS] <tag[:weight]>...");
    println!();
    println!("Options:");
    println!("  --seed <N>              Random seed (default: 42)");
    println!("  --count <N>             Words to generate (default: 1)");
    println!("  --attempts <N>          Attempt budget per word (default: {DEFAULT_ATTEMPTS})");
    println!("  --suffix <GRAMMAR>      Also print the suffix for GRAMMAR (repeatable)");
    println!("  --missing-report <PATH> Write the missing-tag report to PATH");
    println!("  --help, -h              Show this help");
}
