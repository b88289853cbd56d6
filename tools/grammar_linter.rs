/// Grammar Linter: checks rule files for parse errors and structural problems.
///
/// Usage: grammar_linter <rules_path> [--strict]
///
/// `rules_path` is a `.ron`/`.txt` rule file or a directory searched
/// recursively. Parse errors fail the run; analysis findings are warnings
/// unless `--strict` is given.

use narrative_grammar::core::analysis::{analyze, unresolved_references};
use narrative_grammar::core::grammar::{is_valid_name, GrammarSet};
use narrative_grammar::core::loader::{self, RuleEntries};
use narrative_grammar::core::logging::Logger;
use narrative_grammar::core::parser::parse_str;
use narrative_grammar::LogLevel;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: grammar_linter <rules_path> [--strict]");
        process::exit(0);
    }

    let rules_path = Path::new(&args[1]);
    let strict = args[2..].iter().any(|a| a == "--strict");

    let files = if rules_path.is_file() {
        vec![rules_path.to_path_buf()]
    } else if rules_path.is_dir() {
        let mut files = Vec::new();
        collect_rule_files(rules_path, &mut files);
        files
    } else {
        eprintln!("ERROR: Path '{}' does not exist", rules_path.display());
        process::exit(1);
    };

    let log = Logger::new(LogLevel::None);
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut grammars = GrammarSet::new();

    for path in &files {
        match loader::load_file(path, &log) {
            Ok(entries) => {
                println!("  Loaded: {}", path.display());
                lint_entries(path, &entries, &mut errors, &mut warnings);
                for (name, candidates) in entries {
                    // Failures were already reported by lint_entries
                    let _ = grammars.add(&name, candidates.into(), &log);
                }
            }
            Err(e) => errors.push(format!("{}: {}", path.display(), e)),
        }
    }

    println!("Loaded {} rules from {} file(s)", grammars.len(), files.len());

    for finding in analyze(&grammars, true)
        .into_iter()
        .chain(unresolved_references(&grammars))
    {
        if strict {
            errors.push(finding.to_string());
        } else {
            warnings.push(finding.to_string());
        }
    }

    println!("\n=== Grammar Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn collect_rule_files(dir: &Path, files: &mut Vec<PathBuf>) {
    match loader::rule_files_in(dir) {
        Ok(found) => files.extend(found),
        Err(e) => eprintln!("  ERROR reading {}: {}", dir.display(), e),
    }
    if let Ok(entries) = std::fs::read_dir(dir) {
        let mut subdirs: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        subdirs.sort();
        for subdir in subdirs {
            collect_rule_files(&subdir, files);
        }
    }
}

fn lint_entries(path: &Path, entries: &RuleEntries, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    for (name, candidates) in entries {
        if !is_valid_name(name) {
            errors.push(format!("{}: invalid rule name '{}'", path.display(), name));
            continue;
        }
        if candidates.is_empty() {
            errors.push(format!("{}: rule '{}' has no candidates", path.display(), name));
        }
        for candidate in candidates {
            if let Err(e) = parse_str(candidate) {
                errors.push(format!(
                    "{}: rule '{}' candidate does not parse: {}",
                    path.display(),
                    name,
                    e
                ));
            }
        }
        if candidates.len() == 1 && candidates[0].is_empty() {
            warnings.push(format!("{}: rule '{}' always expands to nothing", path.display(), name));
        }
    }
}
