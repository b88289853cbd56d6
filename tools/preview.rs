/// Preview: interactive expansion shell for testing grammars.
///
/// Usage: preview --rules <path> [--seed <n>] [--options <file.ron>]
///                [--hierarchical] [--depth <n>] [--log <level>]
///
/// Any line that is not a command is expanded as a template.
///
/// Commands:
///   :rules            list loaded rules
///   :seed <n>         reseed and rebuild the engine
///   :keep on|off      keep tags and runtime rules between lines
///   :bulk <n> <text>  expand a template n times with variety stats
///   :lint             show analysis findings
///   :help             list commands
///   :quit             exit

use narrative_grammar::{Engine, EngineOptions, LogLevel, TagStoragePolicy};
use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut rules_path = None;
    let mut options = EngineOptions {
        seed: Some(42),
        log_level: LogLevel::Warnings,
        ..EngineOptions::default()
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rules" if i + 1 < args.len() => {
                i += 1;
                rules_path = Some(args[i].clone());
            }
            "--options" if i + 1 < args.len() => {
                i += 1;
                match EngineOptions::load_from_ron(Path::new(&args[i])) {
                    Ok(loaded) => options = loaded,
                    Err(e) => {
                        eprintln!("ERROR loading options {}: {}", args[i], e);
                        std::process::exit(1);
                    }
                }
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                options.seed = Some(args[i].parse().unwrap_or(42));
            }
            "--depth" if i + 1 < args.len() => {
                i += 1;
                options.max_stack_depth = args[i].parse().unwrap_or(options.max_stack_depth);
            }
            "--log" if i + 1 < args.len() => {
                i += 1;
                match LogLevel::from_name(&args[i]) {
                    Some(level) => options.log_level = level,
                    None => eprintln!("Unknown log level: {}", args[i]),
                }
            }
            "--hierarchical" => {
                options.tag_storage = TagStoragePolicy::Hierarchical;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut files = Vec::new();
    if let Some(ref path) = rules_path {
        collect_rule_files(Path::new(path), &mut files);
    }

    let mut engine = match build_engine(&files, &options) {
        Some(engine) => engine,
        None => std::process::exit(1),
    };

    println!("Loaded {} rules", engine.rules().len());
    if let Some(seed) = options.seed {
        println!("Seed: {}", seed);
    }
    println!("Type ':help' for commands.\n");

    let mut keep_context = false;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }

        let Some(command) = line.strip_prefix(':') else {
            println!("{}", engine.expand_with_context(line, keep_context));
            continue;
        };

        let parts: Vec<&str> = command.splitn(3, ' ').collect();
        match parts[0] {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "rules" => {
                for name in engine.rule_names() {
                    let count = engine.rules().get(&name).map_or(0, |m| m.candidates.len());
                    println!("  {} ({} candidate(s))", name, count);
                }
            }
            "lint" => {
                let findings = engine.analyze();
                if findings.is_empty() {
                    println!("No findings.");
                }
                for finding in findings {
                    println!("  {}", finding);
                }
            }
            "seed" => {
                let Some(value) = parts.get(1) else {
                    println!("Current seed: {:?}", options.seed);
                    continue;
                };
                match value.parse::<u64>() {
                    Ok(seed) => {
                        options.seed = Some(seed);
                        if let Some(rebuilt) = build_engine(&files, &options) {
                            engine = rebuilt;
                            println!("Seed set to {}", seed);
                        }
                    }
                    Err(_) => println!("Invalid seed: {}", value),
                }
            }
            "keep" => match parts.get(1).copied() {
                Some("on") => {
                    keep_context = true;
                    println!("Keeping tags and runtime rules between lines.");
                }
                Some("off") => {
                    keep_context = false;
                    println!("Each line starts from a clean context.");
                }
                _ => println!("Usage: :keep on|off (currently {})", if keep_context { "on" } else { "off" }),
            },
            "bulk" => {
                let (Some(count), Some(template)) = (parts.get(1), parts.get(2)) else {
                    println!("Usage: :bulk <n> <template>");
                    continue;
                };
                let count: usize = match count.parse() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        println!("Invalid count: {}", count);
                        continue;
                    }
                };
                bulk(&mut engine, template, count);
            }
            other => println!("Unknown command ':{}'. Type ':help' for commands.", other),
        }
    }
}

fn bulk(engine: &mut Engine, template: &str, count: usize) {
    let outputs: Vec<String> = (0..count).map(|_| engine.expand(template)).collect();
    let errors = outputs.iter().filter(|o| o.starts_with("error: ")).count();
    let unique: HashSet<&String> = outputs.iter().collect();
    let avg_len = outputs.iter().map(|o| o.len() as f64).sum::<f64>() / outputs.len() as f64;

    println!("\n--- Bulk Results ({} expansions) ---", count);
    println!("Errors: {}", errors);
    println!("Unique outputs: {} / {}", unique.len(), count);
    println!("Average length: {:.1} chars", avg_len);

    let mut word_counts: HashMap<String, u32> = HashMap::new();
    for output in &outputs {
        for word in output.split_whitespace() {
            let clean = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if clean.len() > 3 {
                *word_counts.entry(clean).or_insert(0) += 1;
            }
        }
    }
    let mut word_freq: Vec<(String, u32)> = word_counts.into_iter().collect();
    word_freq.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    println!("Top words:");
    for (word, count) in word_freq.iter().take(10) {
        println!("  {:<16} {}", word, count);
    }

    if let Some(first) = outputs.first() {
        println!("\nSample:\n{}", first);
    }
    println!("--- End ---\n");
}

fn build_engine(files: &[PathBuf], options: &EngineOptions) -> Option<Engine> {
    let builder = files.iter().fold(
        Engine::builder().options(options.clone()).standard_modifiers(),
        |builder, path| builder.rule_file(path),
    );
    match builder.build() {
        Ok(engine) => Some(engine),
        Err(e) => {
            eprintln!("ERROR building engine: {}", e);
            None
        }
    }
}

fn collect_rule_files(path: &Path, files: &mut Vec<PathBuf>) {
    if path.is_file() {
        files.push(path.to_path_buf());
    } else if path.is_dir() {
        let Ok(entries) = std::fs::read_dir(path) else {
            eprintln!("ERROR reading {}", path.display());
            return;
        };
        let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
        paths.sort();
        for child in paths {
            let is_rule_file = matches!(
                child.extension().and_then(|s| s.to_str()),
                Some("ron") | Some("txt")
            );
            if child.is_dir() || is_rule_file {
                collect_rule_files(&child, files);
            }
        }
    } else {
        eprintln!("Rules path not found: {}", path.display());
    }
}

fn print_usage() {
    println!("Usage: preview --rules <path> [--seed <n>] [--options <file.ron>]");
    println!("               [--hierarchical] [--depth <n>] [--log <level>]");
    println!();
    println!("  --rules <path>      rule file (.ron or .txt) or directory");
    println!("  --seed <n>          RNG seed (default 42)");
    println!("  --options <file>    engine options in RON");
    println!("  --hierarchical      scope tags by expansion depth");
    println!("  --depth <n>         maximum rule nesting (default 256)");
    println!("  --log <level>       none, errors, warnings, info or verbose");
}

fn print_help() {
    println!("Any other line is expanded as a template.");
    println!("  :rules            list loaded rules");
    println!("  :seed <n>         reseed and rebuild the engine");
    println!("  :keep on|off      keep tags and runtime rules between lines");
    println!("  :bulk <n> <text>  expand a template n times with variety stats");
    println!("  :lint             show analysis findings");
    println!("  :help             list commands");
    println!("  :quit             exit");
}
