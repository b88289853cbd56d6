/// Fable example: expands the bundled animal-fable grammar.
///
/// Shows rule files, the standard modifiers, weighted candidates, host
/// objects and methods, and the analysis pass.
///
/// Run with: cargo run --example fable

use narrative_grammar::{Engine, LogLevel};

fn main() {
    let mut engine = Engine::builder()
        .seed(1984)
        .log_level(LogLevel::Warnings)
        .rule_file("grammars/fable.ron")
        .rule("moral", "[if #hero#==fox then Cleverness is not wisdom. else Patience is rewarded.]")
        .standard_modifiers()
        .build()
        .expect("Failed to build engine");

    // --- Host objects and methods ---
    engine.add_object("reader", "friend");
    engine.add_method("repeat", |text, args| {
        let times = args.first().and_then(|n| n.parse().ok()).unwrap_or(1);
        vec![text; times].join(" ")
    });

    println!("=== Three Fables ===\n");
    for i in 1..=3 {
        println!("{}. {}", i, engine.expand("#origin#"));
        println!();
    }

    // --- Context carried across calls ---
    println!("=== A Fable With a Moral ===\n");
    println!("{}", engine.expand("#origin#"));
    println!("Moral: {}", engine.expand_with_context("#moral#", true));
    println!();

    println!("=== Objects and Methods ===\n");
    println!("{}", engine.expand("Listen, #reader#. #animal.capitalize.repeat(3)#!"));
    println!();

    println!("=== Analysis ===\n");
    let findings = engine.analyze();
    if findings.is_empty() {
        println!("No findings.");
    }
    for finding in findings {
        println!("  {}", finding);
    }
}
