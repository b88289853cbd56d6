/// Binary counter example: a four-bit counter kept in tags across calls.
///
/// The grammar never loops on its own. The host calls `#inc#` once per
/// frame with context preserved, so the bit tags survive between calls.
///
/// Run with: cargo run --example binary_counter

use narrative_grammar::Engine;

const INCREMENT: &str = "[if #b0#==0 then [b0:1] else [b0:0]\
[if #b1#==0 then [b1:1] else [b1:0]\
[if #b2#==0 then [b2:1] else [b2:0]\
[if #b3#==0 then [b3:1] else [b3:0]]]]]";

fn main() {
    let mut engine = Engine::builder()
        .seed(0)
        .rule("inc", INCREMENT)
        .rule("bits", "#b3##b2##b1##b0#")
        .build()
        .expect("Failed to build engine");

    engine.expand("[b0:0][b1:0][b2:0][b3:0]");

    for frame in 1..=20 {
        let bits = engine.expand_with_context("#inc##bits#", true);
        println!("frame {:>2}: {}", frame, bits);
    }

    // The same counter driven by a loop inside one expansion
    let looped =
        engine.expand("[b0:0][b1:0][b2:0][b3:0][while #bits# != 1010 do #inc##bits# ]");
    println!("\nwhile loop: {}", looped.trim_end());
}
