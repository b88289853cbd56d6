/// Standard English text modifiers, applied with `#rule.name#`.

pub type TextModifier = fn(&str) -> String;

/// The standard set, by the names they are registered under.
pub fn standard() -> Vec<(&'static str, TextModifier)> {
    vec![
        ("capitalize", capitalize as TextModifier),
        ("capitalizeAll", capitalize_all as TextModifier),
        ("caps", caps as TextModifier),
        ("lower", lower as TextModifier),
        ("s", plural as TextModifier),
        ("a", article as TextModifier),
        ("ed", past_tense as TextModifier),
        ("inQuotes", in_quotes as TextModifier),
        ("comma", comma as TextModifier),
    ]
}

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn capitalize_all(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    out
}

pub fn caps(s: &str) -> String {
    s.to_uppercase()
}

pub fn lower(s: &str) -> String {
    s.to_lowercase()
}

pub fn plural(s: &str) -> String {
    let mut chars = s.chars().rev();
    match (chars.next(), chars.next()) {
        (Some('s' | 'h' | 'x'), _) => format!("{}es", s),
        (Some('y'), Some(before)) if !is_vowel(before) => format!("{}ies", &s[..s.len() - 1]),
        _ => format!("{}s", s),
    }
}

pub fn article(s: &str) -> String {
    match s.chars().next() {
        Some(c) if is_vowel(c) => format!("an {}", s),
        _ => format!("a {}", s),
    }
}

pub fn past_tense(s: &str) -> String {
    let mut chars = s.chars().rev();
    match (chars.next(), chars.next()) {
        (Some('e'), _) => format!("{}d", s),
        (Some('y'), Some(before)) if !is_vowel(before) => format!("{}ied", &s[..s.len() - 1]),
        _ => format!("{}ed", s),
    }
}

pub fn in_quotes(s: &str) -> String {
    format!("\"{}\"", s)
}

pub fn comma(s: &str) -> String {
    match s.chars().last() {
        Some(',' | '.' | '?' | '!') => s.to_string(),
        _ => format!("{},", s),
    }
}
