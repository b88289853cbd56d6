/// Rule files.
///
/// Two formats are read. RON maps rule names to a string or a list:
///
/// ```ron
/// {
///     "origin": "#hero# met #villain#",
///     "hero": ["a knight", "a fox"],
/// }
/// ```
///
/// The plain-text format is a `[name]` header line followed by one candidate
/// per line, ended by a blank line:
///
/// ```text
/// [hero]
/// a knight
/// a fox
///
/// [origin]
/// #hero# set out
/// ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::grammar::GrammarError;
use crate::core::logging::Logger;

/// Rule names with their candidate texts, in file order.
pub type RuleEntries = Vec<(String, Vec<String>)>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RonDefinition {
    One(String),
    Many(Vec<String>),
}

/// Parse the `[name]` text format. A header with no candidate lines defines
/// a rule that expands to empty text. Repeated headers replace earlier ones.
pub fn parse_text(input: &str, log: &Logger) -> RuleEntries {
    let mut entries: RuleEntries = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for line in input.lines() {
        let line = line.trim_end_matches('\r');
        if let Some((_, candidates)) = current.as_mut() {
            if line.is_empty() {
                finish_block(current.take(), &mut entries, log);
            } else {
                candidates.push(line.to_string());
            }
        } else if line.len() > 2 && line.starts_with('[') && line.ends_with(']') {
            current = Some((line[1..line.len() - 1].to_string(), Vec::new()));
        }
    }
    finish_block(current, &mut entries, log);
    entries
}

fn finish_block(block: Option<(String, Vec<String>)>, entries: &mut RuleEntries, log: &Logger) {
    let Some((name, mut candidates)) = block else {
        return;
    };
    if candidates.is_empty() {
        candidates.push(String::new());
    }
    if let Some(existing) = entries.iter_mut().find(|(n, _)| *n == name) {
        log.warn(format_args!("rule '{}' defined twice, will be overwritten", name));
        existing.1 = candidates;
    } else {
        entries.push((name, candidates));
    }
}

/// Parse a RON map of rule names to a string or list of strings.
pub fn parse_ron(input: &str) -> Result<RuleEntries, GrammarError> {
    let raw: BTreeMap<String, RonDefinition> = ron::from_str(input)?;
    Ok(raw
        .into_iter()
        .map(|(name, definition)| {
            let candidates = match definition {
                RonDefinition::One(text) => vec![text],
                RonDefinition::Many(list) => list,
            };
            (name, candidates)
        })
        .collect())
}

/// Load a rule file, choosing the format by extension (`.ron` or text).
pub fn load_file(path: &Path, log: &Logger) -> Result<RuleEntries, GrammarError> {
    let contents = std::fs::read_to_string(path)?;
    if path.extension().and_then(|s| s.to_str()) == Some("ron") {
        parse_ron(&contents)
    } else {
        Ok(parse_text(&contents, log))
    }
}

/// Every rule file directly inside `dir`, sorted by path.
pub fn rule_files_in(dir: &Path) -> Result<Vec<std::path::PathBuf>, GrammarError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        match path.extension().and_then(|s| s.to_str()) {
            Some("ron") | Some("txt") => files.push(path),
            _ => {}
        }
    }
    files.sort();
    Ok(files)
}
