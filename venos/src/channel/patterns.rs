//! Pattern matching utilities for prompt detection and alternatives.

use regex::bytes::Regex;

/// Position of a matched alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AltMatch {
    /// Index of the alternative in the list it was taken from.
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

/// Return the first alternative, in list order, that matches `data`.
///
/// List order decides ties: when two alternatives both occur, the one
/// listed first wins even if the other occurs earlier in the data.
pub fn first_match(alternatives: &[Regex], data: &[u8]) -> Option<AltMatch> {
    alternatives.iter().enumerate().find_map(|(index, pattern)| {
        pattern.find(data).map(|m| AltMatch {
            index,
            start: m.start(),
            end: m.end(),
        })
    })
}

/// Compile a prompt pattern string into a regex anchored at the end of
/// the output.
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let pattern = if pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!("{}\\s*$", pattern)
    };

    Regex::new(&pattern)
}
