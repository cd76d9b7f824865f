//! Post-render scan for unresolved references.
//!
//! The template engine prints [`NO_VALUE_MARKER`] wherever a referenced
//! value is absent. The scan is purely textual, so a marker that was part of
//! the data itself is reported as well.

use crate::constants::NO_VALUE_MARKER;

/// One rendered line containing the marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// 1-based line number
    pub line: usize,
    pub text: String,
}

impl std::fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{NO_VALUE_MARKER} detected at line {}: {}", self.line, self.text)
    }
}

/// Returns every line of `text` that contains the marker, in order.
pub fn scan(text: &str) -> Vec<UnresolvedReference> {
    let found: Vec<_> = text
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains(NO_VALUE_MARKER))
        .map(|(index, line)| UnresolvedReference {
            line: index + 1,
            text: line.to_string(),
        })
        .collect();

    for reference in &found {
        tracing::debug!("Unresolved reference at line {}", reference.line);
    }
    found
}
