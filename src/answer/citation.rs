use std::sync::OnceLock;

use regex::Regex;

const CITATION_OPENER: &str =
    r"^주택임대차보호법\s*제\s*\d+\s*조(의\s*\d+)?\s*\([^)]+\)(\s*제\s*\d+\s*항[^,]*?)?\s*에\s*따르면\s*,";

/// Outcome of inspecting a finished answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationCheck {
    Cited,
    MissingOpener,
}

impl CitationCheck {
    pub fn inspect(answer: &str) -> Self {
        if opener().is_match(answer.trim_start()) {
            CitationCheck::Cited
        } else {
            CitationCheck::MissingOpener
        }
    }

    pub fn is_cited(&self) -> bool {
        matches!(self, CitationCheck::Cited)
    }
}

fn opener() -> &'static Regex {
    static OPENER: OnceLock<Regex> = OnceLock::new();
    OPENER.get_or_init(|| Regex::new(CITATION_OPENER).expect("citation pattern is valid"))
}
