use serde::{Deserialize, Serialize};

/// Canonical statute term and the colloquial words users type instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymEntry {
    pub canonical: String,
    pub synonyms: Vec<String>,
}

/// Fixed mapping from statute terminology to everyday vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymDictionary {
    entries: Vec<SynonymEntry>,
}

impl SynonymDictionary {
    pub fn new(entries: Vec<SynonymEntry>) -> Self {
        Self { entries }
    }

    /// One bullet line per canonical term: `- syn1, syn2 → canonical`.
    pub fn to_prompt_text(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("- {} → {}", entry.synonyms.join(", "), entry.canonical))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Colloquial terms present in `text`, in dictionary order.
    ///
    /// Inflected forms count: "보증금을 언제 돌려받아요" matches
    /// "보증금 돌려받기".
    pub fn matched_synonyms<'a>(&'a self, text: &str) -> Vec<&'a str> {
        self.entries
            .iter()
            .flat_map(|entry| entry.synonyms.iter())
            .filter(|synonym| occurs_in(synonym, text))
            .map(|synonym| synonym.as_str())
            .collect()
    }

    pub fn contains_synonym(&self, text: &str) -> bool {
        self.entries
            .iter()
            .flat_map(|entry| entry.synonyms.iter())
            .any(|synonym| occurs_in(synonym, text))
    }
}

/// Every word of `synonym` appears in `text` by its stem.
fn occurs_in(synonym: &str, text: &str) -> bool {
    if text.contains(synonym) {
        return true;
    }
    let mut words = synonym.split_whitespace().map(stem).peekable();
    words.peek().is_some() && words.all(|word| text.contains(word))
}

/// Drops the nominalizing `기` ending so verb phrases match conjugated use.
fn stem(word: &str) -> &str {
    match word.strip_suffix('기') {
        Some(stem) if !stem.is_empty() => stem,
        _ => word,
    }
}

impl Default for SynonymDictionary {
    fn default() -> Self {
        let entry = |canonical: &str, synonyms: &[&str]| SynonymEntry {
            canonical: canonical.to_string(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        };

        Self::new(vec![
            entry("주택", &["집", "아파트", "전세", "전세집", "빌라", "오피스텔", "원룸"]),
            entry("임대인", &["집주인", "건물주"]),
            entry("임차인", &["세입자", "전세입자", "월세입자"]),
            entry("보증금 반환", &["보증금 돌려받기", "전세금 반환"]),
        ])
    }
}
