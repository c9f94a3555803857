//! Query intent classification.
//!
//! Pattern-based, no model involved. Description and summary queries relax
//! the strict refusal gate downstream; everything else is factual.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    Factual,
    Summary,
    Description,
}

impl QueryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::Factual => "factual",
            QueryIntent::Summary => "summary",
            QueryIntent::Description => "description",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "factual" => Some(QueryIntent::Factual),
            "summary" => Some(QueryIntent::Summary),
            "description" => Some(QueryIntent::Description),
            _ => None,
        }
    }

    /// Only factual queries get the exact-refusal gate.
    pub fn strict_refusal(&self) -> bool {
        matches!(self, QueryIntent::Factual)
    }
}

static DESCRIPTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\bwhat\s+(?:is|are)\s+(?:this|these|the)\s+(?:document|file|paper|article|text)s?\s+about\b",
        r"\b(?:describe|explain)\s+(?:this|these|the)\s+(?:document|file|paper)s?\b",
        r"\bwhat\s+(?:does|do)\s+(?:this|these|the)\s+(?:document|file|paper)s?\s+(?:cover|discuss|contain)\b",
        r"\b(?:overview|outline)\s+of\s+(?:this|these|the)\s+(?:document|file)s?\b",
        r"\btell\s+me\s+about\s+(?:this|these|the)\s+(?:document|file)s?\b",
    ])
});

static SUMMARY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\b(?:summarize|summary)\b",
        r"\bgive\s+(?:me\s+)?an?\s+(?:brief\s+)?(?:summary|overview)\b",
        r"\bwhat\s+(?:are|is)\s+the\s+(?:main|key)\s+(?:points|ideas|concepts|topics)\b",
        r"\b(?:overview|outline)\s+of\b",
        r"\blist\s+(?:all|the)\s+(?:topics|sections|chapters|key\s+points)\b",
        r"\bhigh-?level\s+(?:summary|overview)\b",
        r"\bin\s+brief\b",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("bad intent pattern {}: {}", p, e)))
        .collect()
}

/// Classify a query. Description patterns are checked before summary ones
/// since they are more specific; factual is the default.
pub fn detect_intent(query: &str) -> QueryIntent {
    let q = query.to_lowercase();
    let q = q.trim();

    if DESCRIPTION_PATTERNS.iter().any(|p| p.is_match(q)) {
        return QueryIntent::Description;
    }
    if SUMMARY_PATTERNS.iter().any(|p| p.is_match(q)) {
        return QueryIntent::Summary;
    }
    QueryIntent::Factual
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_queries() {
        assert_eq!(
            detect_intent("What is this document about?"),
            QueryIntent::Description
        );
        assert_eq!(
            detect_intent("describe the paper"),
            QueryIntent::Description
        );
        assert_eq!(
            detect_intent("Tell me about these files"),
            QueryIntent::Description
        );
    }

    #[test]
    fn test_summary_queries() {
        assert_eq!(detect_intent("Summarize chapter 2"), QueryIntent::Summary);
        assert_eq!(
            detect_intent("what are the main points?"),
            QueryIntent::Summary
        );
        assert_eq!(detect_intent("in brief, what happened"), QueryIntent::Summary);
    }

    #[test]
    fn test_factual_default() {
        assert_eq!(
            detect_intent("What is a microprocessor?"),
            QueryIntent::Factual
        );
        assert_eq!(detect_intent("When was the treaty signed"), QueryIntent::Factual);
        assert_eq!(detect_intent(""), QueryIntent::Factual);
    }

    #[test]
    fn test_description_beats_summary() {
        // "overview of the documents" matches both families; the more
        // specific description pattern wins.
        assert_eq!(
            detect_intent("overview of the documents"),
            QueryIntent::Description
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        for intent in [QueryIntent::Factual, QueryIntent::Summary, QueryIntent::Description] {
            assert_eq!(QueryIntent::parse(intent.as_str()), Some(intent));
        }
        assert_eq!(QueryIntent::parse("interpretive-dance"), None);
    }

    #[test]
    fn test_strict_refusal_only_factual() {
        assert!(QueryIntent::Factual.strict_refusal());
        assert!(!QueryIntent::Summary.strict_refusal());
        assert!(!QueryIntent::Description.strict_refusal());
    }
}
