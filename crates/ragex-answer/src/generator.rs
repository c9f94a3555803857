//! Answer generation over retrieved evidence.
//!
//! Refusal is a local decision: empty evidence for a factual query returns
//! the exact configured refusal string without touching the orchestrator.
//! When the model itself declines, its paraphrase is normalized back to
//! the same exact string. Citations come from the evidence actually used,
//! never from free-form model output.

use serde::Serialize;
use tracing::info;

use ragex_core::{RagexConfig, Result};
use ragex_llm::{LlmConfig, Orchestrator};
use ragex_retrieve::QueryIntent;
use ragex_store::ScoredChunk;

use crate::prompts;

/// Phrasings the model uses when it declines. Matched case-insensitively
/// against the response to normalize refusals to the configured string.
const REFUSAL_PHRASINGS: &[&str] = &[
    "not found in indexed documents",
    "not found in the indexed documents",
    "cannot be found in the provided context",
    "no information about this in the provided context",
];

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Whether a raw model response is semantically a refusal.
pub fn is_refusal(response: &str, refusal_response: &str) -> bool {
    let lower = response.to_lowercase();
    if lower.contains(&refusal_response.to_lowercase()) {
        return true;
    }
    REFUSAL_PHRASINGS.iter().any(|p| lower.contains(p))
}

/// Deduplicated, sorted citation lines for the evidence set.
pub fn collect_sources(evidence: &[ScoredChunk]) -> Vec<String> {
    let mut sources: Vec<String> = evidence.iter().map(|e| e.chunk.citation()).collect();
    sources.sort();
    sources.dedup();
    sources
}

/// Generate an answer for `question` grounded in `evidence`.
pub async fn generate_answer(
    orchestrator: &Orchestrator,
    config: &RagexConfig,
    question: &str,
    evidence: &[ScoredChunk],
    intent: QueryIntent,
) -> Result<Answer> {
    if evidence.is_empty() {
        if intent.strict_refusal() {
            info!("Refusal triggered: no evidence above threshold");
            return Ok(Answer {
                answer: config.refusal_response.clone(),
                sources: Vec::new(),
            });
        }
        return Ok(Answer {
            answer: "No documents have been indexed yet. Please upload or index documents first."
                .to_string(),
            sources: Vec::new(),
        });
    }

    let system = prompts::system_prompt(intent, &config.refusal_response);
    let user = prompts::user_message(question, evidence);
    let llm_config = LlmConfig::from_config(config);

    let raw = orchestrator.generate(&system, &user, &llm_config).await?;

    // Refusal normalization applies only to factual queries; a summary
    // legitimately containing a refusal-like phrase is left alone.
    if intent.strict_refusal() && is_refusal(&raw, &config.refusal_response) {
        info!("Model declined; normalizing to the canonical refusal");
        return Ok(Answer {
            answer: config.refusal_response.clone(),
            sources: Vec::new(),
        });
    }

    Ok(Answer {
        answer: raw,
        sources: collect_sources(evidence),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use parking_lot::Mutex;
    use ragex_core::ConfigOverrides;
    use ragex_llm::{AttemptError, InferenceBackend};
    use ragex_store::{FileKind, Provenance, StoredChunk};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct ScriptedBackend {
        response: Mutex<String>,
        calls: AtomicU32,
    }

    impl ScriptedBackend {
        fn new(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(response.to_string()),
                calls: AtomicU32::new(0),
            })
        }
    }

    impl InferenceBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn is_local(&self) -> bool {
            true
        }

        fn endpoint(&self) -> &str {
            "http://localhost:11434"
        }

        fn check_requirements(&self) -> std::result::Result<(), AttemptError> {
            Ok(())
        }

        fn complete<'a>(
            &'a self,
            _system_prompt: &'a str,
            _user_message: &'a str,
            _config: &'a LlmConfig,
        ) -> BoxFuture<'a, std::result::Result<String, AttemptError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.response.lock().clone())
            }
            .boxed()
        }
    }

    fn test_config() -> (RagexConfig, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().unwrap();
        let config = RagexConfig::load(dir.path(), &ConfigOverrides::default()).unwrap();
        (config, dir)
    }

    fn evidence() -> Vec<ScoredChunk> {
        vec![
            ScoredChunk {
                chunk: StoredChunk {
                    chunk_id: "a".into(),
                    text: "A microprocessor is a CPU on a single chip.".into(),
                    filename: "cpu.pdf".into(),
                    file_type: FileKind::Pdf,
                    provenance: Provenance::Page(3),
                },
                score: 0.85,
            },
            ScoredChunk {
                chunk: StoredChunk {
                    chunk_id: "b".into(),
                    text: "The ALU performs arithmetic.".into(),
                    filename: "notes.txt".into(),
                    file_type: FileKind::Text,
                    provenance: Provenance::Lines { start: 51, end: 100 },
                },
                score: 0.78,
            },
        ]
    }

    #[tokio::test]
    async fn test_empty_evidence_refuses_without_llm_call() {
        let (config, _dir) = test_config();
        let backend = ScriptedBackend::new("should never be called");
        let orchestrator = Orchestrator::with_backend(backend.clone(), false);

        let answer = generate_answer(&orchestrator, &config, "q", &[], QueryIntent::Factual)
            .await
            .unwrap();
        assert_eq!(answer.answer, config.refusal_response);
        assert!(answer.sources.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_evidence_summary_gets_guidance() {
        let (config, _dir) = test_config();
        let backend = ScriptedBackend::new("should never be called");
        let orchestrator = Orchestrator::with_backend(backend.clone(), false);

        let answer = generate_answer(&orchestrator, &config, "q", &[], QueryIntent::Summary)
            .await
            .unwrap();
        assert!(answer.answer.contains("No documents have been indexed"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_grounded_answer_carries_citations() {
        let (config, _dir) = test_config();
        let backend = ScriptedBackend::new("A microprocessor is a CPU on one chip.");
        let orchestrator = Orchestrator::with_backend(backend.clone(), false);

        let answer = generate_answer(
            &orchestrator,
            &config,
            "What is a microprocessor?",
            &evidence(),
            QueryIntent::Factual,
        )
        .await
        .unwrap();

        assert_eq!(answer.answer, "A microprocessor is a CPU on one chip.");
        assert_eq!(
            answer.sources,
            vec!["cpu.pdf (page 3)".to_string(), "notes.txt (lines 51-100)".to_string()]
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_model_refusal_normalized_exactly() {
        let (config, _dir) = test_config();
        let backend =
            ScriptedBackend::new("I'm sorry, but that is not found in indexed documents, alas.");
        let orchestrator = Orchestrator::with_backend(backend, false);

        let answer = generate_answer(
            &orchestrator,
            &config,
            "q",
            &evidence(),
            QueryIntent::Factual,
        )
        .await
        .unwrap();
        assert_eq!(answer.answer, config.refusal_response);
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_summary_skips_refusal_normalization() {
        let (config, _dir) = test_config();
        let backend = ScriptedBackend::new(
            "The documents note some topics are not found in indexed documents.",
        );
        let orchestrator = Orchestrator::with_backend(backend, false);

        let answer = generate_answer(
            &orchestrator,
            &config,
            "summarize",
            &evidence(),
            QueryIntent::Summary,
        )
        .await
        .unwrap();
        assert_ne!(answer.answer, config.refusal_response);
        assert!(!answer.sources.is_empty());
    }

    #[test]
    fn test_sources_deduplicated_and_sorted() {
        let mut ev = evidence();
        ev.push(ev[0].clone());
        let sources = collect_sources(&ev);
        assert_eq!(sources.len(), 2);
        assert!(sources[0] < sources[1]);
    }

    #[test]
    fn test_is_refusal_variants() {
        let canonical = "Answer: Not found in indexed documents.";
        assert!(is_refusal(canonical, canonical));
        assert!(is_refusal("answer: not found in indexed documents", canonical));
        assert!(is_refusal(
            "The requested detail cannot be found in the provided context.",
            canonical
        ));
        assert!(!is_refusal("A CPU has registers.", canonical));
    }
}
