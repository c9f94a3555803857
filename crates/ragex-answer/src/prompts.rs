//! Intent-specific prompt construction.

use ragex_retrieve::QueryIntent;
use ragex_store::ScoredChunk;

/// System prompt for the active intent. The factual prompt embeds the
/// exact configured refusal string so the model can emit it verbatim.
pub fn system_prompt(intent: QueryIntent, refusal_response: &str) -> String {
    match intent {
        QueryIntent::Factual => format!(
            "You are RAGex, a precise document assistant.\n\
             1. Answer the user query STRICTLY using the provided Context.\n\
             2. Do NOT use outside knowledge. Do NOT guess.\n\
             3. If the answer is not contained in the Context, output EXACTLY: '{}'\n\
             4. Be concise and direct.",
            refusal_response
        ),
        QueryIntent::Summary => "You are RAGex, a document summarization assistant.\n\
             1. Summarize the key points from the provided Context.\n\
             2. Focus on main ideas, themes, and important details.\n\
             3. Structure your summary clearly with bullet points or paragraphs.\n\
             4. Use ONLY information from the Context provided.\n\
             5. Be comprehensive but concise."
            .to_string(),
        QueryIntent::Description => "You are RAGex, a document analysis assistant.\n\
             1. Describe what the document(s) are about based on the Context.\n\
             2. Identify the main topics, purpose, and scope.\n\
             3. Mention the type of content (technical, educational, etc.).\n\
             4. Use ONLY information from the Context provided.\n\
             5. Be clear and informative."
            .to_string(),
    }
}

/// User message: numbered evidence blocks followed by the question.
pub fn user_message(question: &str, evidence: &[ScoredChunk]) -> String {
    let mut context = String::new();
    for (i, item) in evidence.iter().enumerate() {
        context.push_str(&format!("--- CHUNK {} ---\n{}\n\n", i + 1, item.chunk.text.trim()));
    }
    format!("Context:\n{}\n\nQuestion: {}", context, question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragex_store::{FileKind, Provenance, StoredChunk};

    fn evidence(texts: &[&str]) -> Vec<ScoredChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| ScoredChunk {
                chunk: StoredChunk {
                    chunk_id: i.to_string(),
                    text: t.to_string(),
                    filename: "doc.txt".into(),
                    file_type: FileKind::Text,
                    provenance: Provenance::Lines { start: 1, end: 50 },
                },
                score: 0.8,
            })
            .collect()
    }

    #[test]
    fn test_factual_prompt_embeds_refusal() {
        let prompt = system_prompt(QueryIntent::Factual, "Answer: Not found in indexed documents.");
        assert!(prompt.contains("'Answer: Not found in indexed documents.'"));
        assert!(prompt.contains("STRICTLY"));
    }

    #[test]
    fn test_user_message_numbers_chunks() {
        let msg = user_message("what is x?", &evidence(&["first chunk", "second chunk"]));
        assert!(msg.contains("--- CHUNK 1 ---\nfirst chunk"));
        assert!(msg.contains("--- CHUNK 2 ---\nsecond chunk"));
        assert!(msg.ends_with("Question: what is x?"));
    }
}
