//! RAGex Answer — turns retrieved evidence into a grounded answer with
//! deterministic citations, enforcing the exact refusal contract.

pub mod generator;
pub mod prompts;

pub use generator::{collect_sources, generate_answer, is_refusal, Answer};
