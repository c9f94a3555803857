//! Dynamic-K retrieval.
//!
//! Instead of a fixed top-K, the result set size adapts to the score
//! profile: fetch a wide candidate pool, cut everything below the minimum
//! similarity, then truncate at the first steep gap between adjacent
//! scores. Highly relevant queries keep a dense context; marginal ones end
//! up sparse or empty, and empty is what triggers refusal downstream.

use tracing::{debug, info};

use ragex_core::{messages, Error, RagexConfig, Result};
use ragex_infer::EmbedderBackend;
use ragex_store::{ChunkStore, ScoredChunk};

/// Drop candidates scoring below `min_score`. Scores equal to the
/// threshold are retained.
pub fn apply_threshold(candidates: Vec<ScoredChunk>, min_score: f64) -> Vec<ScoredChunk> {
    candidates
        .into_iter()
        .filter(|c| c.score >= min_score)
        .collect()
}

/// Truncate a score-descending sequence at the first adjacent pair whose
/// difference exceeds `drop_off`. The first element always survives; a
/// single-element input is returned unchanged.
pub fn drop_off_truncate(candidates: Vec<ScoredChunk>, drop_off: f64) -> Vec<ScoredChunk> {
    let mut kept = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Some(prev) = kept.last() {
            let prev: &ScoredChunk = prev;
            let gap = prev.score - candidate.score;
            if gap > drop_off {
                debug!("Drop-off of {:.3} at rank {}, cutting context", gap, kept.len());
                break;
            }
        }
        kept.push(candidate);
    }
    kept
}

/// Retrieve evidence for a query. Read-only; never creates or repairs the
/// collection. A blank query and a below-threshold score profile both
/// yield an empty result rather than an error.
pub fn retrieve(
    store: &ChunkStore,
    embedder: &dyn EmbedderBackend,
    config: &RagexConfig,
    query: &str,
) -> Result<Vec<ScoredChunk>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    store.probe()?;

    let query_embedding = embedder
        .embed(query)
        .ok_or_else(|| Error::Inference(messages::EMBEDDER_UNAVAILABLE.to_string()))?
        .embedding;

    let candidates = store.vector_search(&query_embedding, config.candidate_k)?;
    let pool_size = candidates.len();
    let top_score = candidates.first().map(|c| c.score);

    let surviving = apply_threshold(candidates, config.min_score_threshold);
    if surviving.is_empty() {
        info!(
            "No candidates above threshold {:.2} (pool={}, top={:.3})",
            config.min_score_threshold,
            pool_size,
            top_score.unwrap_or(0.0)
        );
        return Ok(Vec::new());
    }

    let evidence = drop_off_truncate(surviving, config.drop_off_threshold);
    info!(
        "Retrieved {} of {} candidates for query",
        evidence.len(),
        pool_size
    );
    Ok(evidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragex_store::{FileKind, Provenance, StoredChunk};

    fn scored(id: &str, score: f64) -> ScoredChunk {
        ScoredChunk {
            chunk: StoredChunk {
                chunk_id: id.to_string(),
                text: format!("chunk {}", id),
                filename: "doc.txt".to_string(),
                file_type: FileKind::Text,
                provenance: Provenance::Lines { start: 1, end: 50 },
            },
            score,
        }
    }

    fn scores(chunks: &[ScoredChunk]) -> Vec<f64> {
        chunks.iter().map(|c| c.score).collect()
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let candidates = vec![scored("a", 0.85), scored("b", 0.40), scored("c", 0.39)];
        let kept = apply_threshold(candidates, 0.40);
        assert_eq!(scores(&kept), vec![0.85, 0.40]);
    }

    #[test]
    fn test_threshold_monotonic() {
        let candidates: Vec<ScoredChunk> = (0..10)
            .map(|i| scored(&i.to_string(), 0.9 - 0.07 * i as f64))
            .collect();
        let mut prev_len = candidates.len();
        for threshold in [0.2, 0.4, 0.6, 0.8] {
            let kept = apply_threshold(candidates.clone(), threshold);
            assert!(kept.len() <= prev_len);
            prev_len = kept.len();
        }
    }

    #[test]
    fn test_drop_off_cuts_at_first_steep_gap() {
        // 0.68 -> 0.50 is the first gap exceeding 0.10.
        let candidates = vec![
            scored("a", 0.81),
            scored("b", 0.79),
            scored("c", 0.76),
            scored("d", 0.71),
            scored("e", 0.68),
            scored("f", 0.50),
            scored("g", 0.49),
            scored("h", 0.47),
        ];
        let kept = drop_off_truncate(candidates, 0.10);
        assert_eq!(scores(&kept), vec![0.81, 0.79, 0.76, 0.71, 0.68]);
    }

    #[test]
    fn test_drop_off_exact_gap_retained() {
        // Truncation needs a gap strictly greater than the threshold, so a
        // gap exactly equal to it keeps everything. The threshold is derived
        // from the same subtraction the pass performs, sidestepping the fact
        // that 0.80 - 0.70 is not representably 0.10.
        let exact_gap = 0.80_f64 - 0.70_f64;
        let candidates = vec![scored("a", 0.80), scored("b", 0.70), scored("c", 0.65)];
        let kept = drop_off_truncate(candidates, exact_gap);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_drop_off_single_candidate() {
        let kept = drop_off_truncate(vec![scored("a", 0.55)], 0.10);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_drop_off_never_grows() {
        let candidates = vec![scored("a", 0.9), scored("b", 0.5), scored("c", 0.45)];
        let kept = drop_off_truncate(candidates.clone(), 0.10);
        assert!(kept.len() <= candidates.len());
        // Last retained minus first excluded exceeds the gap.
        assert_eq!(kept.len(), 1);
        assert!(candidates[0].score - candidates[1].score > 0.10);
    }

    #[test]
    fn test_microprocessor_scenario() {
        // Pool of 0.85 / 0.78 / 0.22: the 0.22 chunk fails the threshold,
        // so drop-off never compares against it.
        let candidates = vec![scored("cpu", 0.85), scored("alu", 0.78), scored("pasta", 0.22)];
        let surviving = apply_threshold(candidates, 0.40);
        let kept = drop_off_truncate(surviving, 0.10);
        assert_eq!(scores(&kept), vec![0.85, 0.78]);
    }
}
