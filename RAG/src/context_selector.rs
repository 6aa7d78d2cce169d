use crate::keyword_scorer::score_chunk;
use crate::models::ScoredChunk;

pub const TOP_K: usize = 3;
pub const PREVIEW_CHARS: usize = 100;

/// Scores every chunk against the question and keeps the `top_k` best.
///
/// The sort is stable, so chunks with equal scores stay in document order.
pub fn select_top_chunks(question: &str, chunks: &[String], top_k: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = chunks
        .iter()
        .map(|chunk| ScoredChunk {
            content: chunk.clone(),
            score: score_chunk(question, chunk),
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(top_k);

    log::debug!(
        "Selected {} of {} chunks (scores {:?})",
        scored.len(),
        chunks.len(),
        scored.iter().map(|c| c.score).collect::<Vec<_>>()
    );
    scored
}

pub fn build_context(selected: &[ScoredChunk]) -> String {
    selected
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!("Answer the question based on the following:\n\n{context}\n\nQuestion: {question}")
}

/// Short excerpts of the selected chunks, shown to streaming clients.
pub fn context_previews(selected: &[ScoredChunk], max_chars: usize) -> Vec<String> {
    selected
        .iter()
        .map(|chunk| {
            let excerpt: String = chunk.content.chars().take(max_chars).collect();
            format!("{excerpt}...")
        })
        .collect()
}
