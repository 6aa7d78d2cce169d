use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn non_word_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").unwrap())
}

/// Lower-cases `text` and strips everything but word characters and whitespace.
pub fn preprocess_text(text: &str) -> String {
    non_word_chars()
        .replace_all(&text.to_lowercase(), "")
        .into_owned()
}

fn count_words(text: &str) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for word in text.split_whitespace() {
        *counts.entry(word).or_insert(0) += 1;
    }
    counts
}

/// Keyword overlap between a question and a chunk: for every distinct
/// question word, how many times it occurs in the chunk.
pub fn score_chunk(question: &str, chunk: &str) -> usize {
    let question = preprocess_text(question);
    let chunk = preprocess_text(chunk);

    let question_words: HashSet<&str> = question.split_whitespace().collect();
    let chunk_counts = count_words(&chunk);

    question_words
        .iter()
        .filter_map(|word| chunk_counts.get(word))
        .sum()
}
