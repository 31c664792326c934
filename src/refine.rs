//! Subsection refinement.
//!
//! The top-ranked section bodies are cut into sentences, each sentence is
//! scored against the query vector, and the best `top_m` sentences across
//! all of them are kept. Ordering is score desc, then section rank, then
//! sentence position, so the same input always yields the same snippets.

use crate::config::RefineConfig;
use crate::embedding::{embed_units, EmbeddingProvider};
use crate::models::{RefinedSnippet, ScoredSection};
use crate::rank::by_score_desc;
use crate::scoring::cosine_similarity;

struct Sentence<'a> {
    section: &'a ScoredSection,
    index: usize,
    text: String,
}

/// Split a section body into sentences.
///
/// Lines are re-joined first so PDF line wraps do not cut a sentence; a word
/// hyphenated across a wrap (`lan-` / `guage`) is glued back together. A
/// sentence ends at `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let joined = join_lines(text);
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = joined.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_i, ' ')) = chars.peek() {
            let sentence = joined[start..i + c.len_utf8()].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = next_i + 1;
        }
    }

    let tail = joined[start.min(joined.len())..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

fn join_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let continues_word = out.ends_with('-')
            && line.chars().next().is_some_and(char::is_lowercase);
        if continues_word {
            out.pop();
        } else if !out.is_empty() {
            out.push(' ');
        }
        for (i, word) in line.split_whitespace().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

/// Sentences of a section body, without the heading line the splitter
/// may have folded into it. Titles can be truncated, so the heading only
/// has to start with the title.
fn body_sentences(section: &ScoredSection) -> Vec<String> {
    let title = section.section.title.as_str();
    let body = &section.section.body;
    let body = match body.split_once('\n') {
        Some((first, rest)) if !title.is_empty() && first.trim().starts_with(title) => rest,
        _ => body.as_str(),
    };
    split_sentences(body)
}

/// Re-score the sentences of `ranked` and keep the global best `top_m`.
///
/// A sentence whose embedding fails is logged and skipped. With
/// `refine.min_score` set, snippets scoring at or below it are dropped.
pub fn refine_sections(
    provider: &dyn EmbeddingProvider,
    query_vector: &[f32],
    ranked: &[ScoredSection],
    config: &RefineConfig,
    top_m: usize,
    batch_size: usize,
) -> Vec<RefinedSnippet> {
    let sentences: Vec<Sentence> = ranked
        .iter()
        .flat_map(|section| {
            body_sentences(section)
                .into_iter()
                .filter(|s| s.chars().count() >= config.min_chars)
                .enumerate()
                .map(move |(index, text)| Sentence {
                    section,
                    index,
                    text,
                })
        })
        .collect();

    if sentences.is_empty() {
        tracing::debug!("no sentences long enough to refine");
        return Vec::new();
    }

    let texts: Vec<String> = sentences.iter().map(|s| s.text.clone()).collect();
    let vectors = embed_units(provider, &texts, batch_size);

    let mut scored: Vec<(Sentence, f32)> = Vec::with_capacity(sentences.len());
    for (sentence, vector) in sentences.into_iter().zip(vectors) {
        match vector {
            Ok(v) => {
                let score = cosine_similarity(&v, query_vector);
                scored.push((sentence, score));
            }
            Err(e) => tracing::warn!(
                document = %sentence.section.section.document,
                page = sentence.section.section.page_number,
                error = %e,
                "skipping sentence that failed to embed"
            ),
        }
    }

    if let Some(min) = config.min_score {
        scored.retain(|(_, score)| *score > min);
    }

    scored.sort_by(|(a, sa), (b, sb)| {
        by_score_desc(*sa, *sb)
            .then(a.section.rank.cmp(&b.section.rank))
            .then(a.index.cmp(&b.index))
    });
    scored.truncate(top_m);

    scored
        .into_iter()
        .map(|(sentence, score)| RefinedSnippet {
            document: sentence.section.section.document.clone(),
            page_number: sentence.section.section.page_number,
            text: sentence.text,
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{embed_query, HashProvider};
    use crate::models::{CandidateSection, SectionOrder};

    fn ranked(rank: u32, document: &str, page: u32, title: &str, body: &str) -> ScoredSection {
        ScoredSection {
            section: CandidateSection {
                document: document.to_string(),
                page_number: page,
                title: title.to_string(),
                body: body.to_string(),
                order: SectionOrder {
                    document_index: 0,
                    page_number: page,
                    in_page_index: rank as usize,
                },
            },
            score: 0.0,
            rank,
        }
    }

    fn config(min_chars: usize, min_score: Option<f32>) -> RefineConfig {
        RefineConfig {
            min_chars,
            min_score,
        }
    }

    #[test]
    fn sentences_survive_line_wraps() {
        let text = "Large language models are trained\non web-scale corpora. They gen-\neralize well! Do they reason?";
        assert_eq!(
            split_sentences(text),
            vec![
                "Large language models are trained on web-scale corpora.",
                "They generalize well!",
                "Do they reason?",
            ]
        );
    }

    #[test]
    fn decimals_do_not_end_sentences() {
        assert_eq!(
            split_sentences("Accuracy rose to 93.5 percent. Loss fell."),
            vec!["Accuracy rose to 93.5 percent.", "Loss fell."]
        );
    }

    #[test]
    fn text_without_terminal_punctuation_is_one_sentence() {
        assert_eq!(
            split_sentences("Recent advances in large language models..."),
            vec!["Recent advances in large language models..."]
        );
        assert!(split_sentences("  \n ").is_empty());
    }

    #[test]
    fn heading_line_is_not_a_sentence() {
        let section = ranked(
            1,
            "a.pdf",
            1,
            "Introduction",
            "Introduction\nLanguage models predict the next token.",
        );
        assert_eq!(
            body_sentences(&section),
            vec!["Language models predict the next token."]
        );
    }

    #[test]
    fn truncated_heading_is_not_a_sentence() {
        let section = ranked(
            1,
            "a.pdf",
            1,
            "Extremely Long",
            "Extremely Long Heading About Retrieval Augmented Generation\nRetrieval grounds answers in documents.",
        );
        assert_eq!(
            body_sentences(&section),
            vec!["Retrieval grounds answers in documents."]
        );
    }

    #[test]
    fn placeholder_title_keeps_first_line() {
        let section = ranked(
            1,
            "a.pdf",
            3,
            "Page 3, section 1",
            "we measured throughput.\nit was stable.",
        );
        assert_eq!(
            body_sentences(&section),
            vec!["we measured throughput.", "it was stable."]
        );
    }

    #[test]
    fn best_sentences_are_selected_globally() {
        let p = HashProvider::new(256);
        let query = embed_query(&p, "large language models").unwrap();
        let sections = vec![
            ranked(
                1,
                "a.pdf",
                1,
                "Cooking",
                "Boil the pasta for nine minutes. Large language models write recipes too.",
            ),
            ranked(
                2,
                "b.pdf",
                4,
                "Models",
                "Large language models are large. Gardening needs patience and water.",
            ),
        ];
        let snippets = refine_sections(&p, &query, &sections, &config(10, None), 2, 8);
        assert_eq!(snippets.len(), 2);
        for s in &snippets {
            assert!(s.text.contains("language models"), "unexpected: {}", s.text);
        }
        assert!(snippets[0].score >= snippets[1].score);
        let b = snippets.iter().find(|s| s.document == "b.pdf").unwrap();
        assert_eq!(b.page_number, 4);
    }

    #[test]
    fn equal_scores_follow_section_rank() {
        let p = HashProvider::new(64);
        let query = embed_query(&p, "transformer attention").unwrap();
        let body = "Transformer attention scales quadratically.";
        let sections = vec![
            ranked(1, "first.pdf", 2, "A", body),
            ranked(2, "second.pdf", 1, "B", body),
        ];
        let snippets = refine_sections(&p, &query, &sections, &config(5, None), 10, 4);
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].document, "first.pdf");
        assert_eq!(snippets[1].document, "second.pdf");
    }

    #[test]
    fn min_score_and_min_chars_filter_sentences() {
        let p = HashProvider::new(4096);
        let query = embed_query(&p, "neural networks").unwrap();
        let sections = vec![ranked(
            1,
            "a.pdf",
            1,
            "Mixed",
            "Neural networks learn features. Ok. Bread rises in a warm oven overnight.",
        )];

        let all = refine_sections(&p, &query, &sections, &config(0, None), 10, 4);
        assert_eq!(all.len(), 3);

        let long_only = refine_sections(&p, &query, &sections, &config(10, None), 10, 4);
        assert_eq!(long_only.len(), 2);

        let relevant = refine_sections(&p, &query, &sections, &config(0, Some(0.3)), 10, 4);
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].text, "Neural networks learn features.");
    }

    #[test]
    fn nothing_to_refine_yields_no_snippets() {
        let p = HashProvider::new(16);
        let query = embed_query(&p, "anything").unwrap();
        assert!(refine_sections(&p, &query, &[], &RefineConfig::default(), 10, 4).is_empty());
    }
}
