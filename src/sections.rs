//! Page text → candidate sections.
//!
//! [`SectionSplitter`] is the pluggable segmentation strategy; the scoring
//! pipeline only sees the [`CandidateSection`]s it produces.
//! [`HeuristicSplitter`] is the default:
//!
//! 1. Split the page into blocks on blank lines.
//! 2. A block that is a single heading-like line becomes the title of the
//!    next block on the same page.
//! 3. Otherwise the block's first line is its title when it looks like a
//!    heading; if not, a placeholder title is generated.
//! 4. Blocks longer than `max_section_chars` are cut at a line or word
//!    boundary; every piece keeps the block's title.
//!
//! Whitespace-only pages produce no sections. Any page with visible text
//! produces at least one.

use crate::config::ExtractionConfig;
use crate::models::{CandidateSection, Document, Page, SectionOrder};

/// A segmentation strategy for one page of text.
pub trait SectionSplitter {
    /// Split `page` into sections. `in_page_index` in each returned
    /// [`SectionOrder`] must be contiguous from 0.
    fn split_page(&self, document: &str, document_index: usize, page: &Page)
        -> Vec<CandidateSection>;
}

/// Run `splitter` over every page of `doc`, in page order.
pub fn extract_sections(
    splitter: &dyn SectionSplitter,
    document_index: usize,
    doc: &Document,
) -> Vec<CandidateSection> {
    let mut sections = Vec::new();
    for page in &doc.pages {
        if page.text.trim().is_empty() {
            tracing::debug!(document = %doc.id, page = page.number, "skipping empty page");
            continue;
        }
        sections.extend(splitter.split_page(&doc.id, document_index, page));
    }
    sections
}

/// Longest line (in words) still considered a heading.
const HEADING_MAX_WORDS: usize = 12;
/// A lone line this short is a heading if it is capitalized.
const SHORT_LINE_MAX_WORDS: usize = 8;
/// Share of capitalized words for a line to count as title case.
const TITLE_CASE_RATIO: f32 = 0.6;

#[derive(Debug, Clone)]
pub struct HeuristicSplitter {
    max_section_chars: usize,
    title_max_chars: usize,
}

impl HeuristicSplitter {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            max_section_chars: config.max_section_chars,
            title_max_chars: config.title_max_chars,
        }
    }
}

impl Default for HeuristicSplitter {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl SectionSplitter for HeuristicSplitter {
    fn split_page(
        &self,
        document: &str,
        document_index: usize,
        page: &Page,
    ) -> Vec<CandidateSection> {
        let blocks = split_blocks(&page.text);
        let mut sections = Vec::new();
        let mut pending_title: Option<String> = None;

        let push = |title: String, body: String, sections: &mut Vec<CandidateSection>| {
            for piece in split_long(&body, self.max_section_chars) {
                let in_page_index = sections.len();
                sections.push(CandidateSection {
                    document: document.to_string(),
                    page_number: page.number,
                    title: title.clone(),
                    body: piece,
                    order: SectionOrder {
                        document_index,
                        page_number: page.number,
                        in_page_index,
                    },
                });
            }
        };

        for (i, block) in blocks.iter().enumerate() {
            let is_last = i + 1 == blocks.len();

            if block.len() == 1 && is_lone_heading(block[0]) && !is_last {
                // Two headings in a row: the first one stands on its own.
                if let Some(prev) = pending_title.take() {
                    push(self.title(&prev), prev, &mut sections);
                }
                pending_title = Some(block[0].to_string());
                continue;
            }

            let (title, body) = match pending_title.take() {
                Some(heading) => {
                    let body = format!("{}\n{}", heading, block.join("\n"));
                    (self.title(&heading), body)
                }
                None if block.len() > 1 && looks_like_heading(block[0]) => {
                    (self.title(block[0]), block.join("\n"))
                }
                None if block.len() == 1 && is_lone_heading(block[0]) => {
                    (self.title(block[0]), block[0].to_string())
                }
                None => (
                    format!("Page {}, section {}", page.number, sections.len() + 1),
                    block.join("\n"),
                ),
            };
            push(title, body, &mut sections);
        }

        if let Some(heading) = pending_title {
            push(self.title(&heading), heading, &mut sections);
        }

        sections
    }
}

impl HeuristicSplitter {
    fn title(&self, line: &str) -> String {
        truncate_chars(line.trim(), self.title_max_chars)
    }
}

/// Blocks of trimmed, non-empty lines separated by blank lines.
fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Cut `text` into pieces of at most `max_chars` bytes, preferring to break
/// after a newline, then after a space.
fn split_long(text: &str, max_chars: usize) -> Vec<String> {
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let mut split_at = remaining.len().min(max_chars);
        while !remaining.is_char_boundary(split_at) {
            split_at -= 1;
        }
        let actual_split = if split_at < remaining.len() {
            remaining[..split_at]
                .rfind('\n')
                .or_else(|| remaining[..split_at].rfind(' '))
                .map(|pos| pos + 1)
                .unwrap_or(split_at)
        } else {
            split_at
        };
        // A single character wider than max_chars still has to move forward.
        let actual_split = if actual_split == 0 {
            remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len())
        } else {
            actual_split
        };
        let piece = remaining[..actual_split].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        remaining = &remaining[actual_split..];
    }
    pieces
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}

fn words(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

fn has_alpha(line: &str) -> bool {
    line.chars().any(char::is_alphabetic)
}

fn ends_like_sentence(line: &str) -> bool {
    line.ends_with(['.', ',', ';', '!', '?'])
}

fn starts_capitalized(line: &str) -> bool {
    line.chars()
        .find(|c| c.is_alphanumeric())
        .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit())
}

fn is_upper(line: &str) -> bool {
    has_alpha(line) && !line.chars().any(char::is_lowercase)
}

fn is_title_case(line: &str) -> bool {
    let alpha_words: Vec<&str> = words(line)
        .into_iter()
        .filter(|w| w.chars().next().is_some_and(char::is_alphabetic))
        .collect();
    if alpha_words.is_empty() || !starts_capitalized(alpha_words[0]) {
        return false;
    }
    let capitalized = alpha_words
        .iter()
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .count();
    capitalized as f32 / alpha_words.len() as f32 >= TITLE_CASE_RATIO
}

/// Section numbering such as `3.`, `2.1`, `IV.`.
fn is_numbered(line: &str) -> bool {
    let Some(first) = line.split_whitespace().next() else {
        return false;
    };
    let stem = first.trim_end_matches(['.', ')']);
    let arabic = stem.chars().all(|c| c.is_ascii_digit() || c == '.');
    let roman = first.len() > stem.len() && stem.chars().all(|c| matches!(c, 'I' | 'V' | 'X'));
    !stem.is_empty() && (arabic || roman) && words(line).len() > 1
}

/// Strict test used for the first line of a multi-line block.
fn looks_like_heading(line: &str) -> bool {
    has_alpha(line)
        && !ends_like_sentence(line)
        && words(line).len() <= HEADING_MAX_WORDS
        && (is_upper(line) || is_title_case(line) || is_numbered(line))
}

/// Looser test for a line that forms a block on its own.
fn is_lone_heading(line: &str) -> bool {
    looks_like_heading(line)
        || (has_alpha(line)
            && !ends_like_sentence(line)
            && words(line).len() <= SHORT_LINE_MAX_WORDS
            && starts_capitalized(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> Page {
        Page {
            number: 1,
            text: text.to_string(),
        }
    }

    fn split(text: &str) -> Vec<CandidateSection> {
        HeuristicSplitter::default().split_page("doc.pdf", 0, &page(text))
    }

    #[test]
    fn heading_block_titles_the_following_paragraph() {
        let sections =
            split("Introduction to Machine Learning\n\nRecent advances in large language models...");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Introduction to Machine Learning");
        assert_eq!(sections[0].page_number, 1);
        assert!(sections[0].body.contains("Recent advances"));
    }

    #[test]
    fn first_line_heading_inside_block() {
        let sections = split("RESULTS\nAccuracy improved on every benchmark we tried.");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "RESULTS");
    }

    #[test]
    fn prose_block_gets_placeholder_title() {
        let sections = split("we measured the effect of batch size on throughput.\nit was small.");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Page 1, section 1");
    }

    #[test]
    fn whitespace_page_yields_nothing() {
        assert!(split("   \n\n \t ").is_empty());
    }

    #[test]
    fn non_empty_page_yields_at_least_one_section() {
        for text in ["x", "Summary", "a sentence that ends.", "1.2 Scope"] {
            assert!(!split(text).is_empty(), "no section for {:?}", text);
        }
    }

    #[test]
    fn trailing_heading_is_kept() {
        let sections = split("Some body text here, written as prose.\n\nAppendix");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].title, "Appendix");
    }

    #[test]
    fn consecutive_headings_do_not_merge() {
        let sections = split("Chapter One\n\nBackground\n\nThe field began in 1956.");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Chapter One");
        assert_eq!(sections[1].title, "Background");
    }

    #[test]
    fn in_page_indices_are_contiguous() {
        let text = "Alpha Part\n\nbody one.\n\nbody two.\n\nBeta Part\n\nbody three.";
        let sections = split(text);
        for (i, s) in sections.iter().enumerate() {
            assert_eq!(s.order.in_page_index, i);
        }
    }

    #[test]
    fn long_blocks_are_split_and_keep_title() {
        let cfg = ExtractionConfig {
            max_section_chars: 64,
            title_max_chars: 80,
        };
        let body = "word ".repeat(60);
        let text = format!("Long Section\n{}", body.trim());
        let sections = HeuristicSplitter::new(&cfg).split_page("d", 0, &page(&text));
        assert!(sections.len() > 1);
        for s in &sections {
            assert!(s.body.len() <= 64);
            assert_eq!(s.title, "Long Section");
        }
    }

    #[test]
    fn split_long_prefers_line_then_word_breaks() {
        assert_eq!(split_long("aaaa\nbbbb cccc", 10), vec!["aaaa", "bbbb cccc"]);
        assert_eq!(split_long("aaaa bbbb cccc", 10), vec!["aaaa bbbb", "cccc"]);
        assert_eq!(
            split_long("\nxxxxxxxxxxxx", 5),
            vec!["xxxxx", "xxxxx", "xx"]
        );
    }

    #[test]
    fn split_long_respects_char_boundaries() {
        let text = "é".repeat(100);
        let pieces = split_long(&text, 7);
        assert_eq!(pieces.concat(), text);
    }

    #[test]
    fn titles_are_truncated() {
        let cfg = ExtractionConfig {
            max_section_chars: 1500,
            title_max_chars: 10,
        };
        let sections = HeuristicSplitter::new(&cfg)
            .split_page("d", 0, &page("Extremely Long Heading Words\nbody text."));
        assert_eq!(sections[0].title, "Extremely");
    }

    #[test]
    fn extract_sections_skips_empty_pages() {
        let doc = Document::from_page_texts("d.pdf", ["", "Overview\nSome text.", "  "]);
        let sections = extract_sections(&HeuristicSplitter::default(), 2, &doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].page_number, 2);
        assert_eq!(sections[0].order.document_index, 2);
    }

    #[test]
    fn heading_detection() {
        assert!(looks_like_heading("Introduction to Machine Learning"));
        assert!(looks_like_heading("2.1 Data Collection"));
        assert!(looks_like_heading("METHODS"));
        assert!(!looks_like_heading("Recent advances in large language models have"));
        assert!(!looks_like_heading("This Is A Sentence."));
    }
}
