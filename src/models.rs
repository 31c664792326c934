//! Core data models used throughout docrank.
//!
//! These types represent the documents, sections, and snippets that flow
//! through the extract → embed → score → rank → refine pipeline. None of them
//! is mutated after creation; each stage builds new values from the previous
//! stage's output.

/// A loaded input document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Identifier reported in the output (the file name).
    pub id: String,
    pub pages: Vec<Page>,
}

/// One page of raw extracted text.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            id: id.into(),
            pages,
        }
    }

    /// Build a document from page texts, numbering pages from 1.
    pub fn from_page_texts<I, S>(id: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page {
                number: i as u32 + 1,
                text: text.into(),
            })
            .collect();
        Self::new(id, pages)
    }
}

/// Position of a section in extraction order: document, then page, then
/// in-page index. Used as the deterministic tie-break when scores are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionOrder {
    pub document_index: usize,
    pub page_number: u32,
    pub in_page_index: usize,
}

/// A contiguous span of page text treated as the unit of initial scoring.
#[derive(Debug, Clone)]
pub struct CandidateSection {
    pub document: String,
    pub page_number: u32,
    pub title: String,
    pub body: String,
    pub order: SectionOrder,
}

/// A candidate section with its relevance score and assigned rank.
#[derive(Debug, Clone)]
pub struct ScoredSection {
    pub section: CandidateSection,
    pub score: f32,
    /// 1 = most relevant.
    pub rank: u32,
}

/// A sentence-level excerpt surfaced from a top-ranked section.
#[derive(Debug, Clone)]
pub struct RefinedSnippet {
    pub document: String,
    pub page_number: u32,
    pub text: String,
    pub score: f32,
}

/// The query text built from persona and job-to-be-done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub persona: String,
    pub job: String,
}

impl Query {
    pub fn new(persona: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            job: job.into(),
        }
    }

    /// Combined text embedded once per run.
    pub fn text(&self) -> String {
        format!("{}. TASK: {}", self.persona.trim(), self.job.trim())
    }
}
