//! Result document assembly and writing.
//!
//! The JSON layout is fixed:
//!
//! ```json
//! {
//!   "metadata": {
//!     "input_documents": ["a.pdf"],
//!     "persona": "Academic Researcher",
//!     "job-to-be-done": "Survey literature on LLMs",
//!     "timestamp": "2024-05-01 12:00:00"
//!   },
//!   "extracted_sections": [
//!     { "document": "a.pdf", "page_number": 1, "section_title": "Introduction", "importance_rank": 1 }
//!   ],
//!   "subsection_analyses": [
//!     { "document": "a.pdf", "refined_text": "…", "page_number": 1 }
//!   ]
//! }
//! ```
//!
//! Scores stay internal; only ranks reach the output.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::pipeline::Analysis;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub metadata: Metadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub subsection_analyses: Vec<SubsectionAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    pub input_documents: Vec<String>,
    pub persona: String,
    #[serde(rename = "job-to-be-done")]
    pub job_to_be_done: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedSection {
    pub document: String,
    pub page_number: u32,
    pub section_title: String,
    pub importance_rank: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubsectionAnalysis {
    pub document: String,
    pub refined_text: String,
    pub page_number: u32,
}

impl Report {
    pub fn new(analysis: &Analysis, generated_at: DateTime<Local>) -> Self {
        Self {
            metadata: Metadata {
                input_documents: analysis.input_documents.clone(),
                persona: analysis.query.persona.clone(),
                job_to_be_done: analysis.query.job.clone(),
                timestamp: generated_at.format(TIMESTAMP_FORMAT).to_string(),
            },
            extracted_sections: analysis
                .sections
                .iter()
                .map(|s| ExtractedSection {
                    document: s.section.document.clone(),
                    page_number: s.section.page_number,
                    section_title: s.section.title.clone(),
                    importance_rank: s.rank,
                })
                .collect(),
            subsection_analyses: analysis
                .snippets
                .iter()
                .map(|s| SubsectionAnalysis {
                    document: s.document.clone(),
                    refined_text: s.text.clone(),
                    page_number: s.page_number,
                })
                .collect(),
        }
    }
}

/// Serialize `report` as pretty JSON to `path`.
///
/// The parent directory is created if needed. The JSON is written to a
/// temporary file next to `path` and renamed into place, so readers never
/// see a half-written result.
pub fn write_report(path: &Path, report: &Report) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;

    let json = serde_json::to_string_pretty(report)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    tmp.write_all(json.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateSection, Query, RefinedSnippet, ScoredSection, SectionOrder};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn analysis() -> Analysis {
        Analysis {
            input_documents: vec!["paper.pdf".to_string()],
            query: Query::new("Academic Researcher", "Survey literature on LLMs"),
            sections: vec![ScoredSection {
                section: CandidateSection {
                    document: "paper.pdf".to_string(),
                    page_number: 1,
                    title: "Introduction to Machine Learning".to_string(),
                    body: "Recent advances in large language models...".to_string(),
                    order: SectionOrder {
                        document_index: 0,
                        page_number: 1,
                        in_page_index: 0,
                    },
                },
                score: 0.42,
                rank: 1,
            }],
            snippets: vec![RefinedSnippet {
                document: "paper.pdf".to_string(),
                page_number: 1,
                text: "Recent advances in large language models...".to_string(),
                score: 0.4,
            }],
        }
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn json_uses_published_field_names() {
        let report = Report::new(&analysis(), fixed_time());
        let value = serde_json::to_value(&report).unwrap();

        let meta = &value["metadata"];
        assert_eq!(meta["input_documents"][0], "paper.pdf");
        assert_eq!(meta["persona"], "Academic Researcher");
        assert_eq!(meta["job-to-be-done"], "Survey literature on LLMs");
        assert_eq!(meta["timestamp"], "2024-05-01 09:30:00");

        let section = &value["extracted_sections"][0];
        assert_eq!(section["section_title"], "Introduction to Machine Learning");
        assert_eq!(section["importance_rank"], 1);
        assert_eq!(section["page_number"], 1);
        assert!(section.get("score").is_none());

        let snippet = &value["subsection_analyses"][0];
        assert_eq!(snippet["document"], "paper.pdf");
        assert!(snippet["refined_text"].as_str().unwrap().starts_with("Recent"));
    }

    #[test]
    fn write_report_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("out").join("result.json");
        let report = Report::new(&analysis(), fixed_time());

        write_report(&path, &report).unwrap();

        let parsed: Report =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn write_report_replaces_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("result.json");
        std::fs::write(&path, "stale").unwrap();

        write_report(&path, &Report::new(&analysis(), fixed_time())).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"job-to-be-done\""));
        let leftovers = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
