//! Ranking pipeline orchestration.
//!
//! Coordinates the full run: input scan → page extraction → section
//! splitting → embedding → scoring → ranking → refinement → output.
//!
//! Per-document and per-unit failures are logged and skipped. The run only
//! fails when no document could be read, the model cannot be loaded, or the
//! query itself cannot be embedded.

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::embedding::{create_provider, embed_query, embed_units, EmbeddingProvider};
use crate::error::DocrankError;
use crate::extract::read_document;
use crate::input::{scan_inputs, InputFile};
use crate::models::{CandidateSection, Document, Query, RefinedSnippet, ScoredSection};
use crate::output::{write_report, Report};
use crate::rank::rank_sections;
use crate::refine::refine_sections;
use crate::scoring::cosine_similarity;
use crate::sections::{extract_sections, HeuristicSplitter, SectionSplitter};

/// Everything a run produces before serialization.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Ids of the documents that were read successfully, in input order.
    pub input_documents: Vec<String>,
    pub query: Query,
    /// Top-K sections, rank 1 first.
    pub sections: Vec<ScoredSection>,
    /// Top-M snippets in refiner order.
    pub snippets: Vec<RefinedSnippet>,
}

/// Summary of a completed run, printed by the CLI.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output: PathBuf,
    pub documents_found: usize,
    pub documents_read: usize,
    pub sections: usize,
    pub snippets: usize,
}

/// Read every input file, skipping (and logging) the ones that fail.
pub fn read_documents(files: &[InputFile]) -> Vec<Document> {
    let mut documents = Vec::with_capacity(files.len());
    for file in files {
        match read_document(file) {
            Ok(doc) => {
                tracing::debug!(document = %doc.id, pages = doc.pages.len(), "read document");
                documents.push(doc);
            }
            Err(e) => tracing::warn!(document = %file.id, error = %e, "skipping document"),
        }
    }
    documents
}

/// Score, rank and refine `documents` against `query`.
///
/// `documents` are assumed to be in input order; their position becomes the
/// document part of every section's tie-break order.
pub fn analyze(
    documents: &[Document],
    query: &Query,
    provider: &dyn EmbeddingProvider,
    splitter: &dyn SectionSplitter,
    config: &Config,
) -> Result<Analysis, DocrankError> {
    if documents.is_empty() {
        return Err(DocrankError::NoInput {
            location: "the document set".to_string(),
        });
    }

    let query_vector = embed_query(provider, &query.text())?;

    let candidates: Vec<CandidateSection> = documents
        .iter()
        .enumerate()
        .flat_map(|(i, doc)| extract_sections(splitter, i, doc))
        .collect();
    tracing::info!(
        documents = documents.len(),
        sections = candidates.len(),
        model = provider.model_name(),
        "scoring candidate sections"
    );
    if candidates.is_empty() {
        tracing::warn!("no text found in any document");
    }

    let bodies: Vec<String> = candidates.iter().map(|c| c.body.clone()).collect();
    let vectors = embed_units(provider, &bodies, config.embedding.batch_size);

    let mut scored = Vec::with_capacity(candidates.len());
    for (candidate, vector) in candidates.into_iter().zip(vectors) {
        match vector {
            Ok(v) => {
                let score = cosine_similarity(&v, &query_vector);
                scored.push((candidate, score));
            }
            Err(e) => tracing::warn!(
                document = %candidate.document,
                page = candidate.page_number,
                error = %e,
                "skipping section that failed to embed"
            ),
        }
    }

    let sections = rank_sections(scored, config.run.top_k);
    let snippets = refine_sections(
        provider,
        &query_vector,
        &sections,
        &config.refine,
        config.run.top_m,
        config.embedding.batch_size,
    );

    Ok(Analysis {
        input_documents: documents.iter().map(|d| d.id.clone()).collect(),
        query: query.clone(),
        sections,
        snippets,
    })
}

/// Run the whole pipeline for a validated `config` and write the result.
///
/// The embedding model is loaded only after at least one document has been
/// read, so an empty input directory fails fast with
/// [`DocrankError::NoInput`] and nothing is written.
pub fn run(config: &Config) -> Result<RunSummary> {
    let files = scan_inputs(&config.input)?;
    let documents = read_documents(&files);
    if documents.is_empty() {
        return Err(DocrankError::NoInput {
            location: config.input.dir.display().to_string(),
        }
        .into());
    }

    let provider = create_provider(&config.embedding)?;
    let splitter = HeuristicSplitter::new(&config.extraction);
    let query = Query::new(config.run.persona.clone(), config.run.job.clone());

    let analysis = analyze(&documents, &query, provider.as_ref(), &splitter, config)?;

    let report = Report::new(&analysis, chrono::Local::now());
    write_report(&config.run.output, &report)?;
    tracing::info!(output = %config.run.output.display(), "wrote result");

    Ok(RunSummary {
        output: config.run.output.clone(),
        documents_found: files.len(),
        documents_read: documents.len(),
        sections: analysis.sections.len(),
        snippets: analysis.snippets.len(),
    })
}
