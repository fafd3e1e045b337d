//! Core data models.
//!
//! These types are the records that flow between the document loader, the
//! splitter, the vector index and the answer generator.

/// One page of text extracted from a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    /// Path of the originating file, as found under the documents directory.
    pub source: String,
    /// Page number counted from 1, when the format has pages.
    pub page: Option<u32>,
    pub text: String,
}

/// A window of page text, the unit of retrieval and citation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub source: String,
    pub page: Option<u32>,
    /// Position of this chunk within its page.
    pub chunk_index: usize,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

/// The outcome of one answered question.
///
/// `context` holds exactly the chunks placed into the prompt, in rank order.
#[derive(Debug, Clone)]
pub struct AnswerResult {
    pub answer: String,
    pub context: Vec<Chunk>,
}
