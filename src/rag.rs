//! Retrieval-augmented answer generation.
//!
//! For one question: embed it, take the `top_k` nearest chunks from the
//! index, render the fixed prompt around them, and ask the chat model.
//! The chunks that went into the prompt are returned with the answer so the
//! caller can cite them.

use anyhow::{bail, Context, Result};

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::llm::ChatModel;
use crate::models::AnswerResult;
use crate::prompt::render_prompt;
use crate::store::VectorIndex;

pub async fn answer_question(
    question: &str,
    index: &VectorIndex,
    embedder: &dyn EmbeddingProvider,
    chat: &dyn ChatModel,
    top_k: usize,
) -> Result<AnswerResult> {
    let question = question.trim();
    if question.is_empty() {
        bail!("question must not be empty");
    }

    let query_vec = embed_query(embedder, question)
        .await
        .context("Embedding the question failed")?;
    let hits = index.similarity_search(&query_vec, top_k)?;
    tracing::debug!(
        hits = hits.len(),
        best = hits.first().map(|h| h.score).unwrap_or(0.0),
        "retrieved context"
    );

    let context: Vec<_> = hits.into_iter().map(|h| h.chunk).collect();
    let prompt = render_prompt(&context, question);

    let answer = chat
        .complete(&prompt)
        .await
        .with_context(|| format!("{} failed to answer", chat.model_name()))?;

    Ok(AnswerResult { answer, context })
}
