//! Deterministic prompt assembly: grounding context, question, and the
//! persona preamble the completion stage must honor.

use crate::search::RetrievedChunk;

/// Literal emitted when retrieval produced nothing.
pub const NO_CONTEXT_SENTINEL: &str = "(No context retrieved.)";

/// Concatenate ranked chunks into numbered context blocks.
///
/// Each block is a 1-based `[Context i]` header followed by the chunk's raw
/// text; blocks are separated by a blank line. An empty list yields the
/// sentinel unchanged.
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Context {}]\n{}", i + 1, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fixed template: instruction line, context section, question section.
/// Same shape regardless of content.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the question using only the context below.\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}"
    )
}

/// Persona instruction enforcing the grounding contract.
pub fn system_preamble() -> &'static str {
    "You are a helpful wiki guide. Answer using only the information in the \
     provided context. Do not use outside knowledge. If the context does not \
     contain the answer, say \"I don't know based on the wiki.\" Keep answers \
     short. Respond in plain text with no markup."
}
