//! Context assembly for the answering engine.
//!
//! Builds the single text payload sent to the language model from the
//! retrieved chunks, the prior conversation, optional case-specific facts,
//! and the current question. Chunk text is embedded verbatim.
//!
//! When retrieval found nothing, the context block is replaced by
//! [`NO_SOURCES_INSTRUCTION`] so the engine says it has no sourced answer
//! instead of improvising one.

use crate::models::{Chunk, SituationalFacts, Turn};

/// Sent in place of the context when no chunk passed retrieval.
pub const NO_SOURCES_INSTRUCTION: &str = "NO SOURCED INFORMATION: none of the official documents \
matched this question. Reply that you do not have sourced information to answer it, and suggest \
that the user rephrase the question or check the official tender documents. Do not guess, and do \
not cite any document.";

const PERSONA: &str = "You are HawkerGuru, an expert assistant for Singapore hawker stall bidding. \
Use the following context to answer the question at the end.
If you don't know the answer, just say that you don't know, don't try to make up an answer.
Only cite documents that appear in the context, naming the source and section.";

const GUIDELINES: &str = "Key guidelines:
1. Always give the general rule first, from the most authoritative source, then any \
location- or case-specific detail:
   - For rules or requirements, cite the Terms & Conditions first, then FAQ or Tender Notice clarifications
   - For processes or procedures, start with the FAQ explanation and give step-by-step guidance
   - For current tenders, prioritize the current Tender Notice and note any special conditions
2. For location-specific questions:
   - First state the general rule
   - Then highlight any special requirements or restrictions for that location
3. For food type questions:
   - Reference the Articles of Sale guide
   - Explain any special requirements (e.g., Halal certification)
4. Be clear and concise, and explain in simple terms.";

/// Inputs for one prompt.
#[derive(Debug, Clone, Copy)]
pub struct ContextRequest<'a> {
    pub question: &'a str,
    /// Retrieved chunks, best first.
    pub chunks: &'a [Chunk],
    /// Prior exchanges, oldest first.
    pub history: &'a [Turn],
    pub situation: Option<&'a SituationalFacts>,
}

/// Assemble the full prompt.
pub fn assemble(req: &ContextRequest<'_>) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(PERSONA);
    out.push_str("\n\n");
    out.push_str(GUIDELINES);
    out.push_str("\n\nContext:\n");

    if req.chunks.is_empty() {
        out.push_str(NO_SOURCES_INSTRUCTION);
        out.push('\n');
    } else {
        out.push_str(&build_context(req.chunks));
    }

    out.push_str("\nChat History:\n");
    out.push_str(&format_history(req.history));

    if let Some(situation) = req.situation.filter(|s| !s.facts.is_empty()) {
        out.push_str("\nSituational Facts");
        if !situation.title.is_empty() {
            out.push_str(&format!(" ({})", situation.title));
        }
        out.push_str(":\n");
        for (label, value) in &situation.facts {
            out.push_str(&format!("- {}: {}\n", label, value));
        }
        out.push_str(
            "Use these facts only after giving the general information that applies to all tenderers.\n",
        );
    }

    out.push_str(&format!("\nQuestion: {}\n\nHelpful Answer:", req.question.trim()));
    out
}

/// Number and label each chunk with its source.
pub fn build_context(chunks: &[Chunk]) -> String {
    let mut context = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        context.push_str(&format!(
            "[Source {}: {} ({})]\n{}\n\n---\n\n",
            i + 1,
            chunk.source,
            chunk.metadata.doc_type,
            chunk.text
        ));
    }
    context
}

fn format_history(history: &[Turn]) -> String {
    if history.is_empty() {
        return "(none)\n".to_string();
    }
    history
        .iter()
        .map(|turn| format!("Q: {}\nA: {}\n", turn.question, turn.answer))
        .collect()
}
