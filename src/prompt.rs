//! The fixed German prompt used for every question.

use crate::models::Chunk;

/// Sentence the model must answer with when the context has no answer.
pub const FALLBACK_ANSWER: &str = "Dazu finde ich keine Informationen in der SPO.";

/// Fill the template with the retrieved chunks and the raw question.
///
/// Chunk texts are joined with a blank line, in retrieval order. Substitution
/// is a single pass, so braces in the question or the documents stay as they
/// are.
pub fn render_prompt(context: &[Chunk], question: &str) -> String {
    let context = context
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"
    Du bist ein hilfreicher Assistent für die Studienberatung an einer deutschen Hochschule.
    Beantworte die Frage des Studenten basierend auf dem folgenden Kontext (Auszüge aus der SPO).

    Regeln:
    1. Antworte **ausschließlich auf Deutsch**.
    2. Verwende nur Informationen aus dem Kontext. Wenn die Antwort nicht im Kontext steht, sag: "{fallback}"
    3. Sei präzise und nenne, wenn möglich, die relevanten Paragraphen (§) oder Abschnitte.

    <context>
    {context}
    </context>

    Frage des Studenten: {question}
    "#,
        fallback = FALLBACK_ANSWER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            id: String::new(),
            source: "data/spo.pdf".to_string(),
            page: Some(7),
            chunk_index: 0,
            text: text.to_string(),
            hash: String::new(),
        }
    }

    #[test]
    fn context_and_question_are_inserted() {
        let prompt = render_prompt(
            &[chunk("§ 21 Bachelorarbeit: 12 LP."), chunk("§ 22 Kolloquium.")],
            "Wieviel LP hat die Bachelorarbeit?",
        );
        assert!(prompt.contains("<context>\n    § 21 Bachelorarbeit: 12 LP.\n\n§ 22 Kolloquium.\n    </context>"));
        assert!(prompt.contains("Frage des Studenten: Wieviel LP hat die Bachelorarbeit?"));
    }

    #[test]
    fn rules_are_fixed() {
        let prompt = render_prompt(&[], "Frage");
        assert!(prompt.contains("Antworte **ausschließlich auf Deutsch**."));
        assert!(prompt.contains(&format!("sag: \"{}\"", FALLBACK_ANSWER)));
        assert!(prompt.contains("Paragraphen (§)"));
    }

    #[test]
    fn braces_are_not_expanded() {
        let prompt = render_prompt(&[chunk("Siehe {input}")], "Was bedeutet {context}?");
        assert!(prompt.contains("Siehe {input}"));
        assert!(prompt.contains("Frage des Studenten: Was bedeutet {context}?"));
    }
}
