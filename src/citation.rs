//! Citation formatting for the "Quellen" panel.

use crate::models::Chunk;

/// Characters of chunk text shown under each citation.
pub const EXCERPT_CHARS: usize = 200;

const UNKNOWN_SOURCE: &str = "Dokument";
const UNKNOWN_PAGE: &str = "Unbekannt";

/// One line of the citation panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// Position in the retrieved context, counted from 1.
    pub number: usize,
    pub file_name: String,
    pub page: String,
    pub excerpt: String,
}

impl Citation {
    pub fn from_chunk(number: usize, chunk: &Chunk) -> Self {
        Self {
            number,
            file_name: file_name(&chunk.source),
            page: chunk
                .page
                .map(|p| p.to_string())
                .unwrap_or_else(|| UNKNOWN_PAGE.to_string()),
            excerpt: excerpt(&chunk.text),
        }
    }

    /// Markdown heading, e.g. `**Quelle 1:** spo.pdf (Seite 4)`.
    pub fn label(&self) -> String {
        format!(
            "**Quelle {}:** {} (Seite {})",
            self.number, self.file_name, self.page
        )
    }
}

/// Citations for every chunk of an answer's context, in order.
pub fn citations_for(context: &[Chunk]) -> Vec<Citation> {
    context
        .iter()
        .enumerate()
        .map(|(i, chunk)| Citation::from_chunk(i + 1, chunk))
        .collect()
}

fn file_name(source: &str) -> String {
    source
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_SOURCE)
        .to_string()
}

fn excerpt(text: &str) -> String {
    let mut out: String = text.chars().take(EXCERPT_CHARS).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, page: Option<u32>, text: &str) -> Chunk {
        Chunk {
            id: String::new(),
            source: source.to_string(),
            page,
            chunk_index: 0,
            text: text.to_string(),
            hash: String::new(),
        }
    }

    #[test]
    fn basename_and_page() {
        let c = Citation::from_chunk(1, &chunk("data/SPO_Maschinenbau.pdf", Some(12), "§ 5"));
        assert_eq!(c.file_name, "SPO_Maschinenbau.pdf");
        assert_eq!(c.page, "12");
        assert_eq!(c.label(), "**Quelle 1:** SPO_Maschinenbau.pdf (Seite 12)");
    }

    #[test]
    fn windows_paths_and_missing_metadata() {
        let c = Citation::from_chunk(2, &chunk("C:\\spo\\data\\SPO.pdf", None, "x"));
        assert_eq!(c.file_name, "SPO.pdf");
        assert_eq!(c.page, "Unbekannt");

        let c = Citation::from_chunk(3, &chunk("", None, "x"));
        assert_eq!(c.file_name, "Dokument");
    }

    #[test]
    fn excerpt_is_truncated_by_chars() {
        let text = "ü".repeat(250);
        let c = Citation::from_chunk(1, &chunk("a.pdf", Some(1), &text));
        assert_eq!(c.excerpt.chars().count(), EXCERPT_CHARS + 3);
        assert!(c.excerpt.ends_with("..."));

        let c = Citation::from_chunk(1, &chunk("a.pdf", Some(1), "kurz"));
        assert_eq!(c.excerpt, "kurz...");
    }

    #[test]
    fn one_citation_per_chunk_numbered_from_one() {
        let context = vec![
            chunk("a.pdf", Some(1), "eins"),
            chunk("b.pdf", Some(2), "zwei"),
        ];
        let citations = citations_for(&context);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[1].number, 2);
        assert_eq!(citations[1].file_name, "b.pdf");
    }
}
