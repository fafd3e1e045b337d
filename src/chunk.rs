//! Overlapping character-window splitter.
//!
//! Every page is split independently into windows of at most `chunk_size`
//! characters. A window ends at the latest paragraph break inside it, or
//! failing that the latest line break, or the latest space; only when none
//! exists is the text cut hard at `chunk_size`. The next window starts
//! exactly `chunk_overlap` characters before the previous one ended, so
//! neighbouring chunks of the same page always share that many characters.
//!
//! Lengths are counted in `char`s, never bytes, so umlauts and `§` are safe.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Chunk, PageDocument};

/// Break points, most preferred first.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Split all pages into chunks. Chunk indices restart at 0 for every page.
pub fn split_pages(pages: &[PageDocument], chunk_size: usize, chunk_overlap: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for page in pages {
        for (index, text) in split_text(&page.text, chunk_size, chunk_overlap)
            .into_iter()
            .enumerate()
        {
            chunks.push(make_chunk(page, index, text));
        }
    }
    chunks
}

/// Split one text into overlapping windows.
///
/// Whitespace-only windows are dropped. `chunk_overlap` must be smaller than
/// `chunk_size`; configuration validation guarantees this.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    assert!(chunk_overlap < chunk_size, "overlap must be smaller than window");

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < len {
        let hard_end = (start + chunk_size).min(len);
        let end = if hard_end < len {
            // The break must leave the next window starting after `start`.
            find_break(&chars, start + chunk_overlap + 1, hard_end).unwrap_or(hard_end)
        } else {
            len
        };

        let piece: String = chars[start..end].iter().collect();
        if !piece.trim().is_empty() {
            pieces.push(piece);
        }

        if end >= len {
            break;
        }
        start = end - chunk_overlap;
    }

    pieces
}

/// Latest end position in `lo..=hi` that directly follows a separator.
fn find_break(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    if lo > hi {
        return None;
    }
    for sep in SEPARATORS {
        let sep: Vec<char> = sep.chars().collect();
        let found = (lo..=hi)
            .rev()
            .find(|&end| end >= sep.len() && chars[end - sep.len()..end] == sep[..]);
        if found.is_some() {
            return found;
        }
    }
    None
}

fn make_chunk(page: &PageDocument, index: usize, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        source: page.source.clone(),
        page: page.page,
        chunk_index: index,
        text,
        hash,
    }
}
