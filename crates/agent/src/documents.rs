//! Document excerpt selection for the chat-with-file strategy.
//!
//! Chunks are scored by how many distinct query terms they contain. Terms
//! are lowercase ASCII words of two or more characters plus character
//! bigrams of CJK runs, so Japanese text without spaces still matches.

use std::collections::HashSet;
use switchyard_core::thread::DocumentChunk;

/// Pick up to `limit` chunks most relevant to `query`, best first.
/// Equal scores keep document order.
pub fn select_chunks<'a>(chunks: &'a [DocumentChunk], query: &str, limit: usize) -> Vec<&'a DocumentChunk> {
    let wanted = terms(query);
    let mut scored: Vec<(usize, &DocumentChunk)> = chunks
        .iter()
        .map(|c| (terms(&c.content).intersection(&wanted).count(), c))
        .collect();
    // Stable sort: ties stay in document order
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, c)| c).collect()
}

/// The document block appended to the system instruction.
pub fn context_section(chunks: &[&DocumentChunk]) -> String {
    let mut section = String::from(
        "## Documents\n\nAnswer using the excerpts below. Cite the source name in brackets, \
         e.g. [report.pdf], for every fact taken from them. If they do not contain the answer, say so.\n",
    );
    for chunk in chunks {
        section.push_str(&format!("\n[{}]\n{}\n", chunk.source, chunk.content.trim()));
    }
    section
}

fn terms(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    let mut out = HashSet::new();

    for word in lower.split(|c: char| !c.is_ascii_alphanumeric()) {
        if word.len() >= 2 {
            out.insert(word.to_string());
        }
    }

    let mut run: Vec<char> = Vec::new();
    for c in lower.chars().chain(std::iter::once(' ')) {
        if is_cjk(c) {
            run.push(c);
            continue;
        }
        match run.len() {
            0 => {}
            1 => {
                out.insert(run[0].to_string());
            }
            _ => {
                for pair in run.windows(2) {
                    out.insert(pair.iter().collect());
                }
            }
        }
        run.clear();
    }
    out
}

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, content: &str) -> DocumentChunk {
        DocumentChunk { source: source.into(), content: content.into() }
    }

    #[test]
    fn ranks_by_term_overlap() {
        let chunks = vec![
            chunk("a.pdf", "Office opening hours are nine to five."),
            chunk("b.pdf", "The refund policy allows returns within 30 days."),
            chunk("c.pdf", "Refund requests need a receipt; the policy is strict."),
        ];
        let picked = select_chunks(&chunks, "What is the refund policy?", 2);
        let sources: Vec<_> = picked.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["c.pdf", "b.pdf"]);
    }

    #[test]
    fn japanese_bigrams_match() {
        let chunks = vec![
            chunk("faq.md", "営業時間は平日の九時から五時です。"),
            chunk("refund.md", "返金は購入から三十日以内に受け付けます。"),
        ];
        let picked = select_chunks(&chunks, "返金の期限は？", 1);
        assert_eq!(picked[0].source, "refund.md");
    }

    #[test]
    fn ties_keep_document_order() {
        let chunks = vec![chunk("1", "alpha"), chunk("2", "beta"), chunk("3", "gamma")];
        let picked = select_chunks(&chunks, "unrelated", 2);
        let sources: Vec<_> = picked.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["1", "2"]);
    }

    #[test]
    fn section_cites_sources() {
        let c = chunk("report.pdf", "  Revenue grew.  ");
        let section = context_section(&[&c]);
        assert!(section.contains("[report.pdf]\nRevenue grew."));
    }
}
