//! Keyword retrieval over the knowledge store.
//!
//! Maps a free-text question to the subset of locally known documents worth
//! showing the generation service. Matching is intentionally simple
//! substring containment — no stemming, ranking, or relevance scoring —
//! and match order is the store's insertion order.
//!
//! A designated fallback reference (general international standards, ICAO)
//! is always appended to the rendered context when it was not itself
//! matched, so the generation step has baseline guidance even on zero
//! matches. The fallback never appears as a citation.

use chrono::NaiveDate;

use crate::models::{KnowledgeItem, RetrievalResult};

/// Well-known id of the fallback reference item.
pub const FALLBACK_ITEM_ID: &str = "intl-std-icao";

/// Built-in copy of the fallback reference. Seeded into new stores by
/// `ops init`; if the store carries an (admin-edited) item with the same
/// id, the store's version wins at query time.
pub fn fallback_item() -> KnowledgeItem {
    KnowledgeItem {
        id: FALLBACK_ITEM_ID.to_string(),
        title: "International Standards (ICAO)".to_string(),
        category: "reference".to_string(),
        content: "Baseline reference for air traffic services where no local \
                  document applies: ICAO Annex 11 (Air Traffic Services), \
                  Annex 2 (Rules of the Air), Doc 4444 PANS-ATM (separation \
                  minima, phraseology, coordination procedures) and Doc 9432 \
                  (Manual of Radiotelephony). Local publications and national \
                  regulations take precedence over this general guidance."
            .to_string(),
        last_updated: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        media: None,
        source_hash: String::new(),
    }
}

/// Select the items relevant to `query` and render them into a context
/// block. Pure read over the snapshot; no side effects.
///
/// An item is relevant if the lowercased query is a substring of its
/// lowercased title or content. Ties keep snapshot order.
pub fn retrieve(query: &str, items: &[KnowledgeItem]) -> RetrievalResult {
    let needle = query.to_lowercase();

    let matched: Vec<KnowledgeItem> = items
        .iter()
        .filter(|item| {
            item.title.to_lowercase().contains(&needle)
                || item.content.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();

    let fallback = items
        .iter()
        .find(|i| i.id == FALLBACK_ITEM_ID)
        .cloned()
        .unwrap_or_else(fallback_item);
    let fallback_matched = matched.iter().any(|i| i.id == FALLBACK_ITEM_ID);

    let mut sections: Vec<String> = matched.iter().map(render_section).collect();
    if !fallback_matched {
        sections.push(render_section(&fallback));
    }

    let source_titles = matched
        .iter()
        .filter(|i| i.id != FALLBACK_ITEM_ID)
        .map(|i| i.title.clone())
        .collect();

    RetrievalResult {
        context_block: sections.join("\n\n"),
        source_titles,
        matched,
    }
}

fn render_section(item: &KnowledgeItem) -> String {
    format!(
        "### {} [{}] (updated {})\n{}",
        item.title, item.category, item.last_updated, item.content
    )
}

/// Truncate a context block to at most `max_chars` characters on a char
/// boundary. `max_chars == 0` means unlimited.
pub fn truncate_context(context: &str, max_chars: usize) -> String {
    if max_chars == 0 || context.chars().count() <= max_chars {
        return context.to_string();
    }
    context.chars().take(max_chars).collect()
}
