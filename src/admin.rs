//! Administrative knowledge-base commands.
//!
//! Everything that mutates the knowledge store lives here: `ops init`,
//! `ops kb add/import/list/show/rm`. The question-answering path never
//! touches these — it reads a snapshot and nothing else.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::assistant::GREETING;
use crate::config::Config;
use crate::extract::{extract_pdf_text, guess_mime};
use crate::models::{ConversationMessage, KnowledgeItem, MediaAttachment};
use crate::retrieval::fallback_item;
use crate::store::{JsonKnowledgeStore, KnowledgeStore};
use crate::transcript::{JsonTranscriptStore, TranscriptStore};

/// Create the state directory, seed the knowledge store with the built-in
/// fallback reference, and seed the greeting transcript. Idempotent.
pub fn run_init(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.store.dir)
        .with_context(|| format!("Failed to create {}", config.store.dir.display()))?;

    let mut store = JsonKnowledgeStore::open(config.store.knowledge_path())?;
    if store.get(fallback_item().id.as_str())?.is_none() {
        store.upsert(fallback_item())?;
    }

    let transcript = JsonTranscriptStore::new(config.store.transcript_path());
    if transcript.load()?.is_none() {
        transcript.save(&[ConversationMessage::notice(GREETING)])?;
    }

    println!("initialized state in {}", config.store.dir.display());
    Ok(())
}

/// `ops kb add` — create one item from inline content or a file.
pub fn run_kb_add(
    config: &Config,
    title: String,
    category: String,
    content: Option<String>,
    file: Option<PathBuf>,
    attach: bool,
) -> Result<()> {
    let mut store = JsonKnowledgeStore::open(config.store.knowledge_path())?;

    let item = match (content, file) {
        (Some(text), None) => build_item(title, category, text, None, String::new()),
        (None, Some(path)) => item_from_file(&path, title, category, attach)?,
        _ => bail!("Provide exactly one of --content or --file"),
    };

    let id = item.id.clone();
    store.upsert(item)?;
    println!("added {}", id);
    Ok(())
}

/// `ops kb import` — walk a directory and create one item per matching
/// file. Files whose content hash is already in the store are skipped.
pub fn run_kb_import(config: &Config, dir: &Path, attach: bool) -> Result<()> {
    if !dir.exists() {
        bail!("Import directory does not exist: {}", dir.display());
    }

    let include_set = build_globset(&config.import.include_globs)?;
    let exclude_set = build_globset(&config.import.exclude_globs)?;

    let mut store = JsonKnowledgeStore::open(config.store.knowledge_path())?;
    let mut known_hashes: Vec<String> = store
        .list_all()?
        .into_iter()
        .map(|i| i.source_hash)
        .filter(|h| !h.is_empty())
        .collect();

    let mut imported = 0usize;
    let mut skipped = 0usize;

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let rel_str = relative.to_string_lossy().to_string();
        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        paths.push(entry.path().to_path_buf());
    }
    // Deterministic import order.
    paths.sort();

    for path in paths {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let hash = hex_digest(&bytes);
        if known_hashes.contains(&hash) {
            skipped += 1;
            continue;
        }

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        let item = item_from_file(&path, title, config.import.default_category.clone(), attach)?;
        let item = KnowledgeItem {
            source_hash: hash.clone(),
            ..item
        };
        store.upsert(item)?;
        known_hashes.push(hash);
        imported += 1;
    }

    println!("imported: {}", imported);
    println!("skipped (unchanged): {}", skipped);
    Ok(())
}

/// `ops kb list` — one line per item.
pub fn run_kb_list(config: &Config) -> Result<()> {
    let store = JsonKnowledgeStore::open(config.store.knowledge_path())?;
    let items = store.list_all()?;

    if items.is_empty() {
        println!("No knowledge items. Use `ops kb add` or `ops kb import`.");
        return Ok(());
    }

    println!("{:<38} {:<12} {:<10} TITLE", "ID", "CATEGORY", "UPDATED");
    for item in items {
        let marker = if item.media.is_some() { " [media]" } else { "" };
        println!(
            "{:<38} {:<12} {:<10} {}{}",
            item.id, item.category, item.last_updated, item.title, marker
        );
    }
    Ok(())
}

/// `ops kb show <id>` — full item on stdout.
pub fn run_kb_show(config: &Config, id: &str) -> Result<()> {
    let store = JsonKnowledgeStore::open(config.store.knowledge_path())?;
    let item = match store.get(id)? {
        Some(item) => item,
        None => bail!("knowledge item not found: {}", id),
    };

    println!("--- Item ---");
    println!("id:       {}", item.id);
    println!("title:    {}", item.title);
    println!("category: {}", item.category);
    println!("updated:  {}", item.last_updated);
    if let Some(ref media) = item.media {
        println!(
            "media:    {} ({})",
            media.file_name.as_deref().unwrap_or("(unnamed)"),
            media.mime_type
        );
    }
    println!();
    println!("--- Content ---");
    println!("{}", item.content);
    Ok(())
}

/// `ops kb rm <id>`.
pub fn run_kb_rm(config: &Config, id: &str) -> Result<()> {
    let mut store = JsonKnowledgeStore::open(config.store.knowledge_path())?;
    if store.remove(id)? {
        println!("removed {}", id);
        Ok(())
    } else {
        bail!("knowledge item not found: {}", id)
    }
}

// ============ Item construction ============

fn build_item(
    title: String,
    category: String,
    content: String,
    media: Option<MediaAttachment>,
    source_hash: String,
) -> KnowledgeItem {
    KnowledgeItem {
        id: Uuid::new_v4().to_string(),
        title,
        category,
        content,
        last_updated: Utc::now().date_naive(),
        media,
        source_hash,
    }
}

/// Build an item from a file on disk. PDFs go through text extraction
/// (placeholder content on failure); other files are read as UTF-8 text.
/// With `attach`, the original bytes ride along base64-encoded — but only
/// when the MIME type can be guessed, which keeps every stored payload
/// typed.
fn item_from_file(path: &Path, title: String, category: String, attach: bool) -> Result<KnowledgeItem> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let content = match guess_mime(path) {
        Some("application/pdf") => extract_pdf_text(&bytes),
        // Images have no extractable text; the item matches on its title
        // until the operator edits the content in.
        Some(mime) if mime.starts_with("image/") => String::new(),
        _ => String::from_utf8_lossy(&bytes).to_string(),
    };

    let media = if attach {
        match guess_mime(path) {
            Some(mime) => Some(MediaAttachment {
                mime_type: mime.to_string(),
                data: STANDARD.encode(&bytes),
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string()),
            }),
            None => {
                eprintln!(
                    "warning: no known MIME type for {}, not attaching",
                    path.display()
                );
                None
            }
        }
    } else {
        None
    };

    Ok(build_item(title, category, content, media, String::new()))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
