//! Answer orchestration.
//!
//! Turns one user question into a displayed assistant message: append the
//! user turn, retrieve local documents, compose a grounded multimodal
//! prompt, call the generation service, and append the cited reply. Every
//! transcript mutation is written through to the [`TranscriptStore`].
//!
//! Failure semantics: a generation failure is absorbed into a single fixed
//! assistant message — the transcript grows by exactly two messages per
//! question whatever happens, and no half-built reply is ever committed.
//!
//! Requests are serialized by construction: [`Assistant::ask`] takes
//! `&mut self`, so a second question cannot start while one is in flight.

use anyhow::Result;

use crate::config::Config;
use crate::generation::{create_client, GenerationClient, GenerationRequest, Part};
use crate::models::ConversationMessage;
use crate::retrieval::{retrieve, truncate_context};
use crate::store::{JsonKnowledgeStore, KnowledgeStore};
use crate::transcript::{apply_retention, JsonTranscriptStore, TranscriptStore};

/// Seed message for a fresh (or unreadable) transcript.
pub const GREETING: &str = "Hello! I am the OpsDesk assistant. Ask me about local manuals, \
     NOTAMs, and operational procedures - answers cite the documents they are based on.";

/// Sole message left after a history reset.
pub const HISTORY_CLEARED: &str = "History cleared. How can I help?";

/// Fixed reply when the generation service cannot be reached or answers
/// unusably. Raw errors never surface in the transcript.
pub const CONNECTION_ERROR_REPLY: &str = "I could not reach the answer service. Check the API \
     credentials and your connection, then ask again.";

/// Fixed system instruction sent with every generation request.
const SYSTEM_INSTRUCTION: &str = "You are the OpsDesk assistant for an association of air \
     traffic controllers. Answer operational questions precisely and conservatively. Local \
     publications and national regulations take precedence over general international guidance; \
     never state limits or minima that are not backed by a source. When a reference document \
     answers the question, base the answer on it and name the document. Keep answers short and \
     operational.";

/// The answer orchestrator: owns the transcript and the handles to the
/// knowledge store, generation client, and transcript store.
pub struct Assistant {
    knowledge: Box<dyn KnowledgeStore>,
    client: Box<dyn GenerationClient>,
    store: Box<dyn TranscriptStore>,
    transcript: Vec<ConversationMessage>,
    web_search: bool,
    history_limit: usize,
    max_context_chars: usize,
}

impl Assistant {
    /// Assemble an assistant from explicit parts. The stored transcript is
    /// rehydrated if readable; otherwise the fixed greeting is seeded and
    /// persisted.
    pub fn new(
        knowledge: Box<dyn KnowledgeStore>,
        client: Box<dyn GenerationClient>,
        store: Box<dyn TranscriptStore>,
        config: &Config,
    ) -> Result<Self> {
        let mut transcript = match store.load()? {
            Some(messages) => messages,
            None => {
                let seed = vec![ConversationMessage::notice(GREETING)];
                store.save(&seed)?;
                seed
            }
        };
        apply_retention(&mut transcript, config.assistant.history_limit);

        Ok(Self {
            knowledge,
            client,
            store,
            transcript,
            web_search: config.generation.web_search,
            history_limit: config.assistant.history_limit,
            max_context_chars: config.retrieval.max_context_chars,
        })
    }

    /// Open the assistant over the file-backed stores named in the config.
    pub fn open(config: &Config) -> Result<Self> {
        let knowledge = JsonKnowledgeStore::open(config.store.knowledge_path())?;
        let client = create_client(&config.generation)?;
        let store = JsonTranscriptStore::new(config.store.transcript_path());
        Self::new(Box::new(knowledge), client, Box::new(store), config)
    }

    /// The ordered transcript, oldest first.
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.transcript
    }

    /// Answer one question. Returns the appended assistant message; a
    /// generation failure still returns `Ok` with the fixed error reply.
    pub async fn ask(&mut self, query: &str) -> Result<&ConversationMessage> {
        // Snapshot before the optimistic append so a store read problem
        // cannot strand an unanswered user message.
        let items = self.knowledge.list_all()?;

        self.push(ConversationMessage::user(query));

        let result = retrieve(query, &items);
        let context = truncate_context(&result.context_block, self.max_context_chars);

        let mut parts = vec![Part::Text(compose_prompt(query, &context))];
        for item in &result.matched {
            if let Some(media) = &item.media {
                parts.push(Part::Inline {
                    mime_type: media.mime_type.clone(),
                    data: media.data.clone(),
                });
            }
        }

        let request = GenerationRequest {
            parts,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            web_search: self.web_search,
        };

        let reply = match self.client.generate(&request).await {
            Ok(reply) => {
                let web_grounded = !reply.web_citations.is_empty();
                ConversationMessage::assistant(reply.text, result.source_titles, web_grounded)
            }
            Err(e) => {
                eprintln!("generation failed: {:#}", e);
                ConversationMessage::notice(CONNECTION_ERROR_REPLY)
            }
        };

        self.push(reply);
        Ok(self.transcript.last().unwrap())
    }

    /// Clear the stored transcript and replace it with the fixed
    /// acknowledgement notice.
    pub fn reset(&mut self) -> Result<()> {
        self.store.clear()?;
        self.transcript = vec![ConversationMessage::notice(HISTORY_CLEARED)];
        self.store.save(&self.transcript)?;
        Ok(())
    }

    fn push(&mut self, message: ConversationMessage) {
        self.transcript.push(message);
        apply_retention(&mut self.transcript, self.history_limit);
        // A failed write must not abort the exchange; the in-memory
        // transcript stays authoritative for this session.
        if let Err(e) = self.store.save(&self.transcript) {
            eprintln!("warning: could not persist transcript: {:#}", e);
        }
    }
}

/// Compose the grounded prompt: the literal question, the retrieval
/// context, and the fixed three-tier answering instructions.
fn compose_prompt(query: &str, context_block: &str) -> String {
    format!(
        "You are answering a question from an air traffic control professional.\n\n\
         Reference documents:\n\n{context}\n\n\
         Question: {query}\n\n\
         Answer with this priority order:\n\
         1. The reference documents above.\n\
         2. General international standards of practice (ICAO) you already know.\n\
         3. Live web search, for anything the documents do not cover.\n\n\
         Use **bold** for key terms and bullet lists for step-by-step procedures.",
        context = context_block,
        query = query
    )
}
