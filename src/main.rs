//! # OpsDesk CLI (`ops`)
//!
//! The `ops` binary is the primary interface for OpsDesk. It provides
//! commands for state initialization, knowledge-base curation, one-shot
//! and interactive question answering, and transcript management.
//!
//! ## Usage
//!
//! ```bash
//! ops --config ./config/ops.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ops init` | Create the state directory and seed stores |
//! | `ops kb add/import/list/show/rm` | Curate the knowledge base |
//! | `ops ask "<question>"` | Ask one question and print the cited answer |
//! | `ops chat` | Interactive conversation |
//! | `ops history` | Print the stored transcript |
//! | `ops reset` | Clear the conversation history |
//! | `ops completions <shell>` | Generate shell completions |

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use opsdesk::{admin, chat, config};

/// OpsDesk CLI — a local-first knowledge assistant for air traffic
/// control operations teams.
#[derive(Parser)]
#[command(
    name = "ops",
    about = "OpsDesk — a local-first knowledge assistant for ATC operations teams",
    version,
    long_about = "OpsDesk keeps a curated store of operational reference documents, selects \
    the ones relevant to a question by keyword matching, and asks an external generation \
    service for a grounded, cited answer with optional live web search."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ops.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the state directory and seed stores.
    ///
    /// Creates `knowledge.json` (seeded with the international standards
    /// reference) and `chat_history.json` (seeded with the greeting).
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Ask one question and print the cited answer.
    Ask {
        /// The question, quoted.
        question: String,
    },

    /// Interactive conversation. `/reset` clears history, `/quit` leaves.
    Chat,

    /// Print the stored transcript.
    History,

    /// Clear the conversation history.
    Reset,

    /// Curate the knowledge base.
    #[command(subcommand)]
    Kb(KbCommands),

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum KbCommands {
    /// Add one knowledge item from inline content or a file.
    Add {
        /// Item title, used for matching and citations.
        #[arg(long)]
        title: String,

        /// Classification tag (e.g. manual, notam, regulation).
        #[arg(long, default_value = "document")]
        category: String,

        /// Inline plain-text content.
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,

        /// Read content from a file (PDF goes through text extraction).
        #[arg(long)]
        file: Option<PathBuf>,

        /// Also store the original file bytes as a generation attachment.
        #[arg(long, requires = "file")]
        attach: bool,
    },

    /// Import every matching file under a directory as knowledge items.
    ///
    /// Include/exclude patterns come from the `[import]` config section.
    /// Files already imported with unchanged content are skipped.
    Import {
        /// Directory to walk.
        dir: PathBuf,

        /// Also store original PDF/image bytes as generation attachments.
        #[arg(long)]
        attach: bool,
    },

    /// List all knowledge items.
    List,

    /// Show one item in full.
    Show { id: String },

    /// Remove one item.
    Rm { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Completions don't need a config file.
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "ops", &mut std::io::stdout());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => admin::run_init(&config),
        Commands::Ask { question } => chat::run_ask(&config, &question).await,
        Commands::Chat => chat::run_chat(&config).await,
        Commands::History => chat::run_history(&config),
        Commands::Reset => chat::run_reset(&config),
        Commands::Kb(kb) => match kb {
            KbCommands::Add {
                title,
                category,
                content,
                file,
                attach,
            } => admin::run_kb_add(&config, title, category, content, file, attach),
            KbCommands::Import { dir, attach } => admin::run_kb_import(&config, &dir, attach),
            KbCommands::List => admin::run_kb_list(&config),
            KbCommands::Show { id } => admin::run_kb_show(&config, &id),
            KbCommands::Rm { id } => admin::run_kb_rm(&config, &id),
        },
        Commands::Completions { .. } => unreachable!("handled above"),
    }
}
