pub mod directory;
pub mod model;
pub mod narrow;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use once_cell::sync::Lazy;

use crate::directory::{Directory, InMemoryDirectory};
use crate::model::types::Message;
use crate::narrow::term::canonicalize_term;
use crate::narrow::{Filter, parser};

static LONG_VERSION: Lazy<String> = Lazy::new(|| {
    match option_env!("VERGEN_BUILD_TIMESTAMP") {
        Some(timestamp) => format!("{} (built {timestamp})", env!("CARGO_PKG_VERSION")),
        None => env!("CARGO_PKG_VERSION").to_string(),
    }
});

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "narrow",
    version,
    long_version = LONG_VERSION.as_str(),
    about = "Client-side narrow/search filter engine for team-chat messages"
)]
pub struct Cli {
    /// Realm snapshot JSON (streams, users, mutes); defaults to an empty
    /// realm
    #[arg(long, global = true)]
    pub realm: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a narrow query into canonical terms
    Parse {
        /// Query, e.g. `stream:general topic:bugs -is:starred`
        query: String,

        /// Emit terms as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Explain a narrow: term types, view classification, title and URL
    Explain {
        query: String,
    },
    /// Apply a narrow to a JSON-lines message file and print the matches
    Filter {
        query: String,

        /// Messages as JSON lines, `-` for stdin
        #[arg(long)]
        messages: PathBuf,

        /// Print matching message ids instead of full JSON
        #[arg(long, default_value_t = false)]
        ids_only: bool,
    },
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate man page to stdout
    Man,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let directory = load_directory(cli.realm.as_deref())?;

    match cli.command {
        Commands::Parse { query, json } => cmd_parse(&query, json, directory),
        Commands::Explain { query } => cmd_explain(&query, directory),
        Commands::Filter {
            query,
            messages,
            ids_only,
        } => cmd_filter(&query, &messages, ids_only, directory),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "narrow", &mut std::io::stdout());
            Ok(())
        }
        Commands::Man => {
            let man = clap_mangen::Man::new(Cli::command());
            man.render(&mut std::io::stdout())?;
            Ok(())
        }
    }
}

fn load_directory(realm: Option<&Path>) -> Result<Arc<dyn Directory>> {
    match realm {
        Some(path) => Ok(Arc::new(InMemoryDirectory::load(path)?)),
        None => Ok(Arc::new(InMemoryDirectory::default())),
    }
}

fn cmd_parse(query: &str, json: bool, directory: Arc<dyn Directory>) -> Result<()> {
    let terms: Vec<_> = parser::parse(query)
        .into_iter()
        .map(|term| canonicalize_term(term, directory.as_ref()))
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&terms)?);
        return Ok(());
    }
    for term in &terms {
        let sign = if term.negated { "-" } else { "" };
        println!(
            "{sign}{}:{}",
            term.operator.as_str().cyan(),
            term.operand
        );
    }
    Ok(())
}

fn cmd_explain(query: &str, directory: Arc<dyn Directory>) -> Result<()> {
    let filter = Filter::from_query(query, directory);

    let label = |name: &str| format!("{:<22}", name).bold();
    println!("{} {}", label("query:"), query);
    println!("{} {}", label("describe:"), filter.describe());
    println!(
        "{} {}",
        label("term types:"),
        filter.sorted_term_types().join(", ")
    );
    println!(
        "{} {}",
        label("title:"),
        filter.get_title().unwrap_or_else(|| "(none)".to_string())
    );
    println!(
        "{} {}",
        label("icon:"),
        filter.icon().map(|i| i.as_str()).unwrap_or("(none)")
    );
    println!("{} {}", label("redirect url:"), filter.generate_redirect_url());
    println!(
        "{} {}",
        label("can mark read:"),
        filter.can_mark_messages_read()
    );
    println!("{} {}", label("common narrow:"), filter.is_common_narrow());
    println!(
        "{} {}",
        label("collapses recipients:"),
        filter.supports_collapsing_recipients()
    );
    println!(
        "{} {}",
        label("locally evaluable:"),
        filter.can_apply_locally(false)
    );
    Ok(())
}

fn cmd_filter(
    query: &str,
    messages: &Path,
    ids_only: bool,
    directory: Arc<dyn Directory>,
) -> Result<()> {
    let raw = if messages == Path::new("-") {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(messages)
            .with_context(|| format!("failed to read messages from {}", messages.display()))?
    };

    let mut parsed: Vec<Message> = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let message: Message = serde_json::from_str(line)
            .with_context(|| format!("invalid message on line {}", lineno + 1))?;
        parsed.push(message);
    }

    let filter = Filter::from_query(query, directory);
    let total = parsed.len();
    let mut matched = 0usize;
    for message in &parsed {
        if !filter.matches(message) {
            continue;
        }
        matched += 1;
        if ids_only {
            println!("{}", message.id);
        } else {
            println!("{}", serde_json::to_string(message)?);
        }
    }
    tracing::info!(query, total, matched, "narrow_filter_applied");
    Ok(())
}
