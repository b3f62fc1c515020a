//! mailarc CLI
//!
//! Terminal front end for the mail archive: search the index, pick a thread
//! from a numbered menu, read it in a pager, save attachments. Mirroring and
//! indexing are delegated to mbsync and notmuch.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mailarc_core::config::{Config, SyncSettings};
use mailarc_core::engine::Notmuch;
use mailarc_core::query;
use mailarc_core::results::{Listing, ResultLister};
use mailarc_core::selector::Selector;
use mailarc_core::sync;
use mailarc_core::viewer::Viewer;

#[derive(Parser)]
#[command(name = "mailarc")]
#[command(about = "Search and read a locally mirrored mail archive")]
#[command(long_about = "mailarc orchestrates mbsync (mailbox mirroring) and notmuch (indexing and \
full-text search) behind a small terminal menu.

QUICK START:
  1. Mirror and index:  mailarc sync
  2. Search threads:    mailarc search from:alice invoice
  3. Default inbox:     mailarc

With no search terms the built-in filter is used: tag:inbox minus the
configured category folders (Spam, Promotions, ...). Selecting a result opens
the thread in your pager; afterwards you can save its attachments to the
current directory.")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[derive(Debug)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Free-text query terms (shorthand for `mailarc search TERMS...`)
    terms: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search the archive and browse the results interactively (default)
    Search {
        /// Free-text query terms, passed to the search engine verbatim
        terms: Vec<String>,
    },
    /// Open one thread directly by identifier (e.g. thread:000000000000abcd)
    View {
        /// Identifier from a previous search
        id: String,
    },
    /// Mirror the remote mailbox and refresh the search index
    Sync {
        /// Sync only this mbsync channel instead of all channels
        #[arg(long)]
        channel: Option<String>,
    },
    /// Check external tools and show the scanned sync-tool settings
    Setup,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // clap's default exit code for usage errors is 2; every fatal condition
    // here exits 1, while help and version output stay 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = usage_exit_code(&e);
            let _ = e.print();
            std::process::exit(code);
        }
    };
    let config = Config::load()?;

    match cli.command.unwrap_or(Commands::Search { terms: cli.terms }) {
        Commands::Search { terms } => cmd_search(&config, &terms),
        Commands::View { id } => cmd_view(&config, &id),
        Commands::Sync { channel } => Ok(sync::run_sync(&config, channel.as_deref())?),
        Commands::Setup => cmd_setup(&config),
    }
}

fn usage_exit_code(e: &clap::Error) -> i32 {
    use clap::error::ErrorKind;
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

// ============================================================================
// Search
// ============================================================================

fn cmd_search(config: &Config, terms: &[String]) -> Result<()> {
    let engine = Notmuch::new(config.tools.notmuch.clone());

    // Fail on a missing engine before any interaction starts
    engine.version()?;

    let query = effective_query(config, terms);
    let lister = ResultLister::new(engine.clone());

    match lister.list(&query)? {
        Listing::Empty => {
            println!("No results for: {}", query);
            Ok(())
        }
        Listing::Results(results) => {
            let mut viewer = make_viewer(config, engine);
            let stdin = std::io::stdin();
            Selector::new(&query, &results).run(
                stdin.lock(),
                std::io::stdout(),
                &mut viewer,
            )?;
            Ok(())
        }
    }
}

/// The query actually sent to the engine: CLI terms joined verbatim, or the
/// configured override, or the built-in category-excluding inbox filter
fn effective_query(config: &Config, terms: &[String]) -> String {
    if let Some(q) = query::build_query(terms) {
        return q;
    }
    if let Some(q) = &config.search.default_query {
        return q.clone();
    }
    let maildir = SyncSettings::scan(&config.tools.sync_config)
        .ok()
        .and_then(|s| s.maildir);
    query::default_query(maildir.as_deref(), &config.search.excluded_folders)
}

fn make_viewer(config: &Config, engine: Notmuch) -> Viewer<Notmuch> {
    Viewer::new(
        engine,
        config.tools.pager.clone(),
        config.tools.pager_args.clone(),
        config.attachment_dir(),
    )
}

// ============================================================================
// View
// ============================================================================

fn cmd_view(config: &Config, id: &str) -> Result<()> {
    let engine = Notmuch::new(config.tools.notmuch.clone());
    engine.version()?;
    make_viewer(config, engine).show(id)?;
    Ok(())
}

// ============================================================================
// Setup
// ============================================================================

fn cmd_setup(config: &Config) -> Result<()> {
    let engine = Notmuch::new(config.tools.notmuch.clone());
    match engine.version() {
        Ok(version) => println!("search engine:  {}", version),
        Err(e) => println!("search engine:  NOT FOUND ({})", e),
    }

    match sync_tool_version(&config.tools.sync) {
        Some(version) => println!("sync tool:      {}", version),
        None => println!("sync tool:      NOT FOUND ({})", config.tools.sync),
    }

    println!("sync config:    {}", config.tools.sync_config.display());
    match SyncSettings::scan(&config.tools.sync_config) {
        Ok(settings) => {
            match settings.maildir {
                Some(path) => println!("mailbox path:   {}", path.display()),
                None => println!("mailbox path:   (no Path directive found)"),
            }
            match settings.account {
                Some(account) => println!("account:        {}", account),
                None => println!("account:        (no User directive found)"),
            }
        }
        Err(e) => println!("                {}", e),
    }

    println!("attachments to: {}", config.attachment_dir().display());
    Ok(())
}

/// mbsync prints its version on stdout with `--version`
fn sync_tool_version(program: &str) -> Option<String> {
    let output = std::process::Command::new(program)
        .arg("--version")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_argument_exits_one() {
        let err = Cli::try_parse_from(["mailarc", "view"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 1);
    }

    #[test]
    fn test_help_and_version_exit_zero() {
        let help = Cli::try_parse_from(["mailarc", "--help"]).unwrap_err();
        assert_eq!(usage_exit_code(&help), 0);

        let version = Cli::try_parse_from(["mailarc", "--version"]).unwrap_err();
        assert_eq!(usage_exit_code(&version), 0);
    }
}
