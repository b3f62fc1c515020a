//! Result listing
//!
//! Runs the same query twice against the engine (summary form and identifier
//! form) and pairs the two outputs positionally. The two invocations are not
//! atomic against a concurrently mutating index, so a length mismatch is a
//! hard error rather than something to retry or truncate.

use tracing::debug;

use crate::engine::{Granularity, SearchEngine, SearchOutput};
use crate::error::{Error, Result};

/// One search hit: the human-readable summary and the opaque identifier the
/// viewer is invoked with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Display line with the grouping prefix stripped
    pub summary: String,

    /// Identifier passed through verbatim to the viewer
    pub id: String,
}

/// Outcome of listing a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// The query matched nothing (clean termination, not an error)
    Empty,
    /// Ordered results, newest first as returned by the engine
    Results(Vec<SearchResult>),
}

/// Pairs summary lines with identifiers at a fixed granularity
pub struct ResultLister<E: SearchEngine> {
    engine: E,
    granularity: Granularity,
}

impl<E: SearchEngine> ResultLister<E> {
    /// The shipped default: whole conversation threads
    pub fn new(engine: E) -> Self {
        Self::with_granularity(engine, Granularity::Thread)
    }

    /// Use a different grouping. Both invocations in [`list`](Self::list)
    /// share this value, and the real engine rejects combinations it cannot
    /// honor (per-message summaries) instead of pairing mismatched outputs.
    pub fn with_granularity(engine: E, granularity: Granularity) -> Self {
        Self {
            engine,
            granularity,
        }
    }

    /// Run the query in both output forms and pair the results.
    ///
    /// Both invocations use the granularity fixed at construction, so the
    /// positional pairing below is sound whenever the index held still
    /// between them.
    pub fn list(&self, query: &str) -> Result<Listing> {
        let summaries = self
            .engine
            .search(query, SearchOutput::Summary, self.granularity)?;
        let identifiers = self
            .engine
            .search(query, SearchOutput::Identifiers, self.granularity)?;

        if summaries.is_empty() || identifiers.is_empty() {
            return Ok(Listing::Empty);
        }

        if summaries.len() != identifiers.len() {
            return Err(Error::CountMismatch {
                summaries: summaries.len(),
                identifiers: identifiers.len(),
            });
        }

        debug!(count = summaries.len(), "paired search results");
        let results = summaries
            .into_iter()
            .zip(identifiers)
            .map(|(line, id)| SearchResult {
                summary: strip_group_prefix(&line).to_string(),
                id,
            })
            .collect();
        Ok(Listing::Results(results))
    }
}

/// Drop the leading grouping token (e.g. `thread:0000000000000abc`) and the
/// whitespace after it, leaving only the human-readable part of a summary
/// line
pub fn strip_group_prefix(line: &str) -> &str {
    match line.split_once(char::is_whitespace) {
        Some((_, rest)) => rest.trim_start(),
        None => line,
    }
}
