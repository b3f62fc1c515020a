//! Interactive result selector
//!
//! A menu loop over a frozen result set: render numbered lines, accept a
//! 1-based selection or a quit command, dispatch the selected identifier to
//! the viewer, re-render. The result set captured before the loop starts is
//! never re-queried; every iteration operates on the same ordered sequence.
//!
//! Generic over the input/output streams and the viewer so the whole loop
//! runs against cursors and a recording fake in tests.

use std::io::{BufRead, Write};
use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::results::SearchResult;

/// Something that can render one thread or message given its identifier
pub trait ThreadViewer {
    fn view(&mut self, id: &str) -> Result<()>;
}

/// Parsed user input for one prompt round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// 1-based index into the result sequence
    Open(usize),
    Quit,
    Invalid,
}

/// Classify one line of user input against a result count
pub fn parse_selection(input: &str, count: usize) -> Selection {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return Selection::Quit;
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Selection::Open(n),
        _ => Selection::Invalid,
    }
}

/// The menu loop over one frozen result set
pub struct Selector<'a> {
    query: &'a str,
    results: &'a [SearchResult],
    invalid_pause: Duration,
}

impl<'a> Selector<'a> {
    pub fn new(query: &'a str, results: &'a [SearchResult]) -> Self {
        Self {
            query,
            results,
            invalid_pause: Duration::from_millis(750),
        }
    }

    /// How long to linger on an "Invalid selection." message before
    /// re-rendering (zero in tests)
    pub fn invalid_pause(mut self, pause: Duration) -> Self {
        self.invalid_pause = pause;
        self
    }

    /// Run the loop until the user quits or input ends.
    ///
    /// The viewer is invoked synchronously; a viewer error is reported and
    /// the loop continues with the same result set.
    pub fn run<R, W, V>(&self, mut input: R, mut out: W, viewer: &mut V) -> Result<()>
    where
        R: BufRead,
        W: Write,
        V: ThreadViewer,
    {
        loop {
            self.render(&mut out)?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                // End of input behaves like quit
                writeln!(out)?;
                return Ok(());
            }

            match parse_selection(&line, self.results.len()) {
                Selection::Quit => {
                    debug!("selector terminated by user");
                    return Ok(());
                }
                Selection::Open(n) => {
                    let id = &self.results[n - 1].id;
                    debug!(%id, "dispatching to viewer");
                    if let Err(e) = viewer.view(id) {
                        writeln!(out, "Could not open {}: {}", id, e)?;
                        std::thread::sleep(self.invalid_pause);
                    }
                }
                Selection::Invalid => {
                    writeln!(out, "Invalid selection.")?;
                    std::thread::sleep(self.invalid_pause);
                }
            }
        }
    }

    /// Clear the screen and draw the full menu
    fn render<W: Write>(&self, out: &mut W) -> Result<()> {
        write!(out, "\x1b[2J\x1b[1;1H")?;
        writeln!(out, "Query: {}", self.query)?;
        writeln!(out)?;
        for (i, result) in self.results.iter().enumerate() {
            writeln!(out, "{:>3}. {}", i + 1, result.summary)?;
        }
        writeln!(out)?;
        write!(out, "Read [1-{}] (q to quit): ", self.results.len())?;
        out.flush()?;
        Ok(())
    }
}
