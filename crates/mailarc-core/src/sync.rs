//! Mailbox sync driver
//!
//! Runs the external sync tool to refresh the local mirror, then asks the
//! search engine to pick up the new messages. Both steps are incremental and
//! safe to re-run; this module adds nothing on top of them.

use std::io::ErrorKind;
use std::process::Command;

use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};

/// Mirror the remote mailbox, then refresh the search index.
///
/// `channel` limits the sync to one named mbsync channel; without it all
/// channels are synced. Output from both tools is passed straight through to
/// the terminal.
pub fn run_sync(config: &Config, channel: Option<&str>) -> Result<()> {
    info!(tool = %config.tools.sync, ?channel, "starting mailbox sync");

    let mut cmd = Command::new(&config.tools.sync);
    match channel {
        Some(name) => cmd.arg(name),
        None => cmd.arg("-a"),
    };
    run_inherited(cmd, &config.tools.sync)?;

    info!(tool = %config.tools.notmuch, "refreshing search index");
    let mut index = Command::new(&config.tools.notmuch);
    index.arg("new");
    run_inherited(index, &config.tools.notmuch)?;

    Ok(())
}

fn run_inherited(mut cmd: Command, tool: &str) -> Result<()> {
    let status = cmd.status().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            Error::MissingTool {
                tool: tool.to_string(),
            }
        } else {
            Error::Io(e)
        }
    })?;

    if !status.success() {
        return Err(Error::ToolFailed {
            tool: tool.to_string(),
            status: status.code().unwrap_or(-1),
            stderr: String::new(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sync_tool() {
        let mut config = Config::default();
        config.tools.sync = "mailarc-test-no-such-sync".to_string();

        let err = run_sync(&config, None).unwrap_err();
        assert!(matches!(err, Error::MissingTool { ref tool } if tool.contains("no-such-sync")));
    }
}
