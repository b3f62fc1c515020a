//! Thread viewer
//!
//! Renders one thread (headers, attachment list, text body) from the search
//! engine's parsed JSON output, pages it through an external pager, and
//! saves raw MIME parts on request. All message parsing was already done by
//! the engine; this module only walks its JSON tree.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use dialoguer::Confirm;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::engine::SearchEngine;
use crate::error::{Error, Result};
use crate::selector::ThreadViewer;

/// Attachment metadata lifted from the engine's MIME part tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPart {
    /// MIME part number used for raw extraction. Absent when the engine
    /// reported no part id; such an attachment cannot be saved (part 0
    /// would extract the whole raw message instead).
    pub part: Option<u32>,
    pub filename: String,
    pub content_type: String,
}

/// Renders threads and extracts their attachments
pub struct Viewer<E: SearchEngine> {
    engine: E,
    pager: String,
    pager_args: Vec<String>,
    save_dir: PathBuf,
}

impl<E: SearchEngine> Viewer<E> {
    pub fn new(engine: E, pager: String, pager_args: Vec<String>, save_dir: PathBuf) -> Self {
        Self {
            engine,
            pager,
            pager_args,
            save_dir,
        }
    }

    /// Fetch, render, and page one thread, then offer attachment extraction
    pub fn show(&self, id: &str) -> Result<()> {
        let json = self.engine.show_json(id)?;
        let msg = first_message(&json).ok_or_else(|| Error::ThreadNotFound(id.to_string()))?;

        let (lines, attachments) = render_message(msg);
        self.page(&lines)?;

        if !attachments.is_empty() {
            let prompt = format!(
                "Save {} attachment(s) to {}?",
                attachments.len(),
                self.save_dir.display()
            );
            if Confirm::new().with_prompt(prompt).default(false).interact()? {
                for path in self.save_attachments(id, &attachments)? {
                    println!("Saved {}", path.display());
                }
                for att in attachments.iter().filter(|a| a.part.is_none()) {
                    println!("Cannot save {}: missing part number", att.filename);
                }
            }
        }
        Ok(())
    }

    /// Extract every attachment that carries a part number as a raw part
    /// into the save directory, returning the written paths. Parts without
    /// a number are skipped.
    pub fn save_attachments(&self, id: &str, attachments: &[AttachmentPart]) -> Result<Vec<PathBuf>> {
        let mut saved = Vec::with_capacity(attachments.len());
        for att in attachments {
            let Some(part) = att.part else {
                warn!(filename = %att.filename, "attachment has no part number, not saving");
                continue;
            };
            let dest = unique_path(&self.save_dir.join(safe_filename(&att.filename)));
            let bytes = self.engine.save_part(id, part, &dest)?;
            info!(part, bytes, dest = %dest.display(), "saved attachment");
            saved.push(dest);
        }
        Ok(saved)
    }

    /// Pipe the rendering through the configured pager; fall back to plain
    /// stdout when the pager is not available
    fn page(&self, lines: &[String]) -> Result<()> {
        debug!(pager = %self.pager, "paging thread");
        let spawned = Command::new(&self.pager)
            .args(&self.pager_args)
            .stdin(Stdio::piped())
            .spawn();

        match spawned {
            Ok(mut child) => {
                if let Some(stdin) = child.stdin.as_mut() {
                    for line in lines {
                        // The pager exiting early (user presses q) breaks the
                        // pipe; that is not an error.
                        if writeln!(stdin, "{}", line).is_err() {
                            break;
                        }
                    }
                }
                child.wait()?;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(pager = %self.pager, "pager not found, printing directly");
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                for line in lines {
                    writeln!(out, "{}", line)?;
                }
                Ok(())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl<E: SearchEngine> ThreadViewer for Viewer<E> {
    fn view(&mut self, id: &str) -> Result<()> {
        self.show(id)
    }
}

/// Depth-first search for the first node that looks like a message (has both
/// `headers` and `body`). The engine nests messages in arrays of
/// [message, replies] pairs of varying depth.
pub fn first_message(node: &Value) -> Option<&Value> {
    match node {
        Value::Object(map) => {
            if map.contains_key("headers") && map.contains_key("body") {
                return Some(node);
            }
            map.values().find_map(first_message)
        }
        Value::Array(items) => items.iter().find_map(first_message),
        _ => None,
    }
}

/// Walk the MIME part tree, collecting text body lines and attachment
/// metadata
pub fn collect_content(parts: &Value) -> (Vec<String>, Vec<AttachmentPart>) {
    let mut body = Vec::new();
    let mut attachments = Vec::new();
    walk_part(parts, &mut body, &mut attachments);

    while body.last().is_some_and(|l| l.is_empty()) {
        body.pop();
    }
    (body, attachments)
}

fn walk_part(node: &Value, body: &mut Vec<String>, attachments: &mut Vec<AttachmentPart>) {
    let Value::Object(map) = node else {
        if let Value::Array(items) = node {
            for item in items {
                walk_part(item, body, attachments);
            }
        }
        return;
    };

    let content_type = map
        .get("content-type")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if let Some(filename) = map.get("filename").and_then(Value::as_str) {
        if !filename.is_empty() {
            attachments.push(AttachmentPart {
                part: map.get("id").and_then(Value::as_u64).map(|id| id as u32),
                filename: filename.to_string(),
                content_type: content_type.to_string(),
            });
        }
    }

    match map.get("content") {
        Some(Value::String(text)) if content_type.starts_with("text/") => {
            body.extend(text.lines().map(str::to_string));
            body.push(String::new());
        }
        Some(children @ Value::Array(_)) => walk_part(children, body, attachments),
        _ => {}
    }
}

/// Render one message into pager lines
pub fn render_message(msg: &Value) -> (Vec<String>, Vec<AttachmentPart>) {
    let headers = msg.get("headers");
    let header = |name: &str| -> Option<&str> {
        headers
            .and_then(Value::as_object)?
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_str())
    };

    let (body, attachments) =
        collect_content(msg.get("body").unwrap_or(&Value::Null));

    let mut lines = Vec::new();
    lines.push(format!(
        "Subject: {}",
        header("subject").unwrap_or("(no subject)")
    ));
    if let Some(from) = header("from") {
        lines.push(format!("From:    {}", from));
    }
    if let Some(to) = header("to") {
        lines.push(format!("To:      {}", to));
    }
    if let Some(date) = header("date") {
        lines.push(format!("Date:    {}", date));
    }

    if !attachments.is_empty() {
        lines.push(String::new());
        lines.push("Attachments:".to_string());
        for (i, att) in attachments.iter().enumerate() {
            if att.content_type.is_empty() {
                lines.push(format!("  [{}] {}", i + 1, att.filename));
            } else {
                lines.push(format!(
                    "  [{}] {} ({})",
                    i + 1,
                    att.filename,
                    att.content_type
                ));
            }
        }
    }

    lines.push(String::new());
    lines.push("-".repeat(72));
    lines.push(String::new());

    if body.is_empty() {
        lines.push("[No text body]".to_string());
    } else {
        lines.extend(body);
    }

    (lines, attachments)
}

/// Reduce an attachment filename to a bare file name so a crafted name can
/// never escape the save directory
fn safe_filename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty() && n != "." && n != "..")
        .unwrap_or_else(|| "attachment.bin".to_string())
}

/// Append a numeric suffix until the path does not collide with an existing
/// file
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    for n in 1.. {
        let name = match &ext {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn thread_json() -> Value {
        // Shape matches `show --format=json`: arrays of [message, replies]
        json!([[[
            {
                "id": "msg-1@example.com",
                "headers": {
                    "Subject": "Quarterly invoice",
                    "From": "Carol <carol@example.com>",
                    "To": "alice@example.com",
                    "Date": "Thu, 21 Aug 2026 09:14:00 +0200"
                },
                "body": [
                    {
                        "id": 1,
                        "content-type": "multipart/mixed",
                        "content": [
                            {
                                "id": 2,
                                "content-type": "text/plain",
                                "content": "Hi Alice,\n\nInvoice attached.\n"
                            },
                            {
                                "id": 3,
                                "content-type": "application/pdf",
                                "filename": "invoice.pdf"
                            }
                        ]
                    }
                ]
            },
            []
        ]]])
    }

    #[test]
    fn test_first_message_descends_nested_arrays() {
        let json = thread_json();
        let msg = first_message(&json).unwrap();
        assert_eq!(msg["id"], "msg-1@example.com");
    }

    #[test]
    fn test_first_message_missing() {
        assert!(first_message(&json!([[]])).is_none());
        assert!(first_message(&json!({"headers": {}})).is_none());
    }

    #[test]
    fn test_collect_content() {
        let json = thread_json();
        let msg = first_message(&json).unwrap();
        let (body, attachments) = collect_content(&msg["body"]);

        assert_eq!(body, vec!["Hi Alice,", "", "Invoice attached."]);
        assert_eq!(
            attachments,
            vec![AttachmentPart {
                part: Some(3),
                filename: "invoice.pdf".to_string(),
                content_type: "application/pdf".to_string(),
            }]
        );
    }

    #[test]
    fn test_part_without_id_has_no_part_number() {
        let body = json!([{
            "content-type": "application/pdf",
            "filename": "invoice.pdf"
        }]);
        let (_, attachments) = collect_content(&body);
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].part, None);
    }

    #[test]
    fn test_save_skips_attachments_without_part_number() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct RecordingEngine {
            saved_parts: Rc<RefCell<Vec<u32>>>,
        }

        impl SearchEngine for RecordingEngine {
            fn search(
                &self,
                _query: &str,
                _output: crate::engine::SearchOutput,
                _granularity: crate::engine::Granularity,
            ) -> crate::error::Result<Vec<String>> {
                Ok(Vec::new())
            }

            fn show_json(&self, _id: &str) -> crate::error::Result<Value> {
                Ok(Value::Null)
            }

            fn save_part(&self, _id: &str, part: u32, dest: &Path) -> crate::error::Result<u64> {
                self.saved_parts.borrow_mut().push(part);
                std::fs::write(dest, b"raw part")?;
                Ok(8)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let parts = Rc::new(RefCell::new(Vec::new()));
        let viewer = Viewer::new(
            RecordingEngine {
                saved_parts: parts.clone(),
            },
            "less".to_string(),
            vec![],
            dir.path().to_path_buf(),
        );

        let attachments = vec![
            AttachmentPart {
                part: None,
                filename: "ghost.pdf".to_string(),
                content_type: "application/pdf".to_string(),
            },
            AttachmentPart {
                part: Some(3),
                filename: "invoice.pdf".to_string(),
                content_type: "application/pdf".to_string(),
            },
        ];

        let saved = viewer.save_attachments("thread:aaa", &attachments).unwrap();
        assert_eq!(saved, vec![dir.path().join("invoice.pdf")]);
        // Part 0 is the whole raw message; the numberless attachment must
        // trigger no extraction at all.
        assert_eq!(*parts.borrow(), vec![3]);
    }

    #[test]
    fn test_render_message() {
        let json = thread_json();
        let (lines, attachments) = render_message(first_message(&json).unwrap());

        assert_eq!(lines[0], "Subject: Quarterly invoice");
        assert_eq!(lines[1], "From:    Carol <carol@example.com>");
        assert!(lines.contains(&"Attachments:".to_string()));
        assert!(lines.contains(&"  [1] invoice.pdf (application/pdf)".to_string()));
        assert!(lines.contains(&"Hi Alice,".to_string()));
        assert_eq!(attachments.len(), 1);
    }

    #[test]
    fn test_render_message_without_body() {
        let msg = json!({
            "headers": {"Subject": "Empty"},
            "body": []
        });
        let (lines, attachments) = render_message(&msg);
        assert!(lines.contains(&"[No text body]".to_string()));
        assert!(attachments.is_empty());
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("report.pdf"), "report.pdf");
        assert_eq!(safe_filename("../../etc/passwd"), "passwd");
        assert_eq!(safe_filename("dir/nested.txt"), "nested.txt");
        assert_eq!(safe_filename(""), "attachment.bin");
        assert_eq!(safe_filename(".."), "attachment.bin");
    }

    #[test]
    fn test_unique_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pdf");

        assert_eq!(unique_path(&path), path);

        std::fs::write(&path, b"x").unwrap();
        let second = unique_path(&path);
        assert_eq!(second, dir.path().join("invoice (1).pdf"));

        std::fs::write(&second, b"x").unwrap();
        assert_eq!(unique_path(&path), dir.path().join("invoice (2).pdf"));
    }
}
