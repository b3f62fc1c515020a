//! Search query assembly
//!
//! Free-text arguments are passed to the engine verbatim; only the
//! zero-argument case substitutes a default filter. Query syntax is never
//! validated here; a malformed query comes back from the engine as an error
//! or an empty result set.

use std::path::Path;

use tracing::debug;

/// Join CLI arguments into one query string, preserving each argument's
/// internal whitespace
pub fn build_query(args: &[String]) -> Option<String> {
    if args.is_empty() {
        None
    } else {
        Some(args.join(" "))
    }
}

/// The default filter: inbox minus noisy category folders.
///
/// Path predicates use recursive wildcards because the mirrored hierarchy
/// can place category folders at different depths per account. When none of
/// the category folders exist under the mailbox root the plain inbox filter
/// is used instead.
pub fn default_query(maildir: Option<&Path>, excluded_folders: &[String]) -> String {
    let excluded: Vec<&String> = match maildir {
        Some(root) => excluded_folders
            .iter()
            .filter(|name| folder_exists(root, name, 0))
            .collect(),
        // Without a known mailbox root, keep the full exclusion list; an
        // exclusion for an absent folder matches nothing.
        None => excluded_folders.iter().collect(),
    };

    if excluded.is_empty() {
        debug!("no category folders found, using plain inbox filter");
        return "tag:inbox".to_string();
    }

    let mut query = String::from("tag:inbox");
    for name in excluded {
        query.push_str(&format!(" and not path:\"**/{}/**\"", name));
    }
    query
}

/// Look for a directory named `name` up to three levels below `root`
fn folder_exists(root: &Path, name: &str, depth: usize) -> bool {
    if depth > 3 {
        return false;
    }
    let Ok(entries) = std::fs::read_dir(root) else {
        return false;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy() == name {
            return true;
        }
        if folder_exists(&path, name, depth + 1) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excluded() -> Vec<String> {
        vec!["Spam".to_string(), "Promotions".to_string()]
    }

    #[test]
    fn test_build_query_joins_args() {
        let args = vec!["from:alice".to_string(), "project update".to_string()];
        assert_eq!(
            build_query(&args).as_deref(),
            Some("from:alice project update")
        );
    }

    #[test]
    fn test_build_query_empty_args() {
        assert_eq!(build_query(&[]), None);
    }

    #[test]
    fn test_default_query_without_maildir_keeps_exclusions() {
        let query = default_query(None, &excluded());
        assert!(query.starts_with("tag:inbox"));
        assert!(query.contains("not path:\"**/Spam/**\""));
        assert!(query.contains("not path:\"**/Promotions/**\""));
    }

    #[test]
    fn test_default_query_falls_back_to_plain_inbox() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Inbox")).unwrap();

        let query = default_query(Some(dir.path()), &excluded());
        assert_eq!(query, "tag:inbox");
    }

    #[test]
    fn test_default_query_finds_nested_category_folder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("account/[Gmail]/Spam")).unwrap();

        let query = default_query(Some(dir.path()), &excluded());
        assert!(query.contains("not path:\"**/Spam/**\""));
        // Promotions does not exist anywhere, so it is not excluded
        assert!(!query.contains("Promotions"));
    }

    #[test]
    fn test_default_query_never_empty() {
        let query = default_query(None, &[]);
        assert_eq!(query, "tag:inbox");
    }
}
