use similar::{ChangeTag, TextDiff};

use crate::models::ContentDiff;

/// Line diff keeping only lines unique to one side. Unchanged lines are dropped.
pub fn diff_lines(before: &str, after: &str) -> ContentDiff {
    let diff = TextDiff::from_lines(before, after);
    let mut result = ContentDiff::default();

    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches(['\r', '\n']).to_string();
        match change.tag() {
            ChangeTag::Delete => result.removed.push(line),
            ChangeTag::Insert => result.inserted.push(line),
            ChangeTag::Equal => {}
        }
    }

    result
}

/// `- ` for removed lines, `+ ` for inserted ones; removals first.
pub fn format_diff(diff: &ContentDiff) -> Vec<String> {
    diff.removed
        .iter()
        .map(|l| format!("- {}", l))
        .chain(diff.inserted.iter().map(|l| format!("+ {}", l)))
        .collect()
}
