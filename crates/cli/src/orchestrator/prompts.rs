// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two structured prompts injected into assistant panes during the
//! export/merge handshake (spec §6 "Export prompt" / "Merge prompt"). The
//! orchestrator never parses what comes back — only that the export file
//! exists and is non-empty.

/// Six canonical sections the export prompt asks the assistant to produce.
pub const EXPORT_SECTIONS: &[&str] = &[
    "Executive Summary",
    "Changes Made",
    "Results",
    "Recommendations",
    "Open Questions",
    "Next Steps",
];

/// Build the prompt injected into a fork's pane instructing the assistant
/// to write a markdown summary to `absolute_path`.
pub fn export_prompt(fork_name: &str, absolute_path: &str) -> String {
    let sections = EXPORT_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {s}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Please write a summary of this conversation branch (\"{fork_name}\") to the \
         file at the absolute path below. Use exactly these six markdown sections, in \
         order:\n{sections}\n\nWrite the file now to: {absolute_path}"
    )
}

/// Build the prompt injected into the parent branch's pane instructing it
/// to read and integrate the fork's export.
pub fn merge_prompt(fork_name: &str, relative_path: &str) -> String {
    format!(
        "The conversation branch \"{fork_name}\" has finished and exported its findings \
         to `{relative_path}` (relative to this project). Please read that file and \
         integrate its findings into our ongoing conversation."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_prompt_contains_all_sections_and_path() {
        let prompt = export_prompt("planets", "/tmp/demo/.orka/exports/fork-planets-x.md");
        for section in EXPORT_SECTIONS {
            assert!(prompt.contains(section), "missing section: {section}");
        }
        assert!(prompt.contains("/tmp/demo/.orka/exports/fork-planets-x.md"));
    }

    #[test]
    fn merge_prompt_names_fork_and_path() {
        let prompt = merge_prompt("planets", ".orka/exports/fork-planets-x.md");
        assert!(prompt.contains("planets"));
        assert!(prompt.contains(".orka/exports/fork-planets-x.md"));
    }
}
