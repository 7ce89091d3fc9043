//! FAQ normalizer.
//!
//! # Algorithm
//!
//! 1. Remove internal-notes blocks: a `[[ ... ]]` marker pair followed by a
//!    `+====+` delimiter run, and everything between. A marker pair with no
//!    delimiter after it is removed on its own.
//! 2. Remove everything from `REVISION HISTORY` (any case) to the end.
//! 3. Emit the document title, then walk the section vocabulary in order.
//!    The first occurrence of each section name after the previous match
//!    becomes a `## <Section>` header; prose in between is kept.
//! 4. Within the text, numbered lines become `### Q<n>: ...` and other
//!    lines ending in `?` become `### ...`.
//! 5. Collapse runs of blank lines, turn `•`/`●` bullets into `- `, and
//!    drop leftover `**` emphasis.
//! 6. Prepend a metadata comment describing the document.

use once_cell::sync::Lazy;
use regex::Regex;

pub const TITLE: &str = "# Frequently Asked Questions (FAQs) on Electronic Tender (e-Tender)";

static INTERNAL_NOTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[\[.*?\]\].*?\+=+\+").expect("valid notes regex"));
static NOTE_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[\[.*?\]\]").expect("valid marker regex"));
static REVISION_HISTORY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)REVISION HISTORY.*$").expect("valid revision regex"));
static NUMBERED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,3})[.)]\s*(?:\*\*)?([^\d\s*].*?)(?:\*\*)?\s*$").expect("valid numbered regex")
});
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank regex"));
static BULLETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[•●][ \t]*").expect("valid bullet regex"));

/// Section vocabulary, in the order sections appear in the document.
static SECTIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"Eligibility\s*(?:\n|$)", "Eligibility"),
        (r"About\s+e-?Tender\s*(?:\n|$)", "About e-Tender"),
        (r"Preparations?\s+Before\s+Tendering", "Preparations Before Tendering"),
        (r"Considerations?\s+to\s+Tender", "Considerations for Tendering"),
        (r"Submitting\s+a\s+Tender\s+Bid", "Submitting a Tender Bid"),
        (r"Amend\s+Particulars", "Amending Tender Details"),
        (r"Withdrawal\s+of\s+Tender", "Withdrawal of Tender"),
        (r"Tender\s+Results", "Tender Results"),
        (r"Successful\s+Tender", "Successful Tender"),
        (r"Protection\s+Against\s+Scams", "Protection Against Scams"),
        (r"Security\s+and\s+Data\s+Protection", "Security and Data Protection"),
        (r"Contact\s+Information", "Contact Information"),
    ]
    .into_iter()
    .map(|(pattern, name)| {
        let re = Regex::new(&format!("(?i){}", pattern)).expect("valid section regex");
        (re, name)
    })
    .collect()
});

/// Normalize cleaned FAQ text. `last_updated` is written into the metadata
/// comment (`unknown` when absent).
pub fn normalize(text: &str, last_updated: Option<&str>) -> String {
    let text = INTERNAL_NOTES.replace_all(text, "");
    let text = NOTE_MARKERS.replace_all(&text, "");
    let text = REVISION_HISTORY.replace(&text, "");
    let text = format_sections(text.trim());
    let text = format_questions(&text);
    format!("{}{}", metadata_block(last_updated), text)
}

fn format_sections(text: &str) -> String {
    let mut out = format!("{}\n\n", TITLE);
    let mut rest = text;

    for (re, name) in SECTIONS.iter() {
        let Some(m) = re.find(rest) else {
            tracing::debug!(section = name, "FAQ section not found");
            continue;
        };
        let before = rest[..m.start()].trim();
        if !before.is_empty() {
            out.push_str(before);
            out.push_str("\n\n");
        }
        out.push_str("## ");
        out.push_str(name);
        out.push_str("\n\n");
        rest = &rest[m.end()..];
    }

    let tail = rest.trim();
    if !tail.is_empty() {
        out.push_str(tail);
        out.push('\n');
    }
    out
}

fn format_questions(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines() {
        if let Some(caps) = NUMBERED.captures(line) {
            lines.push(format!("\n### Q{}: {}\n", &caps[1], &caps[2]));
        } else if is_question(line) {
            lines.push(format!("\n### {}\n", line.trim_end()));
        } else {
            lines.push(line.to_string());
        }
    }
    let text = lines.join("\n");

    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    let text = BULLETS.replace_all(&text, "- ");
    text.replace("**", "")
}

fn is_question(line: &str) -> bool {
    let line = line.trim_end();
    line.ends_with('?')
        && !line.starts_with('#')
        && !line.starts_with(['•', '●', '-'])
}

fn metadata_block(last_updated: Option<&str>) -> String {
    format!(
        "<!-- Document Metadata\n\
         Type: FAQ\n\
         Purpose: Quick reference guide for e-tender process\n\
         Target Users: New hawker stall tenderers\n\
         Last Updated: {}\n\
         Topics: eligibility, e-tender process, payments, security, data protection\n\
         -->\n\n",
        last_updated.unwrap_or("unknown")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "FAQ on e-Tender\n\
        [[CC internal: do not publish]]\n\
        draft remarks\n\
        +======+\n\
        Eligibility\n\
        1. Who can tender?\n\
        Any Singapore citizen aged 21 and above.\n\
        About e-Tender\n\
        What is **e-Tender**?\n\
        • It is an online system.\n\
        Tender Results\n\
        2) When are results out?\n\
        Within 4 weeks.\n\
        Revision History\n\
        v1 initial";

    #[test]
    fn test_removes_internal_notes_and_revision_history() {
        let out = normalize(RAW, None);
        assert!(!out.contains("[["));
        assert!(!out.contains("]]"));
        assert!(!out.contains("draft remarks"));
        assert!(!out.to_uppercase().contains("REVISION HISTORY"));
        assert!(!out.contains("v1 initial"));
    }

    #[test]
    fn test_internal_notes_without_delimiter_are_removed() {
        let out = normalize("Intro\n[[CC internal: do not publish]]\nEligibility\nText", None);
        assert!(!out.contains("[["));
        assert!(!out.contains("do not publish"));
        assert!(out.contains("Intro"));
        assert!(out.contains("## Eligibility\n"));
        assert!(out.contains("Text"));
    }

    #[test]
    fn test_sections_and_questions() {
        let out = normalize(RAW, Some("Mar 2024"));
        assert!(out.contains(TITLE));
        assert!(out.contains("## Eligibility\n"));
        assert!(out.contains("## About e-Tender\n"));
        assert!(out.contains("## Tender Results\n"));
        assert!(out.contains("### Q1: Who can tender?"));
        assert!(out.contains("### Q2: When are results out?"));
        assert!(out.contains("### What is e-Tender?"));
        assert!(out.contains("- It is an online system."));
        assert!(!out.contains("**"));
        assert!(!out.contains("\n\n\n"));

        let eligibility = out.find("## Eligibility").unwrap();
        let about = out.find("## About e-Tender").unwrap();
        let results = out.find("## Tender Results").unwrap();
        assert!(eligibility < about && about < results);
    }

    #[test]
    fn test_metadata_block() {
        let out = normalize(RAW, Some("Mar 2024"));
        assert!(out.starts_with("<!-- Document Metadata\nType: FAQ\n"));
        assert!(out.contains("Last Updated: Mar 2024\n"));
        assert!(normalize(RAW, None).contains("Last Updated: unknown\n"));
    }

    #[test]
    fn test_missing_sections_are_not_an_error() {
        let out = normalize("Just a paragraph of prose.", None);
        assert!(out.contains(TITLE));
        assert!(out.contains("Just a paragraph of prose."));
        assert!(!out.contains("## "));
    }

    #[test]
    fn test_preamble_before_first_section_is_kept() {
        let out = normalize("FAQ on e-Tender\nEligibility\nText", None);
        let preamble = out.find("FAQ on e-Tender").unwrap();
        let section = out.find("## Eligibility").unwrap();
        assert!(preamble < section);
    }
}
