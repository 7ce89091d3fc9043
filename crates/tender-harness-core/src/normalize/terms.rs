//! Terms & Conditions normalizer.
//!
//! Rewrites the title/version banner into a header block, tags the known
//! section names as whole-line headers at their configured depth, turns
//! clause numbering into `###`/`####`/`#####` headers, and places a
//! metadata comment naming the clause range before each top-level section.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

static TITLE_BANNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"TERMS AND CONDITIONS OF TENDER\s*\n(Ver \d+: [A-Za-z]+ \d{4})")
        .expect("valid banner regex")
});
static CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(\d+)\.\s+").expect("valid clause regex"));
static SUBCLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(\d+\.\d+)\s+").expect("valid subclause regex"));
static SUBSUBCLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(\d+\.\d+\.\d+)\s+").expect("valid subsubclause regex"));

/// Section names and the heading depth each is emitted at.
pub const SECTION_HEADERS: [(&str, usize); 9] = [
    ("Eligibility", 2),
    ("Tendering", 2),
    ("Market Stall", 2),
    ("Cooked Food Stall", 2),
    ("Successful Tenderer", 2),
    ("Anti-Collusion", 2),
    ("Reporting of Anti-competitive Conduct", 3),
    ("Warranty", 3),
    ("Disclosure of Prior Anti-competitive Conduct", 3),
];

/// Clause ranges covered by each top-level section.
pub const SECTION_DESCRIPTIONS: [(&str, &str); 6] = [
    ("Eligibility", "Clauses 2-6: Requirements for tender submission"),
    ("Tendering", "Clauses 7-17: Process and rules for submitting tenders"),
    ("Market Stall", "Clause 18: Specific rules for market stalls"),
    ("Cooked Food Stall", "Clauses 19-23: Specific rules for cooked food stalls"),
    (
        "Successful Tenderer",
        "Clauses 24-40: Obligations and requirements for successful tenderers",
    ),
    ("Anti-Collusion", "Clause 41: Rules preventing anti-competitive behavior"),
];

static HEADER_LINES: Lazy<Vec<(Regex, String)>> = Lazy::new(|| {
    SECTION_HEADERS
        .iter()
        .map(|(name, level)| {
            let re = Regex::new(&format!(r"(?m)^{}[ \t]*$", regex::escape(name)))
                .expect("valid header regex");
            (re, format!("\n{} {}\n", "#".repeat(*level), name))
        })
        .collect()
});

static SECTION_ANCHORS: Lazy<Vec<(Regex, String)>> = Lazy::new(|| {
    SECTION_DESCRIPTIONS
        .iter()
        .map(|(name, description)| {
            let re = Regex::new(&format!(r"(?m)^## {}$", regex::escape(name)))
                .expect("valid anchor regex");
            let replacement = format!(
                "\n<!-- Section Metadata\nType: Terms and Conditions\nSection: {}\nDescription: {}\n-->\n\n## {}",
                name, description, name
            );
            (re, replacement)
        })
        .collect()
});

/// Normalize cleaned Terms & Conditions text.
pub fn normalize(text: &str) -> String {
    let text = format_title(text);
    let text = format_section_headers(&text);
    let text = format_clauses(&text);
    add_section_metadata(&text)
}

fn format_title(text: &str) -> String {
    if !TITLE_BANNER.is_match(text) {
        tracing::debug!("terms and conditions banner not found");
    }
    TITLE_BANNER
        .replacen(
            text,
            1,
            "\n# TERMS AND CONDITIONS OF TENDER\n## Version Information\n${1}\n\n\
             ## Document Overview\n\
             This document outlines the terms and conditions for hawker stall tenders.\n",
        )
        .into_owned()
}

fn format_section_headers(text: &str) -> String {
    let mut text = text.to_string();
    for (re, header) in HEADER_LINES.iter() {
        text = re.replace_all(&text, NoExpand(header)).into_owned();
    }
    text
}

fn format_clauses(text: &str) -> String {
    let text = CLAUSE.replace_all(text, "\n### Clause ${1}\n");
    let text = SUBCLAUSE.replace_all(&text, "#### ${1}\n");
    SUBSUBCLAUSE.replace_all(&text, "##### ${1}\n").into_owned()
}

fn add_section_metadata(text: &str) -> String {
    let mut text = text.to_string();
    for (re, replacement) in SECTION_ANCHORS.iter() {
        text = re.replace_all(&text, NoExpand(replacement)).into_owned();
    }
    text
}
