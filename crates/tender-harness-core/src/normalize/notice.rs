//! Tender notice normalizer.
//!
//! Besides section tagging, this variant extracts the notice's annotation
//! markers into [`SpecialNotes`].
//!
//! # Marker extraction
//!
//! Markers are processed strictly in [`NoteClass::MARKERS`] order
//! (`****`, `***`, `**`, `*`, `+`, `^`). An occurrence is a maximal run of
//! the marker character of exactly the marker's length, so a `***` run is
//! never re-read as `**` or `*`. The note text runs from the marker to the
//! next occurrence of the same marker or the end of the line. Each note is
//! recorded under its class and replaced in the text by a
//! `> Note (<CLASS>): <text>` line. A marker with no text after it (a
//! footnote reference such as `01-23*`) is left in place and not recorded.
//! Once a span becomes a note line, lower-priority markers inside it are
//! part of that note's text and are not extracted again.
//!
//! Any bare `*`, `+`, or `^` in ordinary prose outside a note is read as a
//! marker too.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::models::{NoteClass, SpecialNotes};

static TENDER_DATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[Opening on ([^\]\n]*?)\][ \t]*\n[ \t]*\[Closing on ([^\]\n]*?)\]")
        .expect("valid dates regex")
});
static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\d{1,2}\s+)?([A-Za-z]+)\s+(\d{4})").expect("valid date regex")
});
static IMPORTANT_NOTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[Important Notes\]:\s*").expect("valid notes regex"));
static TRADE_TYPE_NOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(> Note \([A-Z_0-9]+\): Please choose only \[ONE\] type of trade.*)$")
        .expect("valid trade type regex")
});
static LOCATION_NOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(> Note \([A-Z_0-9]+\): Not for sale of.*? at \[[^\]\n]*\].*)$")
        .expect("valid location note regex")
});
static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]\n]+)\]").expect("valid bracket regex"));
static RESTRICTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)not allowed|not permitted|restricted").expect("valid restriction regex")
});
static ELIGIBILITY_CRITERIA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Eligibility Criteria:[ \t]*").expect("valid eligibility regex")
});
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank regex"));
const NOTE_PREFIX: &str = "> Note (";

static NOTE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^> Note \(([A-Z_0-9]+)\): (.+)$").expect("valid note line regex")
});

const MAIN_SECTIONS: [(&str, &str); 4] = [
    (
        "Tenders for Rental of [Cooked Food] Stalls",
        "\n## Cooked Food Stall Rentals\n",
    ),
    ("Tenders for Rental of [Market] Stalls", "\n## Market Stall Rentals\n"),
    ("[Details of Tender]", "\n## Tender Details\n"),
    (
        "[Important Notes for All Tenderers]",
        "\n## General Important Notes\n",
    ),
];

/// Normalize cleaned tender notice text, returning the content and the
/// extracted notes.
pub fn normalize(text: &str) -> (String, SpecialNotes) {
    let text = format_header(text);
    let (text, notes) = extract_special_notes(&text);
    let text = format_main_sections(&text);
    let text = format_rental_sections(&text);
    let text = format_location_rules(&text);
    let text = format_tender_details(&text);

    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    (text.trim_start_matches('\n').to_string(), notes)
}

/// Recover the notes of an already normalized notice from its
/// `> Note (<CLASS>): <text>` lines.
pub fn notes_in(content: &str) -> SpecialNotes {
    let mut notes = SpecialNotes::new();
    for caps in NOTE_LINE.captures_iter(content) {
        let class = NoteClass::MARKERS
            .iter()
            .map(|(class, _)| *class)
            .find(|class| class.as_str() == &caps[1]);
        if let Some(class) = class {
            notes.entry(class).or_default().push(caps[2].trim().to_string());
        }
    }
    notes
}

/// Render notes as a section that can be appended to the notice before
/// indexing, so each class is retrievable on its own.
pub fn special_notes_appendix(notes: &SpecialNotes) -> String {
    let mut out = String::new();
    if notes.values().all(Vec::is_empty) {
        return out;
    }
    out.push_str("\n\n## Special Notes and Requirements\n");
    for (class, items) in notes.iter().filter(|(_, items)| !items.is_empty()) {
        out.push_str(&format!("\n### {}\n", class));
        for item in items {
            out.push_str(&format!("- {}\n", item));
        }
    }
    out
}

fn format_header(text: &str) -> String {
    let heading_month = TENDER_DATES
        .captures(text)
        .and_then(|caps| heading_month(&caps[1]));

    let text = TENDER_DATES.replace_all(
        text,
        "\n## Tender Dates\n### Opening\n${1}\n### Closing\n${2}\n",
    );

    let heading = match heading_month {
        Some(month) => format!("# TENDER NOTICE\n## {}", month),
        None => {
            tracing::debug!("tender dates not found");
            "# TENDER NOTICE".to_string()
        }
    };
    text.replacen("TENDER NOTICE", &heading, 1)
}

/// `"1 Aug 2024"` becomes `"August 2024"`.
fn heading_month(opening: &str) -> Option<String> {
    let caps = DAY_MONTH_YEAR.captures(opening)?;
    let abbrev: String = caps[1].chars().take(3).collect();
    NaiveDate::parse_from_str(&format!("1 {} {}", abbrev, &caps[2]), "%d %b %Y")
        .ok()
        .map(|d| d.format("%B %Y").to_string())
}

fn extract_special_notes(text: &str) -> (String, SpecialNotes) {
    let mut text = IMPORTANT_NOTES
        .replace_all(text, "\n## Important Notes\n")
        .into_owned();
    let mut notes = SpecialNotes::new();

    for (class, marker) in NoteClass::MARKERS {
        let mut found = Vec::new();
        text = text
            .split('\n')
            .map(|line| {
                if line.starts_with(NOTE_PREFIX) {
                    line.to_string()
                } else {
                    rewrite_marked_line(line, marker, class, &mut found)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        if !found.is_empty() {
            notes.insert(class, found);
        }
    }

    (text, notes)
}

/// Byte ranges of maximal runs of `marker`'s character that are exactly
/// as long as `marker`.
fn marker_runs(line: &str, marker: &str) -> Vec<(usize, usize)> {
    let Some(ch) = marker.bytes().next() else {
        return Vec::new();
    };
    let bytes = line.as_bytes();
    let mut runs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != ch {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i] == ch {
            i += 1;
        }
        if i - start == marker.len() {
            runs.push((start, i));
        }
    }
    runs
}

fn rewrite_marked_line(
    line: &str,
    marker: &str,
    class: NoteClass,
    found: &mut Vec<String>,
) -> String {
    let runs = marker_runs(line, marker);
    if runs.is_empty() {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + 32);
    let mut cursor = 0;
    for (i, &(start, end)) in runs.iter().enumerate() {
        let span_end = runs.get(i + 1).map_or(line.len(), |next| next.0);
        let note = line[end..span_end].trim();
        if note.is_empty() {
            continue;
        }
        out.push_str(&line[cursor..start]);
        out.push_str(&format!("\n> Note ({}): {}\n", class, note));
        found.push(note.to_string());
        cursor = span_end;
    }
    out.push_str(&line[cursor..]);
    out
}

fn format_main_sections(text: &str) -> String {
    let mut text = text.to_string();
    for (pattern, replacement) in MAIN_SECTIONS {
        text = text.replace(pattern, replacement);
    }
    text
}

fn format_rental_sections(text: &str) -> String {
    let text = TRADE_TYPE_NOTE.replace_all(text, "### Trade Type Selection Requirements\n${1}");
    LOCATION_NOTE
        .replace_all(&text, "### Location-Specific Restrictions\n${1}")
        .into_owned()
}

/// Bracketed names followed on the same line by restriction language
/// become `#### Restrictions for <Location>` headers.
fn format_location_rules(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            BRACKETED
                .replace_all(line, |caps: &Captures| {
                    let end = caps.get(0).map_or(line.len(), |m| m.end());
                    if RESTRICTION.is_match(&line[end..]) {
                        format!("\n#### Restrictions for {}\n", &caps[1])
                    } else {
                        caps[0].to_string()
                    }
                })
                .into_owned()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_tender_details(text: &str) -> String {
    let text = ELIGIBILITY_CRITERIA.replace_all(text, "\n### Eligibility Requirements\n");
    text.replace(
        "Tender bids shall be submitted",
        "\n### Submission Requirements\nTender bids shall be submitted",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tender_dates_block() {
        let (out, _) = normalize("[Opening on 1 Aug 2024]\n[Closing on 31 Aug 2024]");
        assert!(out.contains("## Tender Dates\n### Opening\n1 Aug 2024\n### Closing\n31 Aug 2024"));
    }

    #[test]
    fn test_title_heading_uses_opening_month() {
        let (out, _) = normalize("TENDER NOTICE\n[Opening on 1 Aug 2024]\n[Closing on 31 Aug 2024]");
        assert!(out.starts_with("# TENDER NOTICE\n## August 2024\n"));

        let (out, _) = normalize("TENDER NOTICE\nNo dates yet");
        assert!(out.starts_with("# TENDER NOTICE\nNo dates yet"));
    }

    #[test]
    fn test_marker_priority_does_not_double_count() {
        let (out, notes) = normalize("**** Top priority\n*** Third level\n** Second level\n* First level");
        assert_eq!(notes[&NoteClass::SpecialNote4], vec!["Top priority"]);
        assert_eq!(notes[&NoteClass::SpecialNote3], vec!["Third level"]);
        assert_eq!(notes[&NoteClass::SpecialNote2], vec!["Second level"]);
        assert_eq!(notes[&NoteClass::SpecialNote1], vec!["First level"]);
        assert!(out.contains("> Note (SPECIAL_NOTE_4): Top priority"));
        assert!(out.contains("> Note (SPECIAL_NOTE_1): First level"));
        assert!(!out.contains('*'));
    }

    #[test]
    fn test_nested_markers_stay_in_outer_note() {
        let (out, notes) = normalize("** Stalls 01-10 + 01-11 must be halal * certified");
        assert_eq!(
            notes[&NoteClass::SpecialNote2],
            vec!["Stalls 01-10 + 01-11 must be halal * certified"]
        );
        assert!(!notes.contains_key(&NoteClass::HalalNote));
        assert!(!notes.contains_key(&NoteClass::SpecialNote1));
        assert!(out.contains("> Note (SPECIAL_NOTE_2): Stalls 01-10 + 01-11 must be halal * certified"));
        assert_eq!(out.matches(NOTE_PREFIX).count(), 1);
        assert_eq!(notes_in(&out), notes);
    }

    #[test]
    fn test_halal_and_indian_cuisine_notes_in_order() {
        let (out, notes) = normalize(
            "Stall 01-10\n+ Halal certification required\nStall 01-11\n+ Halal food only\n^ Indian cuisine only",
        );
        assert_eq!(
            notes[&NoteClass::HalalNote],
            vec!["Halal certification required", "Halal food only"]
        );
        assert_eq!(notes[&NoteClass::IndianCuisineNote], vec!["Indian cuisine only"]);
        assert!(out.contains("> Note (INDIAN_CUISINE_NOTE): Indian cuisine only"));
    }

    #[test]
    fn test_footnote_reference_marker_is_kept() {
        let (out, notes) = normalize("Stall 01-23*\n* Not for sale of pork");
        assert!(out.contains("Stall 01-23*"));
        assert_eq!(notes[&NoteClass::SpecialNote1], vec!["Not for sale of pork"]);
    }

    #[test]
    fn test_no_markers_yields_empty_notes() {
        let (_, notes) = normalize("Plain notice text");
        assert!(notes.is_empty());
    }

    #[test]
    fn test_rental_and_important_sections() {
        let raw = "Tenders for Rental of [Cooked Food] Stalls\n\
                   * Please choose only [ONE] type of trade of sale\n\
                   Tenders for Rental of [Market] Stalls\n\
                   * Not for sale of beef at [Bukit Timah Market]\n\
                   [Important Notes]: read carefully\n\
                   [Important Notes for All Tenderers]";
        let (out, _) = normalize(raw);
        assert!(out.contains("## Cooked Food Stall Rentals"));
        assert!(out.contains("## Market Stall Rentals"));
        assert!(out.contains(
            "### Trade Type Selection Requirements\n> Note (SPECIAL_NOTE_1): Please choose only [ONE] type of trade of sale"
        ));
        assert!(out.contains(
            "### Location-Specific Restrictions\n> Note (SPECIAL_NOTE_1): Not for sale of beef at [Bukit Timah Market]"
        ));
        assert!(out.contains("## Important Notes\nread carefully"));
        assert!(out.contains("## General Important Notes"));
    }

    #[test]
    fn test_location_restrictions() {
        let (out, _) = normalize("[Geylang Serai] Sale of alcohol is not allowed\n[Chinatown] open to all");
        assert!(out.contains("#### Restrictions for Geylang Serai\n Sale of alcohol is not allowed"));
        assert!(out.contains("[Chinatown] open to all"));
    }

    #[test]
    fn test_tender_details_headers() {
        let (out, _) = normalize("[Details of Tender]\nEligibility Criteria: citizens only\nTender bids shall be submitted online");
        assert!(out.contains("## Tender Details"));
        assert!(out.contains("### Eligibility Requirements\ncitizens only"));
        assert!(out.contains("### Submission Requirements\nTender bids shall be submitted online"));
    }

    #[test]
    fn test_notes_recovered_from_normalized_text() {
        let (out, notes) = normalize("Stall 01-23 ** Halal certification required\nStall 02-11 ^ Indian cuisine only");
        assert_eq!(notes_in(&out), notes);
    }

    #[test]
    fn test_special_notes_appendix() {
        let mut notes = SpecialNotes::new();
        notes.insert(NoteClass::HalalNote, vec!["Halal food only".to_string()]);
        notes.insert(NoteClass::SpecialNote1, Vec::new());
        let appendix = special_notes_appendix(&notes);
        assert_eq!(
            appendix,
            "\n\n## Special Notes and Requirements\n\n### HALAL_NOTE\n- Halal food only\n"
        );
        assert!(special_notes_appendix(&SpecialNotes::new()).is_empty());
    }
}
