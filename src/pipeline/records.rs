//! Record extraction: turn a noisy OCR transcript into table rows.
//!
//! Rolls print one person per line in the shape
//!
//! ```text
//! <name ...> <age> वर्ष / <पुरुष|महिला> <rest of line>
//! ```
//!
//! and a single regular expression picks those lines out of the transcript.
//! The heuristic is brittle by nature: the name group is "anything up to the
//! age that is not a digit, dot, or newline", and the caste column is the
//! last word of that name. Both behaviours are kept exactly as the rolls were
//! processed before, so spreadsheets stay comparable across runs.
//!
//! Two quirks follow from the pattern and are left alone:
//!
//! - `\s` also matches newlines, so when a line ends right after the sex
//!   token the next line is taken as the remainder.
//! - `\d` is Unicode-aware, so an age printed in any script's decimal digits
//!   (Devanagari, Bengali, full-width, ...) matches and is converted.

use crate::output::{PersonRecord, Sex};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, warn};

/// The record pattern. Groups: name, age, sex, remainder.
pub const RECORD_PATTERN: &str =
    r"([^\d\.\n]+?)\s+(\d+)\s+वर्ष\s+/\s+(पुरुष|महिला)\s+([^\n]+)";

static RE_RECORD: Lazy<Regex> = Lazy::new(|| Regex::new(RECORD_PATTERN).unwrap());

/// Extract every record in `text`, left to right, without overlap.
///
/// Text with no matching line yields an empty vector.
pub fn extract_records(text: &str) -> Vec<PersonRecord> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for caps in RE_RECORD.captures_iter(text) {
        match record_from_captures(&caps) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Skipped {} matches with an unreadable age", skipped);
    }
    debug!("Record pattern matched {} rows", records.len());
    records
}

fn record_from_captures(caps: &Captures<'_>) -> Option<PersonRecord> {
    let raw_age = &caps[2];
    let Some(age) = parse_age(raw_age) else {
        debug!("Unreadable age {:?} in {:?}", raw_age, &caps[0]);
        return None;
    };

    let name = caps[1].trim().to_string();
    // The alternation only admits the two literal tokens.
    let sex = Sex::from_token(&caps[3])?;

    Some(PersonRecord {
        caste: caste_from_name(&name),
        name,
        age,
        sex,
        remainder: caps[4].trim().to_string(),
    })
}

/// Code point of digit zero for every Unicode `Nd` run, sorted. Each run is
/// ten consecutive code points, zero through nine.
const DIGIT_ZEROS: &[u32] = &[
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66,
    0x0CE6, 0x0D66, 0x0DE6, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946,
    0x19D0, 0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0,
    0xA9F0, 0xAA50, 0xABF0, 0xFF10, 0x104A0, 0x10D30, 0x11066, 0x110F0, 0x11136, 0x111D0,
    0x112F0, 0x11450, 0x114D0, 0x11650, 0x116C0, 0x11730, 0x118E0, 0x11950, 0x11C50, 0x11D50,
    0x11DA0, 0x11F50, 0x16A60, 0x16AC0, 0x16B50, 0x1D7CE, 0x1D7D8, 0x1D7E2, 0x1D7EC, 0x1D7F6,
    0x1E140, 0x1E2F0, 0x1E4F0, 0x1E950, 0x1FBF0,
];

/// Convert a string of decimal digits, in any script, to an integer.
///
/// Scripts may be mixed within one number. Returns `None` for empty input,
/// non-digits, or values above `u32::MAX`.
pub fn parse_age(digits: &str) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0u32, |acc, c| {
        let d = digit_value(c)?;
        acc.checked_mul(10)?.checked_add(d)
    })
}

fn digit_value(c: char) -> Option<u32> {
    let cp = c as u32;
    let run = DIGIT_ZEROS.partition_point(|&zero| zero <= cp).checked_sub(1)?;
    let value = cp - DIGIT_ZEROS[run];
    (value < 10).then_some(value)
}

/// Last whitespace-delimited token of `name`, or `""` for a blank name.
pub fn caste_from_name(name: &str) -> String {
    name.split_whitespace().last().unwrap_or_default().to_string()
}
