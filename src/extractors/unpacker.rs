//! Decoder for `eval(function(p,a,c,k,e,d){...})` packed scripts
//!
//! The packer replaces every identifier in a script with its index in a
//! keyword table, written in base `a` (at most 62). Unpacking maps each word
//! of the payload back through the table.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Marker that opens a packed script
pub const PACKED_MARKER: &str = "eval(function(p,a,c,k,e,d)";

fn packed_args() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\}\('(.*?)',\s*(\d+),\s*(\d+),\s*'(.*?)'\.split\('\|'\)")
            .expect("valid packer regex")
    })
}

fn word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w+\b").expect("valid word regex"))
}

/// Value of one digit in the packer's alphabet `0-9a-zA-Z`
fn digit_value(c: char) -> Option<u32> {
    match c {
        '0'..='9' => Some(c as u32 - '0' as u32),
        'a'..='z' => Some(c as u32 - 'a' as u32 + 10),
        'A'..='Z' => Some(c as u32 - 'A' as u32 + 36),
        _ => None,
    }
}

/// Decode a word written in `base`; `None` if it is not a valid number
fn unbase(word: &str, base: u32) -> Option<usize> {
    word.chars().try_fold(0usize, |acc, c| {
        let digit = digit_value(c).filter(|d| *d < base)?;
        acc.checked_mul(base as usize)?.checked_add(digit as usize)
    })
}

/// Unpack the first packed script found in `source`
///
/// Returns `None` when there is no packed script or its arguments are malformed.
pub fn unpack(source: &str) -> Option<String> {
    let start = source.find(PACKED_MARKER)?;
    unpack_at(&source[start..])
}

/// Every packed script in `source` that unpacks cleanly, in page order
pub fn unpack_all(source: &str) -> Vec<String> {
    source
        .match_indices(PACKED_MARKER)
        .filter_map(|(start, _)| unpack_at(&source[start..]))
        .collect()
}

/// Unpack the script that opens at the start of `script`
fn unpack_at(script: &str) -> Option<String> {
    let caps = packed_args().captures(script)?;

    let payload = caps[1].replace("\\'", "'").replace("\\\\", "\\");
    let base: u32 = caps[2].parse().ok().filter(|b| (2..=62).contains(b))?;
    let count: usize = caps[3].parse().ok()?;
    let keywords: Vec<&str> = caps.get(4)?.as_str().split('|').collect();

    let unpacked = word().replace_all(&payload, |c: &Captures| {
        let token = &c[0];
        unbase(token, base)
            .filter(|idx| *idx < count)
            .and_then(|idx| keywords.get(idx))
            .filter(|k| !k.is_empty())
            .map(|k| k.to_string())
            .unwrap_or_else(|| token.to_string())
    });
    Some(unpacked.into_owned())
}
