//! Shared header text codec.
//!
//! Headers cross three boundaries in snare: the wire (hyper/reqwest header
//! maps), the persisted exchange records, and the rule mock definitions. All
//! three use one textual form, `Name: Value` per line, so the recorder, the
//! synthesizer and the forwarder can never disagree on how a header round
//! trips.

use hyper::HeaderMap;

/// Serialize a wire header map into the canonical `Name: Value` text form.
///
/// Values that are not valid UTF-8 are serialized as empty, matching how the
/// rest of the pipeline treats bodies and headers as text.
pub fn format_header_map(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name.as_str(), value.to_str().unwrap_or("")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize name/value pairs into the canonical text form.
pub fn format_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse canonical header text back into discrete name/value pairs.
///
/// Lines are split on CR/LF, the first `:` splits name from value, and both
/// sides are trimmed. Lines without a colon or with an empty name are skipped.
pub fn parse_headers(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            let (name, value) = line.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
