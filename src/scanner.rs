//! Implicit reference detection in preset code.
//!
//! Presets call each other (and start rules or send notifications) by name from
//! inside their code, without any relationship in the API. Such references are found
//! by plain substring search: a name is referenced if it occurs anywhere in the code,
//! case-sensitively and without regard for word boundaries. Names shorter than
//! [`MIN_REFERENCE_NAME_LEN`] characters are never considered, since they would match
//! almost any source file.

use crate::constants::MIN_REFERENCE_NAME_LEN;

/// Names eligible as reference candidates, in input order.
///
/// Length is measured in characters, not bytes.
///
/// ```rust
/// use rally_cli::scanner::candidate_names;
///
/// let names = candidate_names(["QC", "Ingest", "Ünïc"]);
/// assert_eq!(names, vec!["Ingest", "Ünïc"]);
/// ```
pub fn candidate_names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter(|name| name.chars().count() >= MIN_REFERENCE_NAME_LEN)
        .map(str::to_string)
        .collect()
}

/// Candidates that occur literally in `source`, in candidate order.
pub fn find_references<'c>(source: &str, candidates: &'c [String]) -> Vec<&'c str> {
    candidates
        .iter()
        .map(String::as_str)
        .filter(|candidate| !candidate.is_empty() && source.contains(candidate))
        .collect()
}
