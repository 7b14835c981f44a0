//! Minimal representation of (position, ref, alt) triples.
//!
//! Trims shared allele padding so that equivalent indel spellings map to
//! the same identity, following the usual minimal-representation rules:
//! shared suffix first, then shared prefix (shifting the position).

/// Reduce a `(pos, ref, alt)` triple to its minimal canonical form.
///
/// SNVs are returned unchanged. The function is idempotent.
pub fn minimal_representation(pos: u64, reference: &str, alternative: &str) -> (u64, String, String) {
    if reference.len() == 1 && alternative.len() == 1 {
        return (pos, reference.to_string(), alternative.to_string());
    }

    let mut pos = pos;
    let mut reference: Vec<char> = reference.chars().collect();
    let mut alternative: Vec<char> = alternative.chars().collect();

    while reference.len() > 1
        && alternative.len() > 1
        && reference.last() == alternative.last()
    {
        reference.pop();
        alternative.pop();
    }
    while reference.len() > 1
        && alternative.len() > 1
        && reference.first() == alternative.first()
    {
        reference.remove(0);
        alternative.remove(0);
        pos += 1;
    }

    (
        pos,
        reference.into_iter().collect(),
        alternative.into_iter().collect(),
    )
}
