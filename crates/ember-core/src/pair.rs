/// Deterministic id for an unordered pair of user ids. Both directions of the
/// same pair land on the same match document, which is what makes match
/// creation race-free without any cross-client locking.
pub fn canonical_pair_id(a: &str, b: &str) -> String {
    let (lo, hi) = ordered_pair(a, b);
    format!("{lo}_{hi}")
}

/// The two ids in lexicographic order.
pub fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}
