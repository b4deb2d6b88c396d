use super::KeyValue;

/// Compares two entries by key and encoded value; indexes are ignored.
pub fn are_equal(
    left: &KeyValue,
    right: &KeyValue,
) -> bool {
    left.key == right.key && left.value == right.value
}

/// Compares two entry lists regardless of their order.
///
/// Both sides are sorted by key on borrowed copies; the inputs are untouched.
pub fn are_all_equal(
    left: &[KeyValue],
    right: &[KeyValue],
) -> bool {
    if left.len() != right.len() {
        return false;
    }

    let mut left: Vec<&KeyValue> = left.iter().collect();
    let mut right: Vec<&KeyValue> = right.iter().collect();
    left.sort_by(|a, b| a.key.cmp(&b.key));
    right.sort_by(|a, b| a.key.cmp(&b.key));

    left.iter().zip(right.iter()).all(|(l, r)| are_equal(l, r))
}

/// Highest modify index among `entries`, the cursor for the next prefix query.
pub fn max_modify_index(entries: &[KeyValue]) -> Option<u64> {
    entries.iter().map(|kv| kv.modify_index).max()
}
