use std::collections::HashSet;

/// Removes duplicates while keeping the first occurrence of each value.
///
/// With `ignore_case` the comparison folds ASCII case, but the kept element
/// retains its original spelling.
pub fn unique_strings(items: Vec<String>, ignore_case: bool) -> Vec<String> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| {
            let key = if ignore_case {
                item.to_ascii_lowercase()
            } else {
                item.clone()
            };
            seen.insert(key)
        })
        .collect()
}
