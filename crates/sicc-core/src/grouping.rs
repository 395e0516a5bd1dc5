//! Grouping utility used to build every `*_by_parent` index of the customer tree.

use std::collections::HashMap;
use std::hash::Hash;

/// Group `items` by the key returned from `key_fn`, preserving input order within each group.
///
/// Items whose key is `None` are dropped rather than grouped under a sentinel.
pub fn group_by<I, K, F>(items: I, mut key_fn: F) -> HashMap<K, Vec<I::Item>>
where
    I: IntoIterator,
    K: Eq + Hash,
    F: FnMut(&I::Item) -> Option<K>,
{
    let mut groups: HashMap<K, Vec<I::Item>> = HashMap::new();
    for item in items {
        if let Some(key) = key_fn(&item) {
            groups.entry(key).or_default().push(item);
        }
    }
    groups
}
