//! # Copy-on-Write Combinators
//!
//! Structural-update helpers over the persistent maps used throughout the
//! document. Every helper returns a value that shares all untouched
//! structure with its input, and returns the input itself (`ptr_eq`) when
//! the requested change turns out to be a no-op. Downstream memoization
//! depends on that no-op guarantee.

use std::hash::Hash;

use im::HashMap;

/// Replace each key in `partial`. Returns `base` untouched when every
/// value in `partial` already equals the current one.
pub fn update<K, V>(base: &HashMap<K, V>, partial: impl IntoIterator<Item = (K, V)>) -> HashMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
{
    let mut out = base.clone();
    let mut changed = false;
    for (key, value) in partial {
        match out.get(&key) {
            Some(current) if *current == value => {}
            _ => {
                out.insert(key, value);
                changed = true;
            }
        }
    }
    if changed {
        out
    } else {
        base.clone()
    }
}

/// Remove the named keys. Returns `base` untouched when none were present.
pub fn omit<'a, K, V>(
    base: &HashMap<K, V>,
    keys: impl IntoIterator<Item = &'a K>,
) -> HashMap<K, V>
where
    K: Hash + Eq + Clone + 'a,
    V: Clone,
{
    let mut out = base.clone();
    let mut changed = false;
    for key in keys {
        if out.remove(key).is_some() {
            changed = true;
        }
    }
    if changed {
        out
    } else {
        base.clone()
    }
}

/// Like [`update`] but tolerates a missing base, starting from empty.
pub fn update_or_create<K, V>(
    base: Option<&HashMap<K, V>>,
    partial: impl IntoIterator<Item = (K, V)>,
) -> HashMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
{
    match base {
        Some(base) => update(base, partial),
        None => partial.into_iter().collect(),
    }
}

/// Set `key` to `value`, or clear it when `value` is `None`. No-op
/// detection as in [`update`] / [`omit`].
pub fn set_or_clear<K, V>(base: &HashMap<K, V>, key: K, value: Option<V>) -> HashMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
{
    match value {
        Some(value) => update(base, [(key, value)]),
        None => omit(base, [&key]),
    }
}
