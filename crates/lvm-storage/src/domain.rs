//! Key range helpers
//!
//! A domain is the half-open byte-lexicographic range `[start, end)`. Empty
//! bounds are open: an empty `start` admits every key from the lowest, an empty
//! `end` admits every key up to and including the highest.

use std::cmp::Ordering;

/// Whether `key` falls inside `[start, end)`
pub fn key_in_domain(key: &[u8], start: &[u8], end: &[u8]) -> bool {
    key >= start && (end.is_empty() || key < end)
}

/// Whether `[start, end)` cannot contain any key
pub fn is_empty_domain(start: &[u8], end: &[u8]) -> bool {
    !end.is_empty() && start.cmp(end) != Ordering::Less
}

/// Select the keys of `sorted` (ascending) lying in `[start, end)`, optionally reversed
pub fn select_in_domain(sorted: &[Vec<u8>], start: &[u8], end: &[u8], reverse: bool) -> Vec<Vec<u8>> {
    if is_empty_domain(start, end) {
        return Vec::new();
    }
    let lo = sorted.partition_point(|k| k.as_slice() < start);
    let hi = if end.is_empty() {
        sorted.len()
    } else {
        sorted.partition_point(|k| k.as_slice() < end)
    };
    let mut keys = sorted[lo..hi].to_vec();
    if reverse {
        keys.reverse();
    }
    keys
}

/// Smallest key greater than every key starting with `prefix`.
///
/// Returns an empty (open) end when no such key exists, i.e. the prefix is
/// empty or all `0xff`.
pub fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(raw: &[&[u8]]) -> Vec<Vec<u8>> {
        raw.iter().map(|k| k.to_vec()).collect()
    }

    #[test]
    fn test_key_in_domain_bounds() {
        assert!(key_in_domain(b"b", b"a", b"c"));
        assert!(key_in_domain(b"a", b"a", b"c"));
        assert!(!key_in_domain(b"c", b"a", b"c"));
        assert!(key_in_domain(b"zzz", b"a", b""));
        assert!(key_in_domain(b"", b"", b"a"));
    }

    #[test]
    fn test_empty_domain() {
        assert!(is_empty_domain(b"a", b"a"));
        assert!(is_empty_domain(b"b", b"a"));
        assert!(!is_empty_domain(b"a", b"b"));
        assert!(!is_empty_domain(b"", b""));
        assert!(!is_empty_domain(b"z", b""));
    }

    #[test]
    fn test_select_forward_and_reverse() {
        let sorted = keys(&[b"k1", b"k2", b"k3"]);
        assert_eq!(select_in_domain(&sorted, b"k1", b"k3", false), keys(&[b"k1", b"k2"]));
        assert_eq!(select_in_domain(&sorted, b"k1", b"k3", true), keys(&[b"k2", b"k1"]));
        assert_eq!(select_in_domain(&sorted, b"", b"", false), sorted);
        assert!(select_in_domain(&sorted, b"k2", b"k2", false).is_empty());
    }

    #[test]
    fn test_prefix_end() {
        assert_eq!(prefix_end(b"s\x01"), b"s\x02".to_vec());
        assert_eq!(prefix_end(&[0x01, 0xff]), vec![0x02]);
        assert!(prefix_end(&[0xff, 0xff]).is_empty());
        assert!(prefix_end(&[]).is_empty());
        assert!(key_in_domain(b"s\x01zzz", b"s\x01", &prefix_end(b"s\x01")));
        assert!(!key_in_domain(b"s\x02", b"s\x01", &prefix_end(b"s\x01")));
    }

    #[test]
    fn test_prefix_keys_sort_first() {
        let sorted = keys(&[b"a", b"ab", b"b"]);
        assert_eq!(select_in_domain(&sorted, b"a", b"ab", false), keys(&[b"a"]));
    }
}
