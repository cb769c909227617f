use std::cmp::Ordering;

use crate::common::IndexKey;

/// Total order over index keys. The tree never looks at key bytes
/// directly; all comparisons go through the comparator it was built with.
pub trait KeyComparator: Send + Sync {
    fn compare(&self, a: &IndexKey, b: &IndexKey) -> Ordering;
}

/// Interprets keys as little-endian unsigned integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerComparator;

impl KeyComparator for IntegerComparator {
    fn compare(&self, a: &IndexKey, b: &IndexKey) -> Ordering {
        a.as_u64().cmp(&b.as_u64())
    }
}

/// Lexicographic order over the raw key bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytewiseComparator;

impl KeyComparator for BytewiseComparator {
    fn compare(&self, a: &IndexKey, b: &IndexKey) -> Ordering {
        a.as_bytes().cmp(b.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_comparator() {
        let cmp = IntegerComparator;
        let a = IndexKey::from_u64(3);
        let b = IndexKey::from_u64(300);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
        assert_eq!(cmp.compare(&b, &a), Ordering::Greater);
        assert_eq!(cmp.compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_comparators_disagree_on_endianness() {
        let int_cmp = IntegerComparator;
        let byte_cmp = BytewiseComparator;
        let a = IndexKey::from_u64(256); // bytes [0, 1, 0, ...]
        let b = IndexKey::from_u64(1); // bytes [1, 0, 0, ...]
        assert_eq!(int_cmp.compare(&a, &b), Ordering::Greater);
        assert_eq!(byte_cmp.compare(&a, &b), Ordering::Less);
    }
}
