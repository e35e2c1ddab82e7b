//! Category sets for categorical splits.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Compact bitset of category values (up to 64 categories inline).
///
/// For a categorical split this is the set of categories routed left.
/// Categories beyond 63 use heap-allocated overflow words.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CatBitset {
    /// Inline bits for categories 0..63.
    bits: u64,
    /// Heap storage for categories 64+.
    overflow: Option<Box<[u64]>>,
}

impl CatBitset {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn singleton(cat: u32) -> Self {
        let mut s = Self::empty();
        s.insert(cat);
        s
    }

    /// Build a set from the bit positions of a subset code: category `c` is a
    /// member iff bit `c` of `code` is set.
    pub fn from_subset_code(code: u64) -> Self {
        Self { bits: code, overflow: None }
    }

    #[inline]
    pub fn contains(&self, cat: u32) -> bool {
        if cat < 64 {
            (self.bits >> cat) & 1 != 0
        } else {
            let (word, bit) = overflow_position(cat);
            self.overflow
                .as_ref()
                .and_then(|o| o.get(word))
                .is_some_and(|&w| (w >> bit) & 1 != 0)
        }
    }

    pub fn insert(&mut self, cat: u32) {
        if cat < 64 {
            self.bits |= 1u64 << cat;
            return;
        }
        let (word, bit) = overflow_position(cat);
        let overflow = self.overflow.get_or_insert_with(|| vec![0u64; word + 1].into_boxed_slice());
        if word >= overflow.len() {
            let mut grown = vec![0u64; word + 1];
            grown[..overflow.len()].copy_from_slice(overflow);
            *overflow = grown.into_boxed_slice();
        }
        overflow[word] |= 1u64 << bit;
    }

    /// Number of categories in the set.
    pub fn len(&self) -> usize {
        let inline = self.bits.count_ones() as usize;
        let spilled: usize = self
            .overflow
            .iter()
            .flat_map(|o| o.iter())
            .map(|w| w.count_ones() as usize)
            .sum();
        inline + spilled
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let inline = (0..64u32).filter(move |&c| (self.bits >> c) & 1 != 0);
        let spilled = self.overflow.iter().flat_map(|o| o.iter().enumerate()).flat_map(|(w, &word)| {
            (0..64u32)
                .filter(move |&b| (word >> b) & 1 != 0)
                .map(move |b| 64 + (w as u32) * 64 + b)
        });
        inline.chain(spilled)
    }
}

#[inline]
fn overflow_position(cat: u32) -> (usize, u32) {
    (((cat - 64) / 64) as usize, (cat - 64) % 64)
}

impl FromIterator<u32> for CatBitset {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut set = Self::empty();
        for cat in iter {
            set.insert(cat);
        }
        set
    }
}

impl PartialEq for CatBitset {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for CatBitset {}

impl fmt::Debug for CatBitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline() {
        let mut bs = CatBitset::empty();
        assert!(bs.is_empty());

        bs.insert(0);
        bs.insert(5);
        bs.insert(63);

        assert!(bs.contains(0));
        assert!(bs.contains(5));
        assert!(bs.contains(63));
        assert!(!bs.contains(1));
        assert!(!bs.contains(64));
        assert_eq!(bs.len(), 3);
        assert_eq!(bs.iter().collect::<Vec<_>>(), vec![0, 5, 63]);
    }

    #[test]
    fn test_overflow() {
        let bs: CatBitset = [200, 3, 100].into_iter().collect();
        assert!(bs.contains(100));
        assert!(bs.contains(200));
        assert!(!bs.contains(99));
        assert_eq!(bs.len(), 3);
        assert_eq!(bs.iter().collect::<Vec<_>>(), vec![3, 100, 200]);
    }

    #[test]
    fn test_subset_code() {
        // 13 = 0b01101
        let bs = CatBitset::from_subset_code(13);
        assert_eq!(bs.iter().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn test_equality_ignores_storage() {
        let a = CatBitset::singleton(1);
        let mut b = CatBitset::singleton(1);
        b.insert(130);
        assert_ne!(a, b);
        let c: CatBitset = [1].into_iter().collect();
        assert_eq!(a, c);
    }
}
