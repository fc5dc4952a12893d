//! Posting-list types and the pure set algebra that operates over them.
//!
//! Two distinct posting-list shapes exist on purpose: a
//! `RankedPostingList` carries term frequencies for the `lnc.ltc` scorer, a
//! `BooleanPostingList` carries only doc ids plus an optional skip map for the
//! boolean planner. The algebra below only ever touches the latter.

use std::cmp::Ordering;
use std::collections::BTreeMap;

pub type DocId = u32;

/// A sparse `position -> target position` skip map over a sorted doc-id list.
pub type SkipMap = BTreeMap<usize, usize>;

/// `term -> (doc_id, term_frequency)` pairs, sorted ascending by `doc_id`. Used
/// by the ranked scorer, which needs the frequency and never needs skip pointers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RankedPostingList {
    pub entries: Vec<(DocId, u32)>,
}

impl RankedPostingList {
    pub fn doc_ids(&self) -> Vec<DocId> {
        self.entries.iter().map(|(d, _)| *d).collect()
    }

    pub fn term_frequency(&self, doc_id: DocId) -> Option<u32> {
        self.entries
            .binary_search_by_key(&doc_id, |(d, _)| *d)
            .ok()
            .map(|i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sorted ascending doc-id list plus an optional skip map. Used by the boolean
/// planner, which never needs term frequencies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BooleanPostingList {
    pub doc_ids: Vec<DocId>,
    pub skips: SkipMap,
}

impl BooleanPostingList {
    /// Builds a posting list with no skip pointers.
    pub fn unskipped(doc_ids: Vec<DocId>) -> Self {
        BooleanPostingList { doc_ids, skips: SkipMap::new() }
    }

    /// Builds a posting list, placing skip pointers at every
    /// position that is a multiple of `floor(sqrt(n))` except the last
    /// position, pointing to `min(i + floor(sqrt(n)), n - 1)`.
    pub fn with_skips(doc_ids: Vec<DocId>) -> Self {
        let n = doc_ids.len();
        let mut skips = SkipMap::new();
        let step = (n as f64).sqrt().floor() as usize;
        if step >= 1 {
            let mut i = 0;
            while i < n.saturating_sub(1) {
                if i % step == 0 {
                    let target = std::cmp::min(i + step, n - 1);
                    skips.insert(i, target);
                }
                i += 1;
            }
        }
        BooleanPostingList { doc_ids, skips }
    }
}

/// `OR(a, b)`: duplicate-free union, linear merge.
pub fn or_merge(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut result = Vec::with_capacity(a.len() + b.len());
    let mut i = 0;
    let mut j = 0;
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                result.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                result.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result.extend_from_slice(&a[i..]);
    result.extend_from_slice(&b[j..]);
    result
}

/// `AND(a, b)`: intersection via a linear two-pointer merge, accelerated by
/// optional skip pointers on either side.
pub fn and_merge(a: &[DocId], b: &[DocId], skip_a: Option<&SkipMap>, skip_b: Option<&SkipMap>) -> Vec<DocId> {
    let mut result = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                let other = b[j];
                if let Some(skips) = skip_a {
                    while let Some(&target) = skips.get(&i) {
                        if a[target] <= other {
                            i = target;
                        } else {
                            break;
                        }
                    }
                }
                i += 1;
            }
            Ordering::Greater => {
                let other = a[i];
                if let Some(skips) = skip_b {
                    while let Some(&target) = skips.get(&j) {
                        if b[target] <= other {
                            j = target;
                        } else {
                            break;
                        }
                    }
                }
                j += 1;
            }
        }
    }
    result
}

/// `AND_NOT(a, b)`: elements of `a` absent from `b`. Skip pointers are never
/// used here.
pub fn and_not_merge(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut result = Vec::with_capacity(a.len());
    let mut i = 0;
    let mut j = 0;
    while i < a.len() {
        if j >= b.len() || a[i] < b[j] {
            result.push(a[i]);
            i += 1;
        } else if a[i] == b[j] {
            i += 1;
            j += 1;
        } else {
            j += 1;
        }
    }
    result
}

/// `NOT(a)` relative to `all_docs`: `AND_NOT(all_docs, a)`.
pub fn not_merge(all_docs: &[DocId], a: &[DocId]) -> Vec<DocId> {
    and_not_merge(all_docs, a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn set(v: &[DocId]) -> BTreeSet<DocId> {
        v.iter().copied().collect()
    }

    #[test]
    fn or_is_set_union_and_sorted() {
        let a = [1, 3, 5, 7];
        let b = [2, 3, 6];
        let result = or_merge(&a, &b);
        assert!(result.windows(2).all(|w| w[0] < w[1]));
        let expected: BTreeSet<DocId> = set(&a).union(&set(&b)).copied().collect();
        assert_eq!(set(&result), expected);
    }

    #[test]
    fn and_is_set_intersection() {
        let a = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let b = [2, 4, 6, 8, 10, 12];
        let result = and_merge(&a, &b, None, None);
        let expected: BTreeSet<DocId> = set(&a).intersection(&set(&b)).copied().collect();
        assert_eq!(set(&result), expected);
    }

    #[test]
    fn and_not_is_set_difference() {
        let a = [1, 2, 3, 4, 5];
        let b = [2, 4];
        let result = and_not_merge(&a, &b);
        let expected: BTreeSet<DocId> = set(&a).difference(&set(&b)).copied().collect();
        assert_eq!(set(&result), expected);
    }

    #[test]
    fn identities_hold() {
        let a = [1u32, 2, 5, 9];
        let all_docs = [1u32, 2, 3, 4, 5, 6, 7, 8, 9];
        assert_eq!(and_merge(&a, &all_docs, None, None), a.to_vec());
        assert_eq!(or_merge(&a, &[]), a.to_vec());
        assert_eq!(and_not_merge(&a, &a), Vec::<DocId>::new());
    }

    #[test]
    fn skip_accelerated_and_matches_linear_and() {
        let a: Vec<DocId> = (1..=100).collect();
        let b: Vec<DocId> = (1..=100).step_by(3).collect();
        let a_list = BooleanPostingList::with_skips(a.clone());
        let b_list = BooleanPostingList::with_skips(b.clone());

        let linear = and_merge(&a, &b, None, None);
        let skip_accelerated = and_merge(&a, &b, Some(&a_list.skips), Some(&b_list.skips));
        assert_eq!(linear, skip_accelerated);
    }

    #[test]
    fn skip_placement_follows_the_sqrt_step_formula() {
        let doc_ids: Vec<DocId> = (0..16).collect();
        let list = BooleanPostingList::with_skips(doc_ids.clone());
        // n = 16, step = floor(sqrt(16)) = 4
        assert_eq!(list.skips.get(&0), Some(&4));
        assert_eq!(list.skips.get(&4), Some(&8));
        assert_eq!(list.skips.get(&8), Some(&12));
        assert_eq!(list.skips.get(&12), Some(&15));
        // the last position never gets a skip pointer
        assert!(!list.skips.contains_key(&15));
    }
}
