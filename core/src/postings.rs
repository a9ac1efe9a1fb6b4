//! Query operations over decoded posting lists. Everything here is pure: the
//! inputs are borrowed, never mutated, and no I/O happens.

use std::cmp::Ordering;

use crate::{DocId, Position, Posting};

/// One proximity hit: `left` is a position of the first term, `right` of the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProximityMatch {
    pub doc_id: DocId,
    pub left: Position,
    pub right: Position,
}

/// Documents present in both lists, ascending.
pub fn intersect(p1: &[Posting], p2: &[Posting]) -> Vec<DocId> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < p1.len() && j < p2.len() {
        match p1[i].doc_id.cmp(&p2[j].doc_id) {
            Ordering::Equal => {
                out.push(p1[i].doc_id);
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    out
}

/// Documents present in every list. Lists are visited shortest first so the
/// running candidate set shrinks as fast as possible.
pub fn intersect_many(lists: &[&[Posting]]) -> Vec<DocId> {
    let mut ordered: Vec<&[Posting]> = lists.to_vec();
    ordered.sort_by_key(|list| list.len());
    let mut iter = ordered.into_iter();
    let mut candidates: Vec<DocId> = match iter.next() {
        Some(first) => first.iter().map(|p| p.doc_id).collect(),
        None => return Vec::new(),
    };
    for list in iter {
        if candidates.is_empty() {
            break;
        }
        candidates = retain_present(&candidates, list);
    }
    candidates
}

fn retain_present(ids: &[DocId], list: &[Posting]) -> Vec<DocId> {
    let mut out = Vec::with_capacity(ids.len().min(list.len()));
    let (mut i, mut j) = (0, 0);
    while i < ids.len() && j < list.len() {
        match ids[i].cmp(&list[j].doc_id) {
            Ordering::Equal => {
                out.push(ids[i]);
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    out
}

/// Every `(doc, a, b)` with `a` from `p1`, `b` from `p2` and `|a - b| <= k`,
/// grouped by document, then ordered by `a`, then by `b`.
pub fn positional_intersect(p1: &[Posting], p2: &[Posting], k: u32) -> Vec<ProximityMatch> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < p1.len() && j < p2.len() {
        match p1[i].doc_id.cmp(&p2[j].doc_id) {
            Ordering::Equal => {
                window_matches(p1[i].doc_id, &p1[i].positions, &p2[j].positions, k, &mut out);
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    out
}

// `lo..hi` is the slice of `right` within [a - k, a + k]. Both bounds only move
// forward because `left` is ascending.
fn window_matches(doc_id: DocId, left: &[Position], right: &[Position], k: u32, out: &mut Vec<ProximityMatch>) {
    let (mut lo, mut hi) = (0, 0);
    for &a in left {
        let min = a.saturating_sub(k);
        let max = a.saturating_add(k);
        while lo < right.len() && right[lo] < min {
            lo += 1;
        }
        if hi < lo {
            hi = lo;
        }
        while hi < right.len() && right[hi] <= max {
            hi += 1;
        }
        out.extend(right[lo..hi].iter().map(|&b| ProximityMatch { doc_id, left: a, right: b }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(doc_id: DocId, positions: &[Position]) -> Posting {
        Posting { doc_id, frequency: positions.len() as u32, positions: positions.to_vec() }
    }

    fn hit(doc_id: DocId, left: Position, right: Position) -> ProximityMatch {
        ProximityMatch { doc_id, left, right }
    }

    // Exhaustive reference used to check the windowed version.
    fn cross_product(p1: &[Posting], p2: &[Posting], k: u32) -> Vec<ProximityMatch> {
        let mut out = Vec::new();
        for a in p1 {
            for b in p2.iter().filter(|b| b.doc_id == a.doc_id) {
                for &x in &a.positions {
                    for &y in &b.positions {
                        if x.abs_diff(y) <= k {
                            out.push(hit(a.doc_id, x, y));
                        }
                    }
                }
            }
        }
        out
    }

    fn sample_lists() -> (Vec<Posting>, Vec<Posting>) {
        let p1 = vec![posting(1, &[1, 3, 6, 10]), posting(3, &[0]), posting(5, &[2, 40]), posting(8, &[7])];
        let p2 = vec![posting(1, &[2, 5, 8, 15]), posting(2, &[1]), posting(5, &[1, 3, 38, 44]), posting(9, &[0])];
        (p1, p2)
    }

    #[test]
    fn intersect_emits_common_documents_in_order() {
        let (p1, p2) = sample_lists();
        assert_eq!(intersect(&p1, &p2), vec![1, 5]);
    }

    #[test]
    fn intersect_is_symmetric_and_idempotent() {
        let (p1, p2) = sample_lists();
        assert_eq!(intersect(&p1, &p2), intersect(&p2, &p1));
        assert_eq!(intersect(&p1, &p1), vec![1, 3, 5, 8]);
    }

    #[test]
    fn empty_inputs_give_empty_results() {
        let (p1, _) = sample_lists();
        assert!(intersect(&p1, &[]).is_empty());
        assert!(intersect(&[], &p1).is_empty());
        assert!(positional_intersect(&p1, &[], 3).is_empty());
        assert!(intersect_many(&[]).is_empty());
    }

    #[test]
    fn intersect_many_matches_pairwise() {
        let (p1, p2) = sample_lists();
        let p3 = vec![posting(0, &[0]), posting(5, &[9]), posting(8, &[1])];
        assert_eq!(intersect_many(&[&p1, &p2, &p3]), vec![5]);
        assert_eq!(intersect_many(&[&p1]), vec![1, 3, 5, 8]);
        assert_eq!(intersect_many(&[&p1, &p2]), intersect(&p1, &p2));
    }

    #[test]
    fn positional_window_of_one() {
        let (p1, p2) = sample_lists();
        assert_eq!(
            positional_intersect(&p1, &p2, 1),
            vec![hit(1, 1, 2), hit(1, 3, 2), hit(1, 6, 5), hit(5, 2, 1), hit(5, 2, 3)]
        );
    }

    #[test]
    fn zero_window_means_same_position() {
        let p1 = vec![posting(0, &[1, 4, 7])];
        let p2 = vec![posting(0, &[2, 4, 8])];
        assert_eq!(positional_intersect(&p1, &p2, 0), vec![hit(0, 4, 4)]);
    }

    #[test]
    fn windowed_scan_agrees_with_cross_product() {
        let (p1, p2) = sample_lists();
        for k in 0..12 {
            assert_eq!(positional_intersect(&p1, &p2, k), cross_product(&p1, &p2, k), "k = {k}");
            assert_eq!(positional_intersect(&p2, &p1, k), cross_product(&p2, &p1, k), "k = {k}");
        }
    }

    #[test]
    fn larger_windows_only_add_matches() {
        let (p1, p2) = sample_lists();
        for k in 0..10 {
            let narrow = positional_intersect(&p1, &p2, k);
            let wide = positional_intersect(&p1, &p2, k + 1);
            assert!(narrow.iter().all(|m| wide.contains(m)), "k = {k}");
        }
    }

    #[test]
    fn huge_window_does_not_overflow() {
        let p1 = vec![posting(0, &[0, u32::MAX - 1])];
        let p2 = vec![posting(0, &[u32::MAX])];
        assert_eq!(positional_intersect(&p1, &p2, u32::MAX).len(), 2);
    }
}
