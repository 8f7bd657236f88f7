//! Class-aware label set comparison.

use std::collections::BTreeMap;

use crate::label::{iou, BoundingBox};

/// Decide whether two label sets describe the same content.
///
/// With `labels_limit > 0` only the first `labels_limit` boxes of each set
/// (in file order) take part. The sets must then have the same length, be
/// non-empty, and carry the same multiset of class ids. Within each class,
/// every box of `a` (in order) claims the unused box of `b` with the highest
/// IoU, the lowest index winning ties, and that IoU must reach
/// `iou_threshold`.
///
/// The assignment is greedy and one-sided, not an optimal bipartite
/// matching: an early box of `a` can claim the box a later one needed.
/// Grouping results depend on this exact order.
///
/// Two empty sets are never similar, so unlabeled images do not cluster.
pub fn labels_similar(
    a: &[BoundingBox],
    b: &[BoundingBox],
    iou_threshold: f64,
    labels_limit: usize,
) -> bool {
    let (a, b) = if labels_limit > 0 {
        (
            &a[..a.len().min(labels_limit)],
            &b[..b.len().min(labels_limit)],
        )
    } else {
        (a, b)
    };

    if a.len() != b.len() || a.is_empty() {
        return false;
    }

    if sorted_classes(a) != sorted_classes(b) {
        return false;
    }

    let groups_a = boxes_by_class(a);
    let groups_b = boxes_by_class(b);

    for (class_id, boxes_a) in &groups_a {
        let Some(boxes_b) = groups_b.get(class_id) else {
            return false;
        };

        if !greedy_assign(boxes_a, boxes_b, iou_threshold) {
            return false;
        }
    }

    true
}

/// Greedily assign each box of `a` to its best unused box in `b`.
///
/// A candidate replaces the current best only on a strictly greater IoU.
fn greedy_assign(a: &[&BoundingBox], b: &[&BoundingBox], iou_threshold: f64) -> bool {
    let mut used_b = vec![false; b.len()];

    for box_a in a {
        let mut best_idx: Option<usize> = None;
        let mut best_iou = -1.0;

        for (idx, box_b) in b.iter().enumerate() {
            if used_b[idx] {
                continue;
            }

            let value = iou(box_a, box_b);
            if value > best_iou {
                best_iou = value;
                best_idx = Some(idx);
            }
        }

        if best_iou < iou_threshold {
            return false;
        }

        if let Some(idx) = best_idx {
            used_b[idx] = true;
        }
    }

    true
}

fn sorted_classes(boxes: &[BoundingBox]) -> Vec<i64> {
    let mut classes: Vec<i64> = boxes.iter().map(|b| b.class_id).collect();
    classes.sort_unstable();
    classes
}

fn boxes_by_class(boxes: &[BoundingBox]) -> BTreeMap<i64, Vec<&BoundingBox>> {
    let mut map: BTreeMap<i64, Vec<&BoundingBox>> = BTreeMap::new();
    for bbox in boxes {
        map.entry(bbox.class_id).or_default().push(bbox);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(class_id: i64, cx: f64, cy: f64, w: f64, h: f64) -> BoundingBox {
        BoundingBox::new(class_id, cx, cy, w, h)
    }

    #[test]
    fn identical_sets_are_similar() {
        let set = vec![b(0, 0.5, 0.5, 0.2, 0.2), b(1, 0.2, 0.3, 0.1, 0.1)];
        assert!(labels_similar(&set, &set, 0.8, 0));
        assert!(labels_similar(&set, &set, 1.0, 0));
    }

    #[test]
    fn empty_sets_are_not_similar() {
        assert!(!labels_similar(&[], &[], 0.0, 0));
    }

    #[test]
    fn length_mismatch_is_not_similar() {
        let a = vec![b(0, 0.5, 0.5, 0.2, 0.2)];
        let c = vec![b(0, 0.5, 0.5, 0.2, 0.2), b(0, 0.1, 0.1, 0.1, 0.1)];
        assert!(!labels_similar(&a, &c, 0.5, 0));
    }

    #[test]
    fn class_mismatch_is_not_similar() {
        let a = vec![b(0, 0.5, 0.5, 0.2, 0.2)];
        let c = vec![b(1, 0.5, 0.5, 0.2, 0.2)];
        assert!(!labels_similar(&a, &c, 0.5, 0));
    }

    #[test]
    fn order_within_file_does_not_matter() {
        let a = vec![b(0, 0.5, 0.5, 0.2, 0.2), b(1, 0.2, 0.3, 0.1, 0.1)];
        let c = vec![b(1, 0.2, 0.3, 0.1, 0.1), b(0, 0.5, 0.5, 0.2, 0.2)];
        assert!(labels_similar(&a, &c, 0.9, 0));
    }

    #[test]
    fn low_iou_is_not_similar() {
        let a = vec![b(0, 0.25, 0.5, 0.5, 1.0)];
        let c = vec![b(0, 0.5, 0.5, 0.5, 1.0)];
        assert!(!labels_similar(&a, &c, 0.5, 0));
        assert!(labels_similar(&a, &c, 0.3, 0));
    }

    #[test]
    fn labels_limit_truncates_before_comparing() {
        let a = vec![b(0, 0.5, 0.5, 0.2, 0.2), b(1, 0.1, 0.1, 0.1, 0.1)];
        let c = vec![
            b(0, 0.5, 0.5, 0.2, 0.2),
            b(2, 0.9, 0.9, 0.1, 0.1),
            b(3, 0.7, 0.7, 0.1, 0.1),
        ];
        assert!(!labels_similar(&a, &c, 0.8, 0));
        assert!(labels_similar(&a, &c, 0.8, 1));
        assert!(!labels_similar(&a, &c, 0.8, 2));
    }

    #[test]
    fn labels_limit_larger_than_sets_compares_everything() {
        let a = vec![b(0, 0.5, 0.5, 0.2, 0.2)];
        assert!(labels_similar(&a, &a, 0.8, 10));
    }

    #[test]
    fn greedy_assignment_is_not_optimal_matching() {
        // a0 overlaps both b0 and b1 but slightly prefers b1, which a1
        // needs. An optimal matching (a0-b0, a1-b1) would pass at 0.3;
        // the greedy pass hands b1 to a0 and leaves a1 with b0.
        let a = vec![b(0, 0.45, 0.5, 0.3, 0.3), b(0, 0.6, 0.5, 0.3, 0.3)];
        let c = vec![b(0, 0.3, 0.5, 0.3, 0.3), b(0, 0.55, 0.5, 0.3, 0.3)];

        assert!(iou(&a[0], &c[1]) > iou(&a[0], &c[0]));
        assert!(iou(&a[1], &c[0]) < 0.3);
        assert!(!labels_similar(&a, &c, 0.3, 0));
    }

    #[test]
    fn equal_iou_goes_to_lower_index() {
        // a0 overlaps c0 and c1 equally (1/3 each). Taking c0, the lower
        // index, leaves c1 for a1, which sits exactly on it.
        let a = vec![b(0, 0.5, 0.5, 0.25, 0.5), b(0, 0.625, 0.5, 0.25, 0.5)];
        let c = vec![b(0, 0.375, 0.5, 0.25, 0.5), b(0, 0.625, 0.5, 0.25, 0.5)];

        assert_eq!(iou(&a[0], &c[0]), iou(&a[0], &c[1]));
        assert_eq!(iou(&a[1], &c[0]), 0.0);
        assert!(labels_similar(&a, &c, 0.3, 0));
    }
}
