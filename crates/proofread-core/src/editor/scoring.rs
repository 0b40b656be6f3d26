//! Neighbor scoring for the ranked review modes.

use super::ReviewMode;
use crate::Node;

/// Change in label entropy (bits, normalized by `total`) caused by merging
/// two bodies of the given sizes.
///
/// Returns `0.0` for an empty volume. Zero-sized bodies contribute nothing.
#[must_use]
pub fn entropy_delta(size1: f64, size2: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let term = |s: f64| {
        if s <= 0.0 {
            0.0
        } else {
            let p = s / total;
            p * p.log2()
        }
    };
    term(size1 + size2) - term(size1) - term(size2)
}

/// Score of proposing `other` as the merge partner of `head`.
///
/// `None` means the neighbor is not a candidate in this mode at all.
pub(crate) fn neighbor_score(
    mode: ReviewMode,
    head: &Node,
    other: &Node,
    affinity: f64,
    volume: f64,
    min_body_neighbor_size: u64,
) -> Option<f64> {
    match mode {
        ReviewMode::Body => {
            if other.size < min_body_neighbor_size {
                Some(0.0)
            } else {
                Some(affinity * entropy_delta(head.size as f64, other.size as f64, volume))
            }
        }
        ReviewMode::Synapse => {
            let a = head.props.synapse_weight();
            let b = other.props.synapse_weight();
            (a > 0 && b > 0).then(|| affinity * entropy_delta(a as f64, b as f64, volume))
        }
        ReviewMode::Orphan => {
            (head.props.is_orphan() && !other.props.is_orphan()).then_some(affinity)
        }
        ReviewMode::Edge => None,
    }
}
