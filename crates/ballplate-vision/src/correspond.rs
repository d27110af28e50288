//! Corner/target correspondence between labeled blobs and the plate model.
//!
//! Each of the four plate corners has a fixed reference anchor near an image
//! corner. Candidates are the largest blobs of the frame; corners take the
//! candidate nearest to their anchor and, when exactly one candidate is left
//! over from a full set, that one is the tracked target.
//!
//! Nothing is carried between frames: correspondence is rebuilt from scratch
//! every call.

use ballplate_core::PlateCorner;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::label::Blob;
use crate::params::{AssignmentMode, CorrespondenceParams};

/// Reference anchor pixels in `PlateCorner::ALL` order.
///
/// These are approximate expected positions, not the true corner pixels.
pub fn reference_anchors(width: usize, height: usize, inset: f64) -> [Point2<f64>; 4] {
    let right = width.saturating_sub(1) as f64;
    let bottom = height.saturating_sub(1) as f64;
    [
        Point2::new(0.0, bottom),
        Point2::new(inset, 0.0),
        Point2::new(right - inset, 0.0),
        Point2::new(right, bottom),
    ]
}

/// One corner and the candidate it was assigned to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerAssignment {
    pub corner: PlateCorner,
    /// Index into `Correspondence::candidates`.
    pub candidate: usize,
    /// Squared pixel distance from the anchor to the candidate centroid.
    pub distance_sq: f64,
}

/// Result of one correspondence pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Largest blobs, sorted by descending pixel count.
    pub candidates: Vec<Blob>,
    /// Assigned corners in `PlateCorner::ALL` order; fewer than four when
    /// fewer candidates exist.
    pub corners: Vec<CornerAssignment>,
    /// Index of the target candidate, only set for a full candidate set.
    pub target: Option<usize>,
}

impl Correspondence {
    /// `true` when all four corners were assigned.
    pub fn is_complete(&self) -> bool {
        self.corners.len() == PlateCorner::ALL.len()
    }

    /// Corner centroids in `PlateCorner::ALL` order, if all four are present.
    pub fn corner_points(&self) -> Option<[Point2<f64>; 4]> {
        if !self.is_complete() {
            return None;
        }
        Some(std::array::from_fn(|i| {
            self.candidates[self.corners[i].candidate].centroid
        }))
    }

    pub fn target_blob(&self) -> Option<&Blob> {
        self.target.map(|i| &self.candidates[i])
    }

    /// `true` when two corners share a candidate (greedy mode only).
    pub fn has_duplicate_assignment(&self) -> bool {
        self.corners.iter().enumerate().any(|(i, a)| {
            self.corners[i + 1..]
                .iter()
                .any(|b| b.candidate == a.candidate)
        })
    }
}

fn distance_sq(a: Point2<f64>, b: Point2<f64>) -> f64 {
    (a - b).norm_squared()
}

/// Sort blobs by descending pixel count and keep the `max_candidates` largest.
///
/// The sort is stable so equal-sized blobs keep their labeling order.
pub fn select_candidates(mut blobs: Vec<Blob>, max_candidates: usize) -> Vec<Blob> {
    blobs.sort_by(|a, b| b.count.cmp(&a.count));
    blobs.truncate(max_candidates);
    blobs
}

fn assign_greedy(anchors: &[Point2<f64>], candidates: &[Blob]) -> Vec<(usize, f64)> {
    anchors
        .iter()
        .map(|&anchor| {
            let mut best = (0, f64::INFINITY);
            for (idx, blob) in candidates.iter().enumerate() {
                let d = distance_sq(anchor, blob.centroid);
                if d < best.1 {
                    best = (idx, d);
                }
            }
            best
        })
        .collect()
}

// Exhaustive search over distinct assignments; at most 5P4 = 120 leaves.
fn assign_exclusive(anchors: &[Point2<f64>], candidates: &[Blob]) -> Vec<(usize, f64)> {
    fn search(
        depth: usize,
        anchors: &[Point2<f64>],
        candidates: &[Blob],
        used: &mut [bool],
        current: &mut Vec<(usize, f64)>,
        best: &mut Option<(f64, Vec<(usize, f64)>)>,
    ) {
        if depth == anchors.len() {
            let total: f64 = current.iter().map(|&(_, d)| d).sum();
            if best.as_ref().is_none_or(|(b, _)| total < *b) {
                *best = Some((total, current.clone()));
            }
            return;
        }
        for idx in 0..candidates.len() {
            if used[idx] {
                continue;
            }
            used[idx] = true;
            current.push((idx, distance_sq(anchors[depth], candidates[idx].centroid)));
            search(depth + 1, anchors, candidates, used, current, best);
            current.pop();
            used[idx] = false;
        }
    }

    let mut best = None;
    let mut used = vec![false; candidates.len()];
    let mut current = Vec::with_capacity(anchors.len());
    search(0, anchors, candidates, &mut used, &mut current, &mut best);
    best.map(|(_, assignment)| assignment).unwrap_or_default()
}

// Among unassigned candidates, the one farthest from every anchor.
fn pick_target(
    anchors: &[Point2<f64>; 4],
    candidates: &[Blob],
    corners: &[CornerAssignment],
) -> Option<usize> {
    let nearest_anchor = |blob: &Blob| {
        anchors
            .iter()
            .map(|&a| distance_sq(a, blob.centroid))
            .fold(f64::INFINITY, f64::min)
    };
    let mut best: Option<(usize, f64)> = None;
    for (idx, blob) in candidates.iter().enumerate() {
        if corners.iter().any(|c| c.candidate == idx) {
            continue;
        }
        let d = nearest_anchor(blob);
        if best.is_none_or(|(_, bd)| d > bd) {
            best = Some((idx, d));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Assign labeled blobs to plate corners and pick the target.
///
/// `width`/`height` are the frame dimensions used to place the anchors.
pub fn resolve_correspondence(
    blobs: Vec<Blob>,
    width: usize,
    height: usize,
    params: &CorrespondenceParams,
) -> Correspondence {
    let candidates = select_candidates(blobs, params.max_candidates);
    let anchors = reference_anchors(width, height, params.anchor_inset);
    let n_corners = candidates.len().min(anchors.len());
    let used_anchors = &anchors[..n_corners];

    let raw = match params.mode {
        AssignmentMode::Greedy => assign_greedy(used_anchors, &candidates),
        AssignmentMode::Exclusive => assign_exclusive(used_anchors, &candidates),
    };
    let corners: Vec<CornerAssignment> = raw
        .into_iter()
        .zip(PlateCorner::ALL)
        .map(|((candidate, distance_sq), corner)| CornerAssignment {
            corner,
            candidate,
            distance_sq,
        })
        .collect();

    // Four corners plus exactly one leftover.
    let target = if candidates.len() == anchors.len() + 1 && corners.len() == anchors.len() {
        pick_target(&anchors, &candidates, &corners)
    } else {
        None
    };

    let result = Correspondence {
        candidates,
        corners,
        target,
    };
    if result.has_duplicate_assignment() {
        log::trace!("greedy correspondence assigned one blob to several corners");
    }
    result
}
