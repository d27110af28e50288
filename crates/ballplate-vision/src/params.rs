use serde::{Deserialize, Serialize};

/// Two hue bands plus shared saturation/value bounds, 8-bit HSV.
///
/// Every bound is inclusive. Two hue bands let a colour that straddles the
/// hue wrap-around be captured as `[0, a]` and `[b, 179]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsvThresholds {
    pub h1: [u8; 2],
    pub h2: [u8; 2],
    pub s: [u8; 2],
    pub v: [u8; 2],
}

impl Default for HsvThresholds {
    fn default() -> Self {
        Self {
            h1: [0, 0],
            h2: [55, 85],
            s: [45, 150],
            v: [60, 255],
        }
    }
}

/// Names of the individually addressable threshold bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdBound {
    H1Min,
    H1Max,
    H2Min,
    H2Max,
    SMin,
    SMax,
    VMin,
    VMax,
}

impl ThresholdBound {
    pub const ALL: [ThresholdBound; 8] = [
        ThresholdBound::H1Min,
        ThresholdBound::H1Max,
        ThresholdBound::H2Min,
        ThresholdBound::H2Max,
        ThresholdBound::SMin,
        ThresholdBound::SMax,
        ThresholdBound::VMin,
        ThresholdBound::VMax,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ThresholdBound::H1Min => "h1_min",
            ThresholdBound::H1Max => "h1_max",
            ThresholdBound::H2Min => "h2_min",
            ThresholdBound::H2Max => "h2_max",
            ThresholdBound::SMin => "s_min",
            ThresholdBound::SMax => "s_max",
            ThresholdBound::VMin => "v_min",
            ThresholdBound::VMax => "v_max",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }
}

impl HsvThresholds {
    pub fn get(&self, bound: ThresholdBound) -> u8 {
        *self.slot(bound)
    }

    pub fn set(&mut self, bound: ThresholdBound, value: u8) {
        *self.slot_mut(bound) = value;
    }

    fn slot(&self, bound: ThresholdBound) -> &u8 {
        match bound {
            ThresholdBound::H1Min => &self.h1[0],
            ThresholdBound::H1Max => &self.h1[1],
            ThresholdBound::H2Min => &self.h2[0],
            ThresholdBound::H2Max => &self.h2[1],
            ThresholdBound::SMin => &self.s[0],
            ThresholdBound::SMax => &self.s[1],
            ThresholdBound::VMin => &self.v[0],
            ThresholdBound::VMax => &self.v[1],
        }
    }

    fn slot_mut(&mut self, bound: ThresholdBound) -> &mut u8 {
        match bound {
            ThresholdBound::H1Min => &mut self.h1[0],
            ThresholdBound::H1Max => &mut self.h1[1],
            ThresholdBound::H2Min => &mut self.h2[0],
            ThresholdBound::H2Max => &mut self.h2[1],
            ThresholdBound::SMin => &mut self.s[0],
            ThresholdBound::SMax => &mut self.s[1],
            ThresholdBound::VMin => &mut self.v[0],
            ThresholdBound::VMax => &mut self.v[1],
        }
    }
}

/// Connected-component filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelParams {
    /// Components with `count <= min_blob_size` are discarded.
    pub min_blob_size: usize,
}

impl Default for LabelParams {
    fn default() -> Self {
        Self { min_blob_size: 10 }
    }
}

/// How candidate blobs are assigned to the four plate corners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    /// Each corner independently takes its nearest candidate; two corners
    /// may end up on the same blob.
    #[default]
    Greedy,
    /// Distinct candidates per corner, minimizing total squared distance.
    Exclusive,
}

/// Corner/target correspondence settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrespondenceParams {
    pub mode: AssignmentMode,
    /// Largest blobs kept as candidates (four corners plus one target).
    pub max_candidates: usize,
    /// Horizontal inset, in pixels, of the two northern reference anchors.
    pub anchor_inset: f64,
}

impl Default for CorrespondenceParams {
    fn default() -> Self {
        Self {
            mode: AssignmentMode::Greedy,
            max_candidates: 5,
            anchor_inset: 50.0,
        }
    }
}

/// Parameters for single-frame plate detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlateDetectorParams {
    #[serde(default)]
    pub thresholds: HsvThresholds,
    #[serde(default)]
    pub label: LabelParams,
    #[serde(default)]
    pub correspondence: CorrespondenceParams,
}
