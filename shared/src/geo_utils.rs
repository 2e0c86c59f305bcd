use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::region::{RegionAttributes, RegionRef};

/// Absorbs representation error in `(1 - fraction) * n` so exact ranks do not floor down.
const RANK_EPSILON: f64 = 1e-9;

/// Display name of a region: `SUBZONE_N`, then `subzone`.
pub fn name_of(attributes: &RegionAttributes) -> Option<&str> {
    attributes.name()
}

/// Regions scoring at or above the `(1 - fraction)` percentile of all finite scores.
///
/// The cutoff is the ascending-sorted finite score at index
/// `floor((1 - fraction) * n)` (capped at `n - 1`): nearest rank, floor rounding,
/// no interpolation. With ten regions, the top 10% is exactly the best region.
/// Source order is preserved. `fraction` is clamped into `(0, 1]`.
pub fn top_quantile(regions: &[RegionRef], fraction: f64) -> Vec<RegionRef> {
    let Some(cutoff) = quantile_cutoff(regions, fraction) else {
        return Vec::new();
    };
    regions
        .iter()
        .filter(|region| region.score() >= cutoff)
        .cloned()
        .collect()
}

/// Score threshold used by [`top_quantile`], `None` when no finite score exists.
pub fn quantile_cutoff(regions: &[RegionRef], fraction: f64) -> Option<f64> {
    let mut scores: Vec<f64> = regions
        .iter()
        .map(|region| region.score())
        .filter(|score| score.is_finite())
        .collect();
    if scores.is_empty() {
        return None;
    }
    scores.sort_by(f64::total_cmp);

    let fraction = if fraction.is_nan() {
        1.0
    } else {
        fraction.clamp(f64::MIN_POSITIVE, 1.0)
    };
    let rank = (1.0 - fraction) * scores.len() as f64;
    let idx = (rank + RANK_EPSILON).floor() as usize;
    scores.get(idx.min(scores.len() - 1)).copied()
}

/// Case-insensitive name lookup: lower-cased name -> canonical name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameIndex {
    entries: HashMap<String, String>,
}

impl NameIndex {
    /// Canonical name for `text` (exact match ignoring case), if any.
    pub fn resolve(&self, text: &str) -> Option<&str> {
        self.entries.get(&text.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build a [`NameIndex`]. On duplicate names the last region wins.
pub fn build_name_index(regions: &[RegionRef]) -> NameIndex {
    let mut entries = HashMap::with_capacity(regions.len());
    for region in regions {
        if let Some(name) = region.name() {
            entries.insert(name.to_lowercase(), name.to_string());
        }
    }
    NameIndex { entries }
}

/// Every resolvable name, sorted and deduplicated.
pub fn sorted_names(regions: &[RegionRef]) -> Vec<String> {
    let mut names: Vec<String> = regions
        .iter()
        .filter_map(|region| region.name().map(str::to_string))
        .collect();
    names.sort();
    names.dedup();
    names
}

/// The four states of the quantile filter control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantileFilter {
    #[default]
    All,
    Top50,
    Top25,
    Top10,
}

impl QuantileFilter {
    pub const ALL: [QuantileFilter; 4] = [
        QuantileFilter::All,
        QuantileFilter::Top50,
        QuantileFilter::Top25,
        QuantileFilter::Top10,
    ];

    /// Fraction of the distribution retained, `None` for [`QuantileFilter::All`].
    pub const fn fraction(self) -> Option<f64> {
        match self {
            QuantileFilter::All => None,
            QuantileFilter::Top50 => Some(0.5),
            QuantileFilter::Top25 => Some(0.25),
            QuantileFilter::Top10 => Some(0.1),
        }
    }

    /// Form value of the `<option>` element.
    pub const fn value(self) -> &'static str {
        match self {
            QuantileFilter::All => "all",
            QuantileFilter::Top50 => "0.5",
            QuantileFilter::Top25 => "0.25",
            QuantileFilter::Top10 => "0.1",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            QuantileFilter::All => "All",
            QuantileFilter::Top50 => "Top 50%",
            QuantileFilter::Top25 => "Top 25%",
            QuantileFilter::Top10 => "Top 10%",
        }
    }
}

impl FromStr for QuantileFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|filter| filter.value() == s.trim())
            .ok_or(())
    }
}
