//! Overlap detection and problem-set selection

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::layout::{Assets, Footprint, GeometryError};

/// An unordered pair of asset IDs, stored as (min, max)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlapPair {
    first: String,
    second: String,
}

impl OverlapPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }
}

impl fmt::Display for OverlapPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.first, self.second)
    }
}

fn is_stacked(on_top_of: &[(String, String)], a: &str, b: &str) -> bool {
    on_top_of
        .iter()
        .any(|(below, above)| (below == a && above == b) || (below == b && above == a))
}

/// Find non-fixture assets whose footprints intersect.
///
/// Declared on-top-of pairs are exempt. A pair is skipped when either footprint
/// cannot be built, so malformed geometry never fails the pass.
pub fn find_overlapping_pairs(
    assets: &Assets,
    is_fixture: impl Fn(&str) -> bool,
    on_top_of: &[(String, String)],
) -> BTreeSet<OverlapPair> {
    let candidates: Vec<(&str, Result<Footprint, GeometryError>)> = assets
        .iter()
        .filter(|(id, _)| !is_fixture(id))
        .map(|(id, asset)| (id.as_str(), asset.footprint()))
        .collect();

    let mut pairs = BTreeSet::new();
    for (i, (id_i, footprint_i)) in candidates.iter().enumerate() {
        let footprint_i = match footprint_i {
            Ok(footprint) => footprint,
            Err(e) => {
                debug!(asset = %id_i, error = %e, "skipping asset with unusable footprint");
                continue;
            }
        };
        for (id_j, footprint_j) in &candidates[i + 1..] {
            if is_stacked(on_top_of, id_i, id_j) {
                continue;
            }
            let Ok(footprint_j) = footprint_j else {
                continue;
            };
            if footprint_i.intersects(footprint_j) {
                pairs.insert(OverlapPair::new(*id_i, *id_j));
            }
        }
    }
    pairs
}

/// Every asset ID that appears in at least one overlap pair
pub fn problematic_assets(pairs: &BTreeSet<OverlapPair>) -> BTreeSet<String> {
    pairs
        .iter()
        .flat_map(|pair| [pair.first.clone(), pair.second.clone()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Asset, Point, Shape};
    use pretty_assertions::assert_eq;

    fn square(id: &str, x: f64, y: f64) -> Asset {
        Asset::new(
            id,
            Shape::Box {
                width: 1.0,
                depth: 1.0,
            },
            vec![x, y],
            0.0,
        )
    }

    fn collection(items: Vec<Asset>) -> Assets {
        items.into_iter().map(|a| (a.id.clone(), a)).collect()
    }

    fn no_fixtures(_: &str) -> bool {
        false
    }

    #[test]
    fn test_pair_is_canonical() {
        assert_eq!(OverlapPair::new("sofa", "bed"), OverlapPair::new("bed", "sofa"));
        let pair = OverlapPair::new("sofa", "bed");
        assert_eq!(pair.first(), "bed");
        assert_eq!(pair.second(), "sofa");
    }

    #[test]
    fn test_half_overlapping_squares_detected() {
        let assets = collection(vec![square("a", 0.0, 0.0), square("b", 0.5, 0.0)]);
        let pairs = find_overlapping_pairs(&assets, no_fixtures, &[]);
        assert_eq!(pairs, BTreeSet::from([OverlapPair::new("a", "b")]));
    }

    #[test]
    fn test_separated_squares_not_detected() {
        let assets = collection(vec![square("a", 0.0, 0.0), square("b", 2.0, 0.0)]);
        assert!(find_overlapping_pairs(&assets, no_fixtures, &[]).is_empty());
    }

    #[test]
    fn test_iteration_order_does_not_change_pairs() {
        let forward = collection(vec![square("z", 0.0, 0.0), square("a", 0.5, 0.0)]);
        let backward = collection(vec![square("a", 0.5, 0.0), square("z", 0.0, 0.0)]);
        assert_eq!(
            find_overlapping_pairs(&forward, no_fixtures, &[]),
            find_overlapping_pairs(&backward, no_fixtures, &[]),
        );
    }

    #[test]
    fn test_fixtures_are_ignored() {
        let assets = collection(vec![square("wall", 0.0, 0.0), square("desk", 0.2, 0.0)]);
        let pairs = find_overlapping_pairs(&assets, |id| id == "wall", &[]);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_on_top_of_pairs_are_exempt_in_either_order() {
        let assets = collection(vec![
            square("desk", 0.0, 0.0),
            square("lamp", 0.0, 0.0),
            square("chair", 3.0, 0.0),
        ]);
        let declared = [("lamp".to_string(), "desk".to_string())];
        assert!(find_overlapping_pairs(&assets, no_fixtures, &declared).is_empty());
    }

    #[test]
    fn test_malformed_footprint_skips_only_its_pairs() {
        let mut broken = square("broken", 0.0, 0.0);
        broken.position.values_mut()[0] = f64::NAN;
        let assets = collection(vec![
            broken,
            square("a", 0.0, 0.0),
            square("b", 0.3, 0.0),
        ]);
        let pairs = find_overlapping_pairs(&assets, no_fixtures, &[]);
        assert_eq!(pairs, BTreeSet::from([OverlapPair::new("a", "b")]));
    }

    #[test]
    fn test_repaired_outline_still_participates() {
        let bow_tie = Asset::new(
            "bow_tie",
            Shape::Outline(vec![
                Point::new(-1.0, -1.0),
                Point::new(1.0, 1.0),
                Point::new(1.0, -1.0),
                Point::new(-1.0, 1.0),
            ]),
            vec![0.0, 0.0],
            0.0,
        );
        let assets = collection(vec![bow_tie, square("probe", 0.7, 0.0)]);
        let pairs = find_overlapping_pairs(&assets, no_fixtures, &[]);
        assert_eq!(pairs, BTreeSet::from([OverlapPair::new("bow_tie", "probe")]));
    }

    #[test]
    fn test_problematic_set_is_union_of_pairs() {
        let pairs = BTreeSet::from([
            OverlapPair::new("a", "b"),
            OverlapPair::new("b", "c"),
            OverlapPair::new("d", "e"),
        ]);
        let expected: BTreeSet<String> =
            ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        assert_eq!(problematic_assets(&pairs), expected);
        assert!(problematic_assets(&BTreeSet::new()).is_empty());
    }
}
