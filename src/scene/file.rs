//! TOML representation of a scene and its validation

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::constraint::SceneConstraint;
use crate::cleanup::CleanupConfig;
use crate::error::SceneError;

/// A scene file as written on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneFile {
    pub room: RoomSpec,
    #[serde(default, rename = "asset")]
    pub assets: Vec<AssetSpec>,
    #[serde(default)]
    pub constraints: ConstraintSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomSpec {
    pub boundary: Vec<[f64; 2]>,
    /// Reachability clearance in meters; 0 disables the term
    #[serde(default)]
    pub walkway: f64,
    /// (below, above) pairs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_top_of: Vec<[String; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<[f64; 2]>>,
    pub position: Vec<f64>,
    /// Degrees, counter-clockwise
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub fixture: bool,
    #[serde(default = "default_true")]
    pub optimize: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub existing: Vec<SceneConstraint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new: Vec<SceneConstraint>,
}

impl SceneFile {
    pub fn parse(source: &str) -> Result<Self, SceneError> {
        Ok(toml::from_str(source)?)
    }

    pub fn to_toml(&self) -> Result<String, SceneError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check everything serde cannot: references, shapes and arities
    pub fn validate(&self) -> Result<(), SceneError> {
        if self.room.boundary.len() < 3 {
            return Err(SceneError::InvalidRoom(format!(
                "boundary needs at least 3 points, got {}",
                self.room.boundary.len()
            )));
        }
        if !(self.room.walkway >= 0.0) {
            return Err(SceneError::InvalidRoom("walkway must be non-negative".into()));
        }

        let mut defined = HashSet::new();
        for asset in &self.assets {
            if !defined.insert(asset.id.clone()) {
                return Err(SceneError::DuplicateAsset(asset.id.clone()));
            }
            asset.validate()?;
        }

        for [below, above] in &self.room.on_top_of {
            for name in [below, above] {
                check_reference(&defined, name, "room.on_top_of")?;
            }
        }

        let lists = [("constraints.existing", &self.constraints.existing), ("constraints.new", &self.constraints.new)];
        for (list, constraints) in lists {
            for constraint in constraints {
                for name in constraint.assets() {
                    check_reference(&defined, name, &format!("{list} ({})", constraint.kind()))?;
                }
            }
        }
        Ok(())
    }
}

impl AssetSpec {
    fn validate(&self) -> Result<(), SceneError> {
        match (&self.size, &self.outline) {
            (Some(_), Some(_)) => {
                return Err(SceneError::invalid_asset(&self.id, "both size and outline given"))
            }
            (None, None) => {
                return Err(SceneError::invalid_asset(&self.id, "needs either size or outline"))
            }
            (Some([w, d]), None) if !(*w > 0.0 && *d > 0.0) => {
                return Err(SceneError::invalid_asset(&self.id, "size must be positive"))
            }
            (None, Some(outline)) if outline.len() < 3 => {
                return Err(SceneError::invalid_asset(&self.id, "outline needs at least 3 points"))
            }
            _ => {}
        }
        if !(2..=3).contains(&self.position.len()) {
            return Err(SceneError::invalid_asset(
                &self.id,
                format!("position needs 2 or 3 components, got {}", self.position.len()),
            ));
        }
        Ok(())
    }
}

fn check_reference(defined: &HashSet<String>, name: &str, context: &str) -> Result<(), SceneError> {
    if defined.contains(name) {
        Ok(())
    } else {
        Err(SceneError::unknown_asset(name, context, find_similar(defined, name, 2)))
    }
}

/// Compute Levenshtein edit distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let n = b_chars.len();

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut row = vec![0usize; n + 1];
    for (i, ca) in a_chars.iter().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[n]
}

/// Find defined IDs within a maximum edit distance, closest first
fn find_similar(defined: &HashSet<String>, target: &str, max_distance: usize) -> Vec<String> {
    let mut candidates: Vec<(String, usize)> = defined
        .iter()
        .filter_map(|name| {
            let dist = levenshtein_distance(name, target);
            (dist <= max_distance && dist > 0).then(|| (name.clone(), dist))
        })
        .collect();

    candidates.sort_by(|(a, da), (b, db)| da.cmp(db).then_with(|| a.cmp(b)));
    candidates
        .into_iter()
        .map(|(name, _)| name)
        .take(3)
        .collect()
}
