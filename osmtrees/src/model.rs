//! Normalized tree and stump records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of natural feature being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// A standing tree, tagged `natural=tree`.
    Tree,
    /// A tree stump, tagged `natural=tree_stump`.
    Stump,
}

impl FeatureKind {
    /// Value of the OSM `natural` tag for this kind.
    pub fn osm_tag(self) -> &'static str {
        match self {
            FeatureKind::Tree => "tree",
            FeatureKind::Stump => "tree_stump",
        }
    }

    /// Prefix used when synthesizing record identifiers.
    pub fn id_prefix(self) -> &'static str {
        match self {
            FeatureKind::Tree => "tree",
            FeatureKind::Stump => "stump",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id_prefix())
    }
}

impl FromStr for FeatureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tree" | "trees" => Ok(FeatureKind::Tree),
            "stump" | "stumps" | "tree_stump" => Ok(FeatureKind::Stump),
            other => Err(format!("unknown feature kind '{}'", other)),
        }
    }
}

/// A tree normalized from an Overpass node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Tree {
    /// Identifier, `tree_<osm id>`.
    pub id: String,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Botanical species (`species` tag).
    pub species: Option<String>,
    /// Height in meters.
    pub height: Option<f64>,
    /// Trunk diameter.
    pub diameter: Option<f64>,
    /// Age in years.
    pub age: Option<i64>,
    /// Free-form health status.
    pub health: Option<String>,
    /// When this record was produced.
    pub last_updated: Option<DateTime<Utc>>,
}

/// A tree stump normalized from an Overpass node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Stump {
    /// Identifier, `stump_<osm id>`.
    pub id: String,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Species of the removed tree.
    pub species: Option<String>,
    /// Stump diameter.
    pub diameter: Option<f64>,
    /// When this record was produced; OSM rarely records the real date.
    pub removal_date: Option<DateTime<Utc>>,
    /// Why the tree was removed (`removal_reason` tag).
    pub reason: Option<String>,
}

/// Either record kind.
///
/// Serializes untagged, so a list of features has exactly the JSON shape of
/// the underlying records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Feature {
    Tree(Tree),
    Stump(Stump),
}

impl Feature {
    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::Tree(_) => FeatureKind::Tree,
            Feature::Stump(_) => FeatureKind::Stump,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Feature::Tree(t) => &t.id,
            Feature::Stump(s) => &s.id,
        }
    }

    pub fn lat(&self) -> f64 {
        match self {
            Feature::Tree(t) => t.lat,
            Feature::Stump(s) => s.lat,
        }
    }

    pub fn lon(&self) -> f64 {
        match self {
            Feature::Tree(t) => t.lon,
            Feature::Stump(s) => s.lon,
        }
    }

    pub fn species(&self) -> Option<&str> {
        match self {
            Feature::Tree(t) => t.species.as_deref(),
            Feature::Stump(s) => s.species.as_deref(),
        }
    }
}

impl From<Tree> for Feature {
    fn from(tree: Tree) -> Self {
        Feature::Tree(tree)
    }
}

impl From<Stump> for Feature {
    fn from(stump: Stump) -> Self {
        Feature::Stump(stump)
    }
}
