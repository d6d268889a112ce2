// Raw taxonomy source and its normalized category records
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use thiserror::Error;

/// Deepest level a category may sit at. Anything below is malformed input.
pub const MAX_DEPTH: u8 = 3;

#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse taxonomy JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("category {id} sits at depth {depth}, deeper than the allowed {max}", max = MAX_DEPTH)]
    TooDeep { id: i64, depth: u8 },

    #[error("category id {0} appears more than once")]
    DuplicateId(i64),

    #[error("taxonomy contains no categories")]
    Empty,
}

/// A node as it comes from the external taxonomy data set.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCategoryNode {
    pub id: i64,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub popular: bool,
    #[serde(default, alias = "catalogs")]
    pub children: Vec<RawCategoryNode>,
}

fn default_active() -> bool {
    true
}

pub fn load_taxonomy(path: &str) -> Result<Vec<RawCategoryNode>, TaxonomyError> {
    let content = fs::read_to_string(path)?;
    parse_taxonomy(&content)
}

pub fn parse_taxonomy(json: &str) -> Result<Vec<RawCategoryNode>, TaxonomyError> {
    let nodes: Vec<RawCategoryNode> = serde_json::from_str(json)?;
    Ok(nodes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    One = 1,
    Two = 2,
    Three = 3,
}

impl Level {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Position of a category in the tree. Leaves carry no child list at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryKind {
    Level1 { children: Vec<i64> },
    Level2 { parent: i64, children: Vec<i64> },
    Level3 { parent: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub keywords: BTreeSet<String>,
    pub active: bool,
    pub popular: bool,
    pub kind: CategoryKind,
}

impl Category {
    pub fn level(&self) -> Level {
        match self.kind {
            CategoryKind::Level1 { .. } => Level::One,
            CategoryKind::Level2 { .. } => Level::Two,
            CategoryKind::Level3 { .. } => Level::Three,
        }
    }

    pub fn parent_id(&self) -> Option<i64> {
        match self.kind {
            CategoryKind::Level1 { .. } => None,
            CategoryKind::Level2 { parent, .. } | CategoryKind::Level3 { parent } => Some(parent),
        }
    }

    pub fn children(&self) -> &[i64] {
        match &self.kind {
            CategoryKind::Level1 { children } | CategoryKind::Level2 { children, .. } => children,
            CategoryKind::Level3 { .. } => &[],
        }
    }

    /// Level-3 and active. Used to pick suggestions; the validator itself only
    /// checks the level and reports inactive leaves through `is_api_compatible`.
    pub fn is_analyzable(&self) -> bool {
        self.level() == Level::Three && self.active
    }
}
