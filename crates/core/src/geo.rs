//! Administrative geography: unit types, placement rules, slugs and ancestry.
//!
//! Units form a forest with two disjoint branch kinds:
//!
//! ```text
//! city_corporation ── ward
//! upazila ── union ── ward
//! ```
//!
//! Every unit stores its full ancestor id list (root first) so "is X inside
//! Y" is a membership test instead of a walk up `parent_id`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum length of a unit name.
pub const MAX_NAME_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Unit type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoUnitType {
    CityCorporation,
    Upazila,
    Union,
    Ward,
}

impl GeoUnitType {
    pub const ALL: [GeoUnitType; 4] = [
        GeoUnitType::CityCorporation,
        GeoUnitType::Upazila,
        GeoUnitType::Union,
        GeoUnitType::Ward,
    ];

    /// Stable string form, matching the `unit_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CityCorporation => "city_corporation",
            Self::Upazila => "upazila",
            Self::Union => "union",
            Self::Ward => "ward",
        }
    }

    /// Human label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CityCorporation => "city corporation",
            Self::Upazila => "upazila",
            Self::Union => "union",
            Self::Ward => "ward",
        }
    }

    /// Parent types a unit of this type may be placed under.
    ///
    /// An empty slice means the type only exists at the top level.
    pub fn allowed_parents(&self) -> &'static [GeoUnitType] {
        match self {
            Self::CityCorporation | Self::Upazila => &[],
            Self::Union => &[GeoUnitType::Upazila],
            Self::Ward => &[GeoUnitType::CityCorporation, GeoUnitType::Union],
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.allowed_parents().is_empty()
    }

    /// Depth rank used to order bulk uploads parents-first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::CityCorporation | Self::Upazila => 0,
            Self::Union => 1,
            Self::Ward => 2,
        }
    }

    /// Lenient parse for spreadsheet input: case-insensitive, and spaces or
    /// hyphens are accepted in place of underscores (`"City Corporation"`).
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        match normalized.as_str() {
            "city_corporation" | "city" => Some(Self::CityCorporation),
            "upazila" => Some(Self::Upazila),
            "union" => Some(Self::Union),
            "ward" => Some(Self::Ward),
            _ => None,
        }
    }
}

impl fmt::Display for GeoUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeoUnitType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid geo unit type '{s}'. Valid types: city_corporation, upazila, union, ward"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Record view
// ---------------------------------------------------------------------------

/// Read-only view of a stored geo unit.
///
/// Implemented by the database row type so the rules in this crate can run
/// against it without depending on sqlx.
pub trait GeoRecord {
    fn id(&self) -> DbId;
    fn unit_type(&self) -> &str;
    fn parent_id(&self) -> Option<DbId>;
    fn slug(&self) -> &str;
    /// Transitive parent ids, root first.
    fn ancestors(&self) -> &[DbId];
}

/// True when `unit` is `ancestor_id` itself or sits anywhere beneath it.
pub fn descends_from<R: GeoRecord + ?Sized>(unit: &R, ancestor_id: DbId) -> bool {
    unit.id() == ancestor_id
        || unit.parent_id() == Some(ancestor_id)
        || unit.ancestors().contains(&ancestor_id)
}

/// Ancestor list for a child placed under `parent` (`parent.ancestors + [parent.id]`).
pub fn compute_ancestors<R: GeoRecord + ?Sized>(parent: Option<&R>) -> Vec<DbId> {
    match parent {
        Some(p) => {
            let mut ancestors = Vec::with_capacity(p.ancestors().len() + 1);
            ancestors.extend_from_slice(p.ancestors());
            ancestors.push(p.id());
            ancestors
        }
        None => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Mutation errors
// ---------------------------------------------------------------------------

/// Rule violations raised while creating, moving, reordering or deleting units.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("A {unit_type} named '{slug}' already exists under this parent")]
    Duplicate { unit_type: String, slug: String },

    #[error("Geo unit {id} has {children} child unit(s) and cannot be deleted")]
    HasChildren { id: DbId, children: i64 },

    #[error("Geo unit {id} or a unit beneath it is referenced by {references} committee(s) or center(s)")]
    InUse { id: DbId, references: i64 },

    #[error("A {} cannot be placed {}", .child.label(), placement_phrase(.parent))]
    InvalidPlacement {
        child: GeoUnitType,
        parent: Option<GeoUnitType>,
    },

    #[error("Geo unit {id} cannot be moved beneath itself or one of its descendants")]
    Cycle { id: DbId },

    #[error("Geo units {a} and {b} are not siblings of the same type")]
    NotSiblings { a: DbId, b: DbId },

    #[error("{0}")]
    Invalid(String),
}

fn placement_phrase(parent: &Option<GeoUnitType>) -> String {
    match parent {
        Some(p) => format!("under a {}", p.label()),
        None => "at the top level".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Check that a `child` unit may live under a parent of type `parent`.
pub fn check_placement(child: GeoUnitType, parent: Option<GeoUnitType>) -> Result<(), GeoError> {
    let allowed = child.allowed_parents();
    let ok = match parent {
        None => allowed.is_empty(),
        Some(p) => allowed.contains(&p),
    };
    if ok {
        Ok(())
    } else {
        Err(GeoError::InvalidPlacement { child, parent })
    }
}

/// Parse the stored type of a record, failing on values outside the enum.
pub fn record_type<R: GeoRecord + ?Sized>(record: &R) -> Result<GeoUnitType, GeoError> {
    record.unit_type().parse().map_err(|_| {
        GeoError::Invalid(format!(
            "Geo unit {} has unknown type '{}'",
            record.id(),
            record.unit_type()
        ))
    })
}

/// Validate moving `node` under `new_parent` (or to the top level).
pub fn check_reparent<R: GeoRecord + ?Sized>(
    node: &R,
    new_parent: Option<&R>,
) -> Result<(), GeoError> {
    if let Some(parent) = new_parent {
        if descends_from(parent, node.id()) {
            return Err(GeoError::Cycle { id: node.id() });
        }
    }
    let parent_type = new_parent.map(record_type).transpose()?;
    check_placement(record_type(node)?, parent_type)
}

/// Validate that two units may exchange their `sort` values.
pub fn check_swap<R: GeoRecord + ?Sized>(a: &R, b: &R) -> Result<(), GeoError> {
    if a.id() == b.id() || a.unit_type() != b.unit_type() || a.parent_id() != b.parent_id() {
        return Err(GeoError::NotSiblings { a: a.id(), b: b.id() });
    }
    Ok(())
}

/// Validate a unit name (non-empty after trimming, bounded length, sluggable).
pub fn validate_name(name: &str) -> Result<(), GeoError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GeoError::Invalid("Name must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(GeoError::Invalid(format!(
            "Name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if generate_slug(trimmed).is_empty() {
        return Err(GeoError::Invalid(
            "Name must contain at least one letter or digit".into(),
        ));
    }
    Ok(())
}

/// Normalised slug for a unit name.
///
/// Lowercases, turns every run of non-alphanumeric characters into a single
/// hyphen and trims hyphens from both ends. Letters outside ASCII (Bangla
/// names, for instance) are kept.
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}
