//! Spreadsheet bulk upload of geo units.
//!
//! An upload is a CSV export of the admin spreadsheet with the header
//! `Type,Name,ParentType,ParentName,Code,Sort,Active`. Parsing and planning
//! are pure: [`plan_upload`] decides per row whether it would be created,
//! skipped as a duplicate, or rejected, and how its parent resolves. The API
//! layer shows the plan as a dry-run preview or walks it to insert rows.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::flag::parse_flag;
use crate::geo::{check_placement, generate_slug, validate_name, GeoRecord, GeoUnitType};
use crate::types::DbId;

/// Maximum number of data rows accepted in one upload.
pub const MAX_UPLOAD_ROWS: usize = 20_000;

/// One spreadsheet row as read from the CSV.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoUploadRow {
    #[serde(rename = "Type")]
    pub unit_type: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ParentType", default)]
    pub parent_type: Option<String>,
    #[serde(rename = "ParentName", default)]
    pub parent_name: Option<String>,
    #[serde(rename = "Code", default)]
    pub code: Option<String>,
    #[serde(rename = "Sort", default)]
    pub sort: Option<String>,
    #[serde(rename = "Active", default)]
    pub active: Option<String>,
}

/// Parse CSV bytes into upload rows. Cells are trimmed; empty optional cells
/// read as absent.
pub fn parse_upload_csv(bytes: &[u8]) -> Result<Vec<GeoUploadRow>, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<GeoUploadRow>().enumerate() {
        let row = record.map_err(|e| {
            CoreError::Validation(format!("Invalid CSV at data row {}: {e}", idx + 1))
        })?;
        rows.push(row);
        if rows.len() > MAX_UPLOAD_ROWS {
            return Err(CoreError::Validation(format!(
                "Upload exceeds the maximum of {MAX_UPLOAD_ROWS} rows"
            )));
        }
    }
    if rows.is_empty() {
        return Err(CoreError::Validation("Upload contains no data rows".into()));
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadAction {
    Create,
    Skip,
    Reject,
}

/// Where a planned unit's parent comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum ParentRef {
    Root,
    /// A unit already in the store.
    Existing(DbId),
    /// An earlier entry of the same plan (index into [`UploadPlan::rows`]).
    Batch(usize),
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedUnit {
    /// 1-based data row number in the uploaded file (header excluded).
    pub row: usize,
    pub action: UploadAction,
    pub unit_type: Option<GeoUnitType>,
    pub name: String,
    pub slug: String,
    pub code: Option<String>,
    pub sort: i32,
    pub active: bool,
    pub parent: Option<ParentRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Outcome of planning an upload. `rows` is ordered parents-first, so a
/// `Batch(i)` parent reference always points at an earlier entry.
#[derive(Debug, Clone, Serialize)]
pub struct UploadPlan {
    pub total: usize,
    pub to_create: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub rows: Vec<PlannedUnit>,
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Plan an upload against the units already in the store.
pub fn plan_upload<R: GeoRecord>(rows: &[GeoUploadRow], existing: &[R]) -> UploadPlan {
    // Existing units by (type, slug) for parent resolution, and the
    // uniqueness triples for duplicate detection.
    let mut existing_by_name: HashMap<(&str, &str), Vec<DbId>> = HashMap::new();
    let mut existing_keys: HashSet<(&str, Option<DbId>, &str)> = HashSet::new();
    for unit in existing {
        existing_by_name
            .entry((unit.unit_type(), unit.slug()))
            .or_default()
            .push(unit.id());
        existing_keys.insert((unit.unit_type(), unit.parent_id(), unit.slug()));
    }

    // Parents-first processing order; ties keep file order.
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by_key(|&i| {
        GeoUnitType::parse_loose(&rows[i].unit_type).map_or(u8::MAX, |t| t.rank())
    });

    let mut planned: Vec<PlannedUnit> = Vec::with_capacity(rows.len());
    let mut batch_by_name: HashMap<(GeoUnitType, String), Vec<usize>> = HashMap::new();
    let mut batch_keys: HashMap<(GeoUnitType, ParentRef, String), usize> = HashMap::new();

    for idx in order {
        let row = &rows[idx];
        let mut unit = PlannedUnit {
            row: idx + 1,
            action: UploadAction::Reject,
            unit_type: None,
            name: row.name.trim().to_string(),
            slug: generate_slug(&row.name),
            code: row.code.clone().filter(|c| !c.is_empty()),
            sort: 0,
            active: true,
            parent: None,
            reason: None,
        };

        match plan_row(row, &mut unit, &existing_by_name, &batch_by_name, &planned) {
            Err(reason) => unit.reason = Some(reason),
            Ok((unit_type, parent)) => {
                unit.unit_type = Some(unit_type);
                unit.parent = Some(parent);

                let existing_parent = match parent {
                    ParentRef::Root => Some(None),
                    ParentRef::Existing(id) => Some(Some(id)),
                    ParentRef::Batch(_) => None,
                };
                let duplicate_of_existing = existing_parent.is_some_and(|p| {
                    existing_keys.contains(&(unit_type.as_str(), p, unit.slug.as_str()))
                });
                let batch_key = (unit_type, parent, unit.slug.clone());

                if duplicate_of_existing {
                    unit.action = UploadAction::Skip;
                    unit.reason = Some("Already exists".into());
                } else if let Some(&first) = batch_keys.get(&batch_key) {
                    unit.action = UploadAction::Skip;
                    unit.reason = Some(format!("Duplicate of row {}", planned[first].row));
                } else {
                    unit.action = UploadAction::Create;
                    batch_keys.insert(batch_key, planned.len());
                }

                // Skipped duplicates of existing units still resolve as
                // parents through the existing index, so only creates are
                // registered here.
                if unit.action == UploadAction::Create {
                    batch_by_name
                        .entry((unit_type, unit.slug.clone()))
                        .or_default()
                        .push(planned.len());
                }
            }
        }
        planned.push(unit);
    }

    let count = |action: UploadAction| planned.iter().filter(|u| u.action == action).count();
    UploadPlan {
        total: planned.len(),
        to_create: count(UploadAction::Create),
        skipped: count(UploadAction::Skip),
        rejected: count(UploadAction::Reject),
        rows: planned,
    }
}

/// Validate one row and resolve its parent. Returns the reject reason on failure.
fn plan_row(
    row: &GeoUploadRow,
    unit: &mut PlannedUnit,
    existing_by_name: &HashMap<(&str, &str), Vec<DbId>>,
    batch_by_name: &HashMap<(GeoUnitType, String), Vec<usize>>,
    planned: &[PlannedUnit],
) -> Result<(GeoUnitType, ParentRef), String> {
    let unit_type = GeoUnitType::parse_loose(&row.unit_type)
        .ok_or_else(|| format!("Unknown type '{}'", row.unit_type))?;
    validate_name(&row.name).map_err(|e| e.to_string())?;

    unit.sort = match row.sort.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("Sort must be an integer, got '{raw}'"))?,
        None => 0,
    };
    unit.active = match row.active.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => parse_flag(raw).ok_or_else(|| format!("Active must be yes/no, got '{raw}'"))?,
        None => true,
    };

    let parent_name = row.parent_name.as_deref().filter(|s| !s.is_empty());
    let parent_type_raw = row.parent_type.as_deref().filter(|s| !s.is_empty());

    let (parent_type, parent) = match (parent_type_raw, parent_name) {
        (None, None) => (None, ParentRef::Root),
        (Some(_), None) | (None, Some(_)) => {
            return Err("ParentType and ParentName must be given together".into());
        }
        (Some(ptype_raw), Some(pname)) => {
            let ptype = GeoUnitType::parse_loose(ptype_raw)
                .ok_or_else(|| format!("Unknown parent type '{ptype_raw}'"))?;
            let pslug = generate_slug(pname);
            let parent = resolve_parent(ptype, &pslug, pname, existing_by_name, batch_by_name, planned)?;
            (Some(ptype), parent)
        }
    };

    check_placement(unit_type, parent_type).map_err(|e| e.to_string())?;
    Ok((unit_type, parent))
}

fn resolve_parent(
    ptype: GeoUnitType,
    pslug: &str,
    pname: &str,
    existing_by_name: &HashMap<(&str, &str), Vec<DbId>>,
    batch_by_name: &HashMap<(GeoUnitType, String), Vec<usize>>,
    planned: &[PlannedUnit],
) -> Result<ParentRef, String> {
    let in_batch = batch_by_name
        .get(&(ptype, pslug.to_string()))
        .map(Vec::as_slice)
        .unwrap_or_default();
    let in_store = existing_by_name
        .get(&(ptype.as_str(), pslug))
        .map(Vec::as_slice)
        .unwrap_or_default();

    match (in_batch, in_store) {
        ([only], []) => Ok(ParentRef::Batch(*only)),
        ([], [only]) => Ok(ParentRef::Existing(*only)),
        ([], []) => Err(format!("Parent {} '{pname}' not found", ptype.label())),
        _ => {
            let rows: Vec<String> = in_batch.iter().map(|&i| planned[i].row.to_string()).collect();
            Err(format!(
                "Parent {} '{pname}' is ambiguous ({} existing, rows [{}] in upload)",
                ptype.label(),
                in_store.len(),
                rows.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::tests::{unit, Unit};

    fn row(unit_type: &str, name: &str, parent: Option<(&str, &str)>) -> GeoUploadRow {
        GeoUploadRow {
            unit_type: unit_type.into(),
            name: name.into(),
            parent_type: parent.map(|(t, _)| t.into()),
            parent_name: parent.map(|(_, n)| n.into()),
            ..Default::default()
        }
    }

    fn existing() -> Vec<Unit> {
        let savar = unit(10, GeoUnitType::Upazila, None, "Savar");
        let ashulia = unit(11, GeoUnitType::Union, Some(&savar), "Ashulia");
        vec![savar, ashulia]
    }

    #[test]
    fn parses_csv_with_optional_columns() {
        let csv = b"Type,Name,ParentType,ParentName,Code,Sort,Active\n\
                    upazila, Savar ,,,U-01,2,yes\n\
                    union,Ashulia,upazila,Savar,,,\n";
        let rows = parse_upload_csv(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Savar");
        assert_eq!(rows[0].code.as_deref(), Some("U-01"));
        assert_eq!(rows[0].parent_type, None);
        assert_eq!(rows[1].parent_name.as_deref(), Some("Savar"));
        assert_eq!(rows[1].sort, None);
    }

    #[test]
    fn empty_csv_is_rejected() {
        let csv = b"Type,Name,ParentType,ParentName,Code,Sort,Active\n";
        assert!(parse_upload_csv(csv).is_err());
    }

    #[test]
    fn children_resolve_to_earlier_batch_rows_even_when_listed_first() {
        let rows = vec![
            row("ward", "Ward 1", Some(("union", "Birulia"))),
            row("union", "Birulia", Some(("upazila", "Dhamrai"))),
            row("upazila", "Dhamrai", None),
        ];
        let plan = plan_upload::<Unit>(&rows, &[]);

        assert_eq!(plan.to_create, 3);
        assert_eq!(plan.rows[0].name, "Dhamrai");
        assert_eq!(plan.rows[0].parent, Some(ParentRef::Root));
        assert_eq!(plan.rows[1].name, "Birulia");
        assert_eq!(plan.rows[1].parent, Some(ParentRef::Batch(0)));
        assert_eq!(plan.rows[2].name, "Ward 1");
        assert_eq!(plan.rows[2].parent, Some(ParentRef::Batch(1)));
        assert_eq!(plan.rows[2].row, 1);
    }

    #[test]
    fn parents_resolve_against_existing_units() {
        let rows = vec![row("ward", "Ward 9", Some(("Union", "ashulia")))];
        let plan = plan_upload(&rows, &existing());
        assert_eq!(plan.rows[0].action, UploadAction::Create);
        assert_eq!(plan.rows[0].parent, Some(ParentRef::Existing(11)));
    }

    #[test]
    fn existing_duplicates_are_skipped_and_still_usable_as_parents() {
        let rows = vec![
            row("union", "Ashulia", Some(("upazila", "Savar"))),
            row("ward", "Ward 3", Some(("union", "Ashulia"))),
        ];
        let plan = plan_upload(&rows, &existing());
        assert_eq!(plan.skipped, 1);
        assert_eq!(plan.rows[0].action, UploadAction::Skip);
        assert_eq!(plan.rows[1].action, UploadAction::Create);
        assert_eq!(plan.rows[1].parent, Some(ParentRef::Existing(11)));
    }

    #[test]
    fn duplicate_rows_within_batch_are_skipped() {
        let rows = vec![row("upazila", "Keraniganj", None), row("upazila", "KERANIGANJ", None)];
        let plan = plan_upload::<Unit>(&rows, &[]);
        assert_eq!(plan.to_create, 1);
        assert_eq!(plan.rows[1].action, UploadAction::Skip);
        assert_eq!(plan.rows[1].reason.as_deref(), Some("Duplicate of row 1"));
    }

    #[test]
    fn invalid_rows_are_rejected_with_reason() {
        let mut bad_sort = row("upazila", "Nawabganj", None);
        bad_sort.sort = Some("first".into());
        let rows = vec![
            row("district", "Dhaka", None),
            row("ward", "Ward 1", None),
            row("union", "Kalampur", Some(("upazila", "Nowhere"))),
            row("union", "", Some(("upazila", "Savar"))),
            bad_sort,
        ];
        let plan = plan_upload(&rows, &existing());
        assert_eq!(plan.rejected, 5);
        let reason_for = |name: &str| {
            plan.rows
                .iter()
                .find(|r| r.name == name)
                .and_then(|r| r.reason.clone())
                .unwrap()
        };
        assert_eq!(reason_for("Dhaka"), "Unknown type 'district'");
        assert_eq!(reason_for("Ward 1"), "A ward cannot be placed at the top level");
        assert_eq!(reason_for("Kalampur"), "Parent upazila 'Nowhere' not found");
        assert_eq!(reason_for("Nawabganj"), "Sort must be an integer, got 'first'");
    }

    #[test]
    fn ambiguous_parent_is_rejected() {
        let a = unit(1, GeoUnitType::Upazila, None, "Savar");
        let b = unit(2, GeoUnitType::Upazila, None, "Dhamrai");
        let u1 = unit(3, GeoUnitType::Union, Some(&a), "Char");
        let u2 = unit(4, GeoUnitType::Union, Some(&b), "Char");
        let rows = vec![row("ward", "Ward 1", Some(("union", "Char")))];
        let plan = plan_upload(&rows, &[a, b, u1, u2]);
        assert_eq!(plan.rows[0].action, UploadAction::Reject);
        assert!(plan.rows[0].reason.as_deref().unwrap().contains("ambiguous"));
    }

    #[test]
    fn flags_and_sort_are_parsed() {
        let mut r = row("city_corporation", "Dhaka South", None);
        r.sort = Some("7".into());
        r.active = Some("No".into());
        let plan = plan_upload::<Unit>(&[r], &[]);
        assert_eq!(plan.rows[0].sort, 7);
        assert!(!plan.rows[0].active);
        assert_eq!(plan.rows[0].unit_type, Some(GeoUnitType::CityCorporation));
    }

    #[test]
    fn active_uses_the_same_words_as_query_flags() {
        let cells = [("off", false), ("on", true), ("y", true), ("  ", true)];
        for (cell, expected) in cells {
            let mut r = row("upazila", "Savar", None);
            r.active = Some(cell.into());
            let plan = plan_upload::<Unit>(&[r], &[]);
            assert_eq!(plan.rows[0].active, expected, "{cell:?}");
        }

        let mut r = row("upazila", "Savar", None);
        r.active = Some("maybe".into());
        let plan = plan_upload::<Unit>(&[r], &[]);
        assert_eq!(plan.rows[0].action, UploadAction::Reject);
    }
}
