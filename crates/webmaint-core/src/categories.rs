//! Bulk activation of catalog categories.
//!
//! Reads the `categories` table, counts rows that are not active, flips them
//! all to `is_active = true` in one filtered update and reads the table back
//! so the caller can show the final state.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{MaintError, MaintResult};
use crate::supabase::SupabaseClient;

/// Table holding the category tree.
pub const CATEGORIES_TABLE: &str = "categories";

const SELECT_QUERY: &str = "select=id,name,name_ar,is_active,parent_id&order=created_at.asc";

/// Rows where `is_active` is false or unset.
const INACTIVE_FILTER: &str = "or=(is_active.eq.false,is_active.is.null)";

/// One row of the categories table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub name_ar: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub parent_id: Option<Value>,
}

impl Category {
    pub fn active(&self) -> bool {
        self.is_active == Some(true)
    }

    /// True for rows without a parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.as_ref().map_or(true, Value::is_null)
    }

    /// Name for display, falling back to the id.
    pub fn label(&self) -> String {
        match (&self.name, &self.name_ar) {
            (Some(name), Some(ar)) if !ar.is_empty() => format!("{} ({})", name, ar),
            (Some(name), _) => name.clone(),
            (None, _) => self.id.to_string(),
        }
    }
}

/// Storage operations needed to activate categories.
pub trait CategoryStore {
    /// All categories in creation order.
    fn list_categories(&self) -> MaintResult<Vec<Category>>;

    /// Mark every inactive category active and return the updated rows.
    fn activate_inactive(&self) -> MaintResult<Vec<Category>>;
}

fn parse_rows(value: Value) -> MaintResult<Vec<Category>> {
    match value {
        Value::Null => Ok(Vec::new()),
        rows => serde_json::from_value(rows)
            .map_err(|e| MaintError::remote(format!("unexpected categories payload: {}", e), None)),
    }
}

impl CategoryStore for SupabaseClient {
    fn list_categories(&self) -> MaintResult<Vec<Category>> {
        parse_rows(self.select(CATEGORIES_TABLE, SELECT_QUERY)?)
    }

    fn activate_inactive(&self) -> MaintResult<Vec<Category>> {
        parse_rows(self.update(
            CATEGORIES_TABLE,
            INACTIVE_FILTER,
            &json!({ "is_active": true }),
        )?)
    }
}

/// Result of an activation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivationReport {
    /// Rows read before the update.
    pub total: usize,
    /// Rows that were not active before the update.
    pub inactive_before: usize,
    /// Rows the update touched. Zero for a dry run.
    pub activated: usize,
    pub dry_run: bool,
    /// Table contents after the update (before it, for a dry run).
    pub categories: Vec<Category>,
}

impl ActivationReport {
    pub fn active_count(&self) -> usize {
        self.categories.iter().filter(|c| c.active()).count()
    }
}

/// Activate every inactive category.
///
/// An empty table and a table with nothing to activate both succeed without
/// issuing an update.
pub fn activate_categories<S>(store: &S, dry_run: bool) -> MaintResult<ActivationReport>
where
    S: CategoryStore + ?Sized,
{
    let before = store.list_categories()?;
    let inactive_before = before.iter().filter(|c| !c.active()).count();
    debug!(
        "{} categories, {} inactive",
        before.len(),
        inactive_before
    );

    let mut report = ActivationReport {
        total: before.len(),
        inactive_before,
        activated: 0,
        dry_run,
        categories: Vec::new(),
    };

    if inactive_before == 0 || dry_run {
        report.categories = before;
        return Ok(report);
    }

    let updated = store.activate_inactive()?;
    report.activated = updated.len();
    info!("activated {} categories", report.activated);

    report.categories = store.list_categories()?;
    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================
