//! # Inventory Commands
//!
//! The account's view of the shared medicine catalog: searching, adding,
//! editing and removing medicines, plus the bulk discount sheet.

use pharmadesk_core::inventory::{DiscountSheetEntry, MedicineInput};
use pharmadesk_core::Medicine;
use tracing::debug;

use super::notify;
use crate::error::ApiError;
use crate::state::{DbState, NotificationState, WorkspaceState};

/// Inventory sorted by name, filtered by `query` when one is given.
pub async fn list_inventory(workspace: &WorkspaceState, query: Option<String>) -> Vec<Medicine> {
    debug!(query = ?query, "list_inventory command");
    workspace
        .read(|ws| match query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => ws.search_inventory(q),
            _ => ws.inventory(),
        })
        .await
}

pub async fn get_medicine(workspace: &WorkspaceState, id: String) -> Result<Medicine, ApiError> {
    debug!(id = %id, "get_medicine command");
    workspace
        .read(|ws| ws.medicine(&id))
        .await
        .ok_or_else(|| ApiError::not_found("Medicine", &id))
}

pub async fn add_medicine(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    input: MedicineInput,
) -> Result<Medicine, ApiError> {
    debug!(name = %input.name, "add_medicine command");
    let result = workspace
        .commit(db.inner(), |ws| ws.add_medicine(input))
        .await;

    notify(notifications, result, |m| Some(format!("{} added to inventory", m.name)))
}

pub async fn edit_medicine(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    id: String,
    input: MedicineInput,
) -> Result<Medicine, ApiError> {
    debug!(id = %id, "edit_medicine command");
    let result = workspace
        .commit(db.inner(), |ws| ws.edit_medicine(&id, input))
        .await;

    notify(notifications, result, |m| Some(format!("{} updated", m.name)))
}

/// Clears this account's pricing; the catalog entry stays.
pub async fn delete_medicine(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    id: String,
) -> Result<bool, ApiError> {
    debug!(id = %id, "delete_medicine command");
    let result = workspace
        .commit(db.inner(), |ws| {
            let name = ws.medicine(&id).map(|m| m.name).unwrap_or_default();
            Ok((ws.delete_medicine(&id)?, name))
        })
        .await;

    let (removed, _) = notify(notifications, result, |(removed, name)| {
        Some(if *removed {
            format!("Pricing for {} removed", name)
        } else {
            format!("{} had no pricing to remove", name)
        })
    })?;
    Ok(removed)
}

/// Applies every row or none. Returns how many medicines changed.
pub async fn apply_discount_sheet(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    entries: Vec<DiscountSheetEntry>,
) -> Result<usize, ApiError> {
    debug!(entries = entries.len(), "apply_discount_sheet command");
    let result = workspace
        .commit(db.inner(), |ws| ws.apply_discount_sheet(&entries))
        .await;

    notify(notifications, result, |changed| {
        Some(format!("Discounts updated for {} medicine(s)", changed))
    })
}
