//! # Counterparty Commands
//!
//! Medical stores (billed) and suppliers (purchased from). Deleting one
//! that has a session in progress discards that session.

use pharmadesk_core::counterparty::CounterpartyInput;
use pharmadesk_core::{MedicalStore, Supplier};
use tracing::debug;

use super::notify;
use crate::error::ApiError;
use crate::state::{DbState, NotificationState, WorkspaceState};

// =============================================================================
// Medical Stores
// =============================================================================

pub async fn list_stores(workspace: &WorkspaceState) -> Vec<MedicalStore> {
    workspace.read(|ws| ws.account.stores.clone()).await
}

pub async fn add_store(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    input: CounterpartyInput,
) -> Result<MedicalStore, ApiError> {
    debug!(name = %input.name, "add_store command");
    let result = workspace.commit(db.inner(), |ws| ws.add_store(&input)).await;
    notify(notifications, result, |s| Some(format!("Store {} added", s.name)))
}

pub async fn update_store(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    id: String,
    input: CounterpartyInput,
) -> Result<MedicalStore, ApiError> {
    debug!(id = %id, "update_store command");
    let result = workspace
        .commit(db.inner(), |ws| ws.update_store(&id, &input))
        .await;
    notify(notifications, result, |s| Some(format!("Store {} updated", s.name)))
}

pub async fn delete_store(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    id: String,
) -> Result<MedicalStore, ApiError> {
    debug!(id = %id, "delete_store command");
    let result = workspace.commit(db.inner(), |ws| ws.delete_store(&id)).await;
    notify(notifications, result, |s| Some(format!("Store {} deleted", s.name)))
}

// =============================================================================
// Suppliers
// =============================================================================

pub async fn list_suppliers(workspace: &WorkspaceState) -> Vec<Supplier> {
    workspace.read(|ws| ws.account.suppliers.clone()).await
}

pub async fn add_supplier(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    input: CounterpartyInput,
) -> Result<Supplier, ApiError> {
    debug!(name = %input.name, "add_supplier command");
    let result = workspace
        .commit(db.inner(), |ws| ws.add_supplier(&input))
        .await;
    notify(notifications, result, |s| Some(format!("Supplier {} added", s.name)))
}

pub async fn update_supplier(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    id: String,
    input: CounterpartyInput,
) -> Result<Supplier, ApiError> {
    debug!(id = %id, "update_supplier command");
    let result = workspace
        .commit(db.inner(), |ws| ws.update_supplier(&id, &input))
        .await;
    notify(notifications, result, |s| Some(format!("Supplier {} updated", s.name)))
}

pub async fn delete_supplier(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    id: String,
) -> Result<Supplier, ApiError> {
    debug!(id = %id, "delete_supplier command");
    let result = workspace
        .commit(db.inner(), |ws| ws.delete_supplier(&id))
        .await;
    notify(notifications, result, |s| Some(format!("Supplier {} deleted", s.name)))
}
