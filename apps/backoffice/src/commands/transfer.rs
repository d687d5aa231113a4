//! # Backup Commands
//!
//! Export writes the whole account plus the shared catalog as pretty JSON.
//! Import validates the document first; a rejected file changes nothing.

use pharmadesk_core::transfer::{parse_backup, ImportReport};
use tracing::{debug, info};

use super::notify;
use crate::error::ApiError;
use crate::state::{DbState, NotificationState, WorkspaceState};

/// Serializes the current account to backup JSON.
pub async fn export_backup(
    workspace: &WorkspaceState,
    notifications: &NotificationState,
) -> Result<String, ApiError> {
    debug!("export_backup command");
    let result = workspace
        .read(|ws| ws.export_backup().to_json())
        .await
        .map_err(ApiError::from);

    notify(notifications, result, |json| {
        info!(bytes = json.len(), "Backup exported");
        Some("Backup exported".to_string())
    })
}

/// Parses `json` and replaces the account's data with it.
pub async fn import_backup(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    json: String,
) -> Result<ImportReport, ApiError> {
    debug!(bytes = json.len(), "import_backup command");
    let result = match parse_backup(&json) {
        Ok(doc) => {
            workspace
                .commit(db.inner(), |ws| ws.import_backup(doc))
                .await
        }
        Err(e) => Err(ApiError::from(e)),
    };

    notify(notifications, result, |r| {
        Some(format!(
            "Backup imported: {} bill(s), {} purchase(s), {} new medicine(s)",
            r.bills, r.purchases, r.definitions_added
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::counterparty;
    use crate::commands::fixtures::harness;
    use crate::error::ErrorCode;
    use pharmadesk_core::counterparty::CounterpartyInput;

    #[tokio::test]
    async fn test_export_then_import_restores_stores() {
        let h = harness().await;
        counterparty::add_store(
            &h.db,
            &h.workspace,
            &h.notifications,
            CounterpartyInput {
                name: "Lake Chemists".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let json = export_backup(&h.workspace, &h.notifications).await.unwrap();
        let stores = counterparty::list_stores(&h.workspace).await;

        let lake = stores.iter().find(|s| s.name == "Lake Chemists").unwrap();
        counterparty::delete_store(&h.db, &h.workspace, &h.notifications, lake.id.clone())
            .await
            .unwrap();

        let report = import_backup(&h.db, &h.workspace, &h.notifications, json)
            .await
            .unwrap();
        assert_eq!(report.definitions_added, 0);
        assert_eq!(counterparty::list_stores(&h.workspace).await, stores);
        assert!(h.last_message().starts_with("Backup imported"));
    }

    #[tokio::test]
    async fn test_garbage_is_rejected() {
        let h = harness().await;
        let before = h.workspace.read(|ws| ws.account.clone()).await;
        let err = import_backup(&h.db, &h.workspace, &h.notifications, "{not json".into())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ImportRejected);
        assert_eq!(h.workspace.read(|ws| ws.account.clone()).await, before);
    }
}
