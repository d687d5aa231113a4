//! # Navigation Commands
//!
//! Leaving an entry screen while editing a finalized bill or purchase
//! abandons the edit. New-record sessions survive navigation.

use pharmadesk_core::session::AutoCancelled;
use pharmadesk_core::{SessionKind, View};
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::{DbState, NotificationState, WorkspaceState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResponse {
    pub view: View,
    /// Edit sessions dropped by this navigation.
    pub cancelled: Vec<AutoCancelled>,
}

fn cancelled_message(cancelled: &AutoCancelled) -> String {
    match cancelled.kind {
        SessionKind::Billing => format!("Edit of bill #{} cancelled", cancelled.editing_id),
        SessionKind::Purchase => format!("Edit of purchase #{} cancelled", cancelled.editing_id),
    }
}

pub async fn navigate(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    view: View,
) -> Result<NavigationResponse, ApiError> {
    debug!(?view, "navigate command");
    let result = workspace
        .commit(db.inner(), |ws| Ok(ws.on_view_change(view)))
        .await;

    match result {
        Ok(cancelled) => {
            for c in &cancelled {
                notifications.info(cancelled_message(c));
            }
            Ok(NavigationResponse { view, cancelled })
        }
        Err(err) => {
            notifications.error(&err);
            Err(err)
        }
    }
}
