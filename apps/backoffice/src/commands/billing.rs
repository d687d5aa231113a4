//! # Billing Commands
//!
//! Composing, finalizing, editing and deleting bills.
//!
//! ## Bill Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Bill Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐  start_bill  ┌──────────┐ finalize_bill ┌──────────────┐  │
//! │  │   Idle   │─────────────►│  Active  │──────────────►│ FinalizedBill│  │
//! │  └──────────┘              └──────────┘               └──────┬───────┘  │
//! │       ▲                      │    ▲                          │          │
//! │       │ cancel_bill          │    │ add / set / remove       │          │
//! │       └──────────────────────┘    └──────────                │          │
//! │                                                               │          │
//! │            edit_bill(bill_no) ◄───────────────────────────────┘          │
//! │            (Active, keeps the original date on re-finalize)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use pharmadesk_core::billing::BillingSession;
use pharmadesk_core::money::CartTotals;
use pharmadesk_core::session::{AddLine, LineUpdate};
use pharmadesk_core::{
    BillLayoutSettings, CoreError, CoreResult, FinalizedBill, SalesSettings, View, Workspace,
};
use serde::Serialize;
use tracing::debug;

use super::{notify, warn_discarded, DiscardNotice};
use crate::error::ApiError;
use crate::state::{DbState, NotificationState, WorkspaceState};

/// The bill being composed, with rounded totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingResponse {
    pub session: BillingSession,
    pub totals: CartTotals,
    /// Number offered for a new bill; the edited bill's own number in edit mode.
    pub suggested_bill_no: u64,
}

impl TryFrom<&Workspace> for BillingResponse {
    type Error = CoreError;

    fn try_from(ws: &Workspace) -> CoreResult<Self> {
        Ok(BillingResponse {
            session: ws.account.billing.clone(),
            totals: ws.bill_totals()?,
            suggested_bill_no: ws
                .account
                .billing
                .editing_id()
                .unwrap_or_else(|| ws.suggest_bill_number()),
        })
    }
}

pub async fn get_billing(workspace: &WorkspaceState) -> Result<BillingResponse, ApiError> {
    debug!("get_billing command");
    Ok(workspace.read(|ws| BillingResponse::try_from(ws)).await?)
}

/// Finalized bills, newest first.
pub async fn list_bills(workspace: &WorkspaceState) -> Vec<FinalizedBill> {
    debug!("list_bills command");
    workspace
        .read(|ws| {
            let mut bills = ws.account.bills.clone();
            bills.sort_by(|a, b| (b.date, b.bill_no).cmp(&(a.date, a.bill_no)));
            bills
        })
        .await
}

/// Selects the store to bill. Switching stores discards the current cart.
pub async fn start_bill(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    store_id: String,
) -> Result<BillingResponse, ApiError> {
    debug!(store_id = %store_id, "start_bill command");
    let result = workspace
        .commit(db.inner(), |ws| {
            let discarded = ws.start_bill(&store_id)?;
            let discarded = DiscardNotice::resolve(ws, discarded);
            let store_name = ws
                .account
                .stores
                .iter()
                .find(|s| s.id == store_id)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            Ok((discarded, store_name, BillingResponse::try_from(&*ws)?))
        })
        .await;

    let (discarded, _, response) = notify(notifications, result, |(_, name, _)| {
        Some(format!("Billing {}", name))
    })?;
    warn_discarded(notifications, discarded.as_ref());
    Ok(response)
}

pub async fn add_bill_line(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    medicine_id: String,
) -> Result<BillingResponse, ApiError> {
    debug!(medicine_id = %medicine_id, "add_bill_line command");
    let result = workspace
        .commit(db.inner(), |ws| {
            let outcome = ws.add_bill_line(&medicine_id)?;
            let name = ws.medicine(&medicine_id).map(|m| m.name).unwrap_or_default();
            Ok((outcome, name, BillingResponse::try_from(&*ws)?))
        })
        .await;

    let (_, _, response) = notify(notifications, result, |(outcome, name, _)| {
        Some(match outcome {
            AddLine::AlreadyPresent => format!("{} is already on the bill", name),
            _ => format!("Added {}", name),
        })
    })?;
    Ok(response)
}

/// Adds a line for a medicine typed by name, creating the catalog entry
/// when the name is new.
pub async fn add_bill_line_by_name(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    name: String,
    company: String,
    medicine_type: String,
) -> Result<BillingResponse, ApiError> {
    debug!(name = %name, "add_bill_line_by_name command");
    let result = workspace
        .commit(db.inner(), |ws| {
            ws.add_bill_line_by_name(&name, &company, &medicine_type)?;
            Ok(BillingResponse::try_from(&*ws)?)
        })
        .await;

    notify(notifications, result, |_| Some(format!("Added {}", name.trim())))
}

pub async fn set_bill_quantity(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    medicine_id: String,
    quantity: f64,
) -> Result<BillingResponse, ApiError> {
    let result = workspace
        .commit(db.inner(), |ws| {
            let update = ws.set_bill_quantity(&medicine_id, quantity)?;
            Ok((update, BillingResponse::try_from(&*ws)?))
        })
        .await;

    let (_, response) = notify(notifications, result, |(update, _)| {
        (*update == LineUpdate::Removed).then(|| "Line removed from the bill".to_string())
    })?;
    Ok(response)
}

pub async fn set_bill_discount(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    medicine_id: String,
    discount: Option<f64>,
) -> Result<BillingResponse, ApiError> {
    let result = workspace
        .commit(db.inner(), |ws| {
            ws.set_bill_discount(&medicine_id, discount)?;
            Ok(BillingResponse::try_from(&*ws)?)
        })
        .await;

    notify(notifications, result, |_| None)
}

pub async fn set_bill_rate(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    medicine_id: String,
    rate: Option<f64>,
) -> Result<BillingResponse, ApiError> {
    let result = workspace
        .commit(db.inner(), |ws| {
            ws.set_bill_rate(&medicine_id, rate)?;
            Ok(BillingResponse::try_from(&*ws)?)
        })
        .await;

    notify(notifications, result, |_| None)
}

pub async fn remove_bill_line(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    medicine_id: String,
) -> Result<BillingResponse, ApiError> {
    debug!(medicine_id = %medicine_id, "remove_bill_line command");
    let result = workspace
        .commit(db.inner(), |ws| {
            ws.remove_bill_line(&medicine_id)?;
            Ok(BillingResponse::try_from(&*ws)?)
        })
        .await;

    notify(notifications, result, |_| Some("Line removed from the bill".to_string()))
}

/// Changes sales tax settings; open bill lines are recalculated.
pub async fn update_sales_settings(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    settings: SalesSettings,
) -> Result<BillingResponse, ApiError> {
    debug!(?settings, "update_sales_settings command");
    let result = workspace
        .commit(db.inner(), |ws| {
            ws.update_sales_settings(settings)?;
            Ok(BillingResponse::try_from(&*ws)?)
        })
        .await;

    notify(notifications, result, |_| Some("Sales settings saved".to_string()))
}

pub async fn get_bill_layout(workspace: &WorkspaceState) -> BillLayoutSettings {
    workspace.read(|ws| ws.account.bill_layout.clone()).await
}

pub async fn update_bill_layout(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    layout: BillLayoutSettings,
) -> Result<BillLayoutSettings, ApiError> {
    debug!("update_bill_layout command");
    let result = workspace
        .commit(db.inner(), |ws| Ok(ws.update_bill_layout(layout).clone()))
        .await;

    notify(notifications, result, |_| Some("Bill layout saved".to_string()))
}

/// Saves the bill under `bill_no` and clears the session.
pub async fn finalize_bill(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    bill_no: i64,
) -> Result<FinalizedBill, ApiError> {
    debug!(bill_no, "finalize_bill command");
    let result = workspace
        .commit(db.inner(), |ws| ws.finalize_bill(bill_no))
        .await;

    notify(notifications, result, |bill| {
        Some(format!(
            "Bill #{} saved for {} ({} items)",
            bill.bill_no,
            bill.store_name,
            bill.items.len()
        ))
    })
}

/// Loads a finalized bill into the session for editing.
pub async fn edit_bill(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    bill_no: u64,
) -> Result<BillingResponse, ApiError> {
    debug!(bill_no, "edit_bill command");
    let result = workspace
        .commit(db.inner(), |ws| {
            let discarded = ws.edit_bill(bill_no)?;
            let discarded = DiscardNotice::resolve(ws, discarded);
            Ok((discarded, BillingResponse::try_from(&*ws)?))
        })
        .await;

    let (discarded, response) =
        notify(notifications, result, |_| Some(format!("Editing bill #{}", bill_no)))?;
    warn_discarded(notifications, discarded.as_ref());
    Ok(response)
}

/// Drops the session; returns the view the frontend should show next.
pub async fn cancel_bill(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
) -> Result<View, ApiError> {
    debug!("cancel_bill command");
    let result = workspace
        .commit(db.inner(), |ws| Ok(ws.cancel_bill()))
        .await;

    notify(notifications, result, |_| Some("Bill cancelled".to_string()))
}

pub async fn delete_bill(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    bill_no: u64,
) -> Result<FinalizedBill, ApiError> {
    debug!(bill_no, "delete_bill command");
    let result = workspace
        .commit(db.inner(), |ws| ws.delete_bill(bill_no))
        .await;

    notify(notifications, result, |bill| {
        Some(format!("Bill #{} deleted", bill.bill_no))
    })
}
