//! # Purchase Commands
//!
//! Recording stock bought from suppliers. Finalizing a purchase posts each
//! line's rate, discount and batch into the account's medicine pricing.

use pharmadesk_core::purchase::{PurchasePosting, PurchaseSession};
use pharmadesk_core::session::{AddLine, LineUpdate};
use pharmadesk_core::{CoreError, CoreResult, FinalizedPurchase, View, Workspace};
use serde::Serialize;
use tracing::debug;

use super::{notify, warn_discarded, DiscardNotice};
use crate::error::ApiError;
use crate::state::{DbState, NotificationState, WorkspaceState};

/// The purchase being composed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub session: PurchaseSession,
    pub total: f64,
    /// Id the purchase will receive; the edited purchase's own id in edit mode.
    pub purchase_id: u64,
}

impl TryFrom<&Workspace> for PurchaseResponse {
    type Error = CoreError;

    fn try_from(ws: &Workspace) -> CoreResult<Self> {
        Ok(PurchaseResponse {
            session: ws.account.purchase.clone(),
            total: ws.purchase_total()?,
            purchase_id: ws
                .account
                .purchase
                .editing_id()
                .unwrap_or_else(|| ws.next_purchase_id()),
        })
    }
}

pub async fn get_purchase(workspace: &WorkspaceState) -> Result<PurchaseResponse, ApiError> {
    debug!("get_purchase command");
    Ok(workspace.read(|ws| PurchaseResponse::try_from(ws)).await?)
}

/// Finalized purchases, newest first.
pub async fn list_purchases(workspace: &WorkspaceState) -> Vec<FinalizedPurchase> {
    debug!("list_purchases command");
    workspace
        .read(|ws| {
            let mut purchases = ws.account.purchases.clone();
            purchases.sort_by(|a, b| (b.date, b.purchase_id).cmp(&(a.date, a.purchase_id)));
            purchases
        })
        .await
}

pub async fn start_purchase(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    supplier_id: String,
) -> Result<PurchaseResponse, ApiError> {
    debug!(supplier_id = %supplier_id, "start_purchase command");
    let result = workspace
        .commit(db.inner(), |ws| {
            let discarded = ws.start_purchase(&supplier_id)?;
            let discarded = DiscardNotice::resolve(ws, discarded);
            let supplier_name = ws
                .account
                .suppliers
                .iter()
                .find(|s| s.id == supplier_id)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            Ok((discarded, supplier_name, PurchaseResponse::try_from(&*ws)?))
        })
        .await;

    let (discarded, _, response) = notify(notifications, result, |(_, name, _)| {
        Some(format!("Purchasing from {}", name))
    })?;
    warn_discarded(notifications, discarded.as_ref());
    Ok(response)
}

/// Adds a medicine; adding one already on the purchase resets its row.
pub async fn add_purchase_line(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    medicine_id: String,
) -> Result<PurchaseResponse, ApiError> {
    debug!(medicine_id = %medicine_id, "add_purchase_line command");
    let result = workspace
        .commit(db.inner(), |ws| {
            let outcome = ws.add_purchase_line(&medicine_id)?;
            let name = ws.medicine(&medicine_id).map(|m| m.name).unwrap_or_default();
            Ok((outcome, name, PurchaseResponse::try_from(&*ws)?))
        })
        .await;

    let (_, _, response) = notify(notifications, result, |(outcome, name, _)| {
        Some(match outcome {
            AddLine::Reset => format!("{} reset to its current pricing", name),
            _ => format!("Added {}", name),
        })
    })?;
    Ok(response)
}

pub async fn add_purchase_line_by_name(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    name: String,
    company: String,
    medicine_type: String,
) -> Result<PurchaseResponse, ApiError> {
    debug!(name = %name, "add_purchase_line_by_name command");
    let result = workspace
        .commit(db.inner(), |ws| {
            ws.add_purchase_line_by_name(&name, &company, &medicine_type)?;
            Ok(PurchaseResponse::try_from(&*ws)?)
        })
        .await;

    notify(notifications, result, |_| Some(format!("Added {}", name.trim())))
}

pub async fn set_purchase_quantity(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    medicine_id: String,
    quantity: f64,
) -> Result<PurchaseResponse, ApiError> {
    let result = workspace
        .commit(db.inner(), |ws| {
            let update = ws.set_purchase_quantity(&medicine_id, quantity)?;
            Ok((update, PurchaseResponse::try_from(&*ws)?))
        })
        .await;

    let (_, response) = notify(notifications, result, |(update, _)| {
        (*update == LineUpdate::Removed).then(|| "Line removed from the purchase".to_string())
    })?;
    Ok(response)
}

pub async fn set_purchase_rate(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    medicine_id: String,
    rate: Option<f64>,
) -> Result<PurchaseResponse, ApiError> {
    let result = workspace
        .commit(db.inner(), |ws| {
            ws.set_purchase_rate(&medicine_id, rate)?;
            Ok(PurchaseResponse::try_from(&*ws)?)
        })
        .await;

    notify(notifications, result, |_| None)
}

pub async fn set_purchase_discount(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    medicine_id: String,
    discount: Option<f64>,
) -> Result<PurchaseResponse, ApiError> {
    let result = workspace
        .commit(db.inner(), |ws| {
            ws.set_purchase_discount(&medicine_id, discount)?;
            Ok(PurchaseResponse::try_from(&*ws)?)
        })
        .await;

    notify(notifications, result, |_| None)
}

pub async fn set_purchase_batch_no(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    medicine_id: String,
    batch_no: String,
) -> Result<PurchaseResponse, ApiError> {
    let result = workspace
        .commit(db.inner(), |ws| {
            ws.set_purchase_batch_no(&medicine_id, &batch_no)?;
            Ok(PurchaseResponse::try_from(&*ws)?)
        })
        .await;

    notify(notifications, result, |_| None)
}

/// Saves the purchase and posts its pricing into the inventory.
pub async fn finalize_purchase(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
) -> Result<PurchasePosting, ApiError> {
    debug!("finalize_purchase command");
    let result = workspace
        .commit(db.inner(), |ws| ws.finalize_purchase())
        .await;

    let posting = notify(notifications, result, |posting| {
        Some(format!(
            "Purchase #{} saved, pricing updated for {} medicine(s)",
            posting.purchase.purchase_id,
            posting.refreshed.len()
        ))
    })?;
    if !posting.skipped.is_empty() {
        notifications.info(format!(
            "{} medicine(s) kept their pricing from a more recent purchase",
            posting.skipped.len()
        ));
    }
    Ok(posting)
}

pub async fn edit_purchase(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    purchase_id: u64,
) -> Result<PurchaseResponse, ApiError> {
    debug!(purchase_id, "edit_purchase command");
    let result = workspace
        .commit(db.inner(), |ws| {
            let discarded = ws.edit_purchase(purchase_id)?;
            let discarded = DiscardNotice::resolve(ws, discarded);
            Ok((discarded, PurchaseResponse::try_from(&*ws)?))
        })
        .await;

    let (discarded, response) = notify(notifications, result, |_| {
        Some(format!("Editing purchase #{}", purchase_id))
    })?;
    warn_discarded(notifications, discarded.as_ref());
    Ok(response)
}

pub async fn cancel_purchase(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
) -> Result<View, ApiError> {
    debug!("cancel_purchase command");
    let result = workspace
        .commit(db.inner(), |ws| Ok(ws.cancel_purchase()))
        .await;

    notify(notifications, result, |_| Some("Purchase cancelled".to_string()))
}

pub async fn delete_purchase(
    db: &DbState,
    workspace: &WorkspaceState,
    notifications: &NotificationState,
    purchase_id: u64,
) -> Result<FinalizedPurchase, ApiError> {
    debug!(purchase_id, "delete_purchase command");
    let result = workspace
        .commit(db.inner(), |ws| ws.delete_purchase(purchase_id))
        .await;

    notify(notifications, result, |p| {
        Some(format!("Purchase #{} deleted", p.purchase_id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::harness;

    #[tokio::test]
    async fn test_finalize_purchase_posts_pricing() {
        let h = harness().await;
        let (supplier_id, medicine_id) = h
            .workspace
            .read(|ws| (ws.account.suppliers[0].id.clone(), ws.inventory()[0].id.clone()))
            .await;

        start_purchase(&h.db, &h.workspace, &h.notifications, supplier_id)
            .await
            .unwrap();
        add_purchase_line(&h.db, &h.workspace, &h.notifications, medicine_id.clone())
            .await
            .unwrap();
        set_purchase_rate(&h.db, &h.workspace, &h.notifications, medicine_id.clone(), Some(50.0))
            .await
            .unwrap();
        set_purchase_discount(&h.db, &h.workspace, &h.notifications, medicine_id.clone(), Some(10.0))
            .await
            .unwrap();
        set_purchase_batch_no(&h.db, &h.workspace, &h.notifications, medicine_id.clone(), "B1".into())
            .await
            .unwrap();

        let posting = finalize_purchase(&h.db, &h.workspace, &h.notifications)
            .await
            .unwrap();
        assert_eq!(posting.refreshed, vec![medicine_id.clone()]);
        assert_eq!(posting.purchase.total_amount, 45.0);

        let medicine = h.workspace.read(|ws| ws.medicine(&medicine_id)).await.unwrap();
        assert_eq!(medicine.price, Some(50.0));
        assert_eq!(medicine.discount, Some(10.0));
        assert_eq!(medicine.batch_no, "B1");
        assert!(h.last_message().starts_with("Purchase #1 saved"));
    }

    #[tokio::test]
    async fn test_unknown_supplier_is_rejected() {
        let h = harness().await;
        let err = start_purchase(&h.db, &h.workspace, &h.notifications, "nope".into())
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);
        assert_eq!(h.notifications.active().len(), 1);
    }

    #[tokio::test]
    async fn test_switching_supplier_names_the_discarded_one() {
        let h = harness().await;
        let (first, first_name, medicine_id) = h
            .workspace
            .read(|ws| {
                let supplier = &ws.account.suppliers[0];
                (supplier.id.clone(), supplier.name.clone(), ws.inventory()[0].id.clone())
            })
            .await;
        let second = crate::commands::counterparty::add_supplier(
            &h.db,
            &h.workspace,
            &h.notifications,
            pharmadesk_core::counterparty::CounterpartyInput {
                name: "Khan Traders".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        start_purchase(&h.db, &h.workspace, &h.notifications, first).await.unwrap();
        add_purchase_line(&h.db, &h.workspace, &h.notifications, medicine_id)
            .await
            .unwrap();
        start_purchase(&h.db, &h.workspace, &h.notifications, second.id)
            .await
            .unwrap();

        assert_eq!(
            h.last_message(),
            format!("Discarded the previous purchase session for {} (1 line(s))", first_name)
        );
    }
}
