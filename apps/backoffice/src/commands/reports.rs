//! # Report Commands
//!
//! Read-only summaries over finalized bills and purchases.

use pharmadesk_core::reports::{
    profit_report as build_profit_report, purchase_totals_by_supplier, DateRange, ProfitReport,
    SupplierPurchaseTotal,
};
use tracing::debug;

use crate::error::ApiError;
use crate::state::WorkspaceState;

/// Revenue, cost and profit for bills dated within `range`.
pub async fn profit_report(
    workspace: &WorkspaceState,
    range: DateRange,
) -> Result<ProfitReport, ApiError> {
    debug!(?range, "profit_report command");
    Ok(workspace
        .read(|ws| build_profit_report(&ws.account.bills, range))
        .await?)
}

pub async fn purchase_totals(
    workspace: &WorkspaceState,
    range: DateRange,
) -> Result<Vec<SupplierPurchaseTotal>, ApiError> {
    debug!(?range, "purchase_totals command");
    Ok(workspace
        .read(|ws| purchase_totals_by_supplier(&ws.account.purchases, range))
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::harness;
    use crate::commands::purchase;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_empty_account_reports_zero() {
        let h = harness().await;
        let report = profit_report(&h.workspace, DateRange::default()).await.unwrap();
        assert_eq!(report.bill_count, 0);
        assert_eq!(report.margin_percent, 0.0);
    }

    #[tokio::test]
    async fn test_purchase_totals_respect_range() {
        let h = harness().await;
        let (supplier_id, medicine_id) = h
            .workspace
            .read(|ws| (ws.account.suppliers[0].id.clone(), ws.inventory()[0].id.clone()))
            .await;
        purchase::start_purchase(&h.db, &h.workspace, &h.notifications, supplier_id.clone())
            .await
            .unwrap();
        purchase::add_purchase_line(&h.db, &h.workspace, &h.notifications, medicine_id.clone())
            .await
            .unwrap();
        purchase::set_purchase_rate(&h.db, &h.workspace, &h.notifications, medicine_id.clone(), Some(30.0))
            .await
            .unwrap();
        purchase::set_purchase_discount(&h.db, &h.workspace, &h.notifications, medicine_id, None)
            .await
            .unwrap();
        purchase::finalize_purchase(&h.db, &h.workspace, &h.notifications)
            .await
            .unwrap();

        let all = purchase_totals(&h.workspace, DateRange::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].supplier_id, supplier_id);
        assert_eq!(all[0].total_amount, 30.0);

        let later = DateRange {
            from: Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()),
            to: None,
        };
        assert!(purchase_totals(&h.workspace, later).await.unwrap().is_empty());
    }
}
