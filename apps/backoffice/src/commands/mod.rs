//! # Commands Module
//!
//! Every operation the back-office frontend can invoke.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs          ◄─── You are here (outcome → notification helper)
//! ├── billing.rs      ◄─── Bill sessions, finalize, history
//! ├── purchase.rs     ◄─── Purchase sessions, posting, history
//! ├── inventory.rs    ◄─── Medicines and the discount sheet
//! ├── counterparty.rs ◄─── Medical stores and suppliers
//! ├── navigation.rs   ◄─── View changes (edit auto-cancel)
//! ├── transfer.rs     ◄─── Backup export and import
//! ├── reports.rs      ◄─── Profit and purchase totals
//! └── config.rs       ◄─── Configuration and notifications
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  finalize_bill(db, workspace, notifications, bill_no)                   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  workspace.commit(db, |ws| ws.finalize_bill(bill_no))                   │
//! │         │                                                               │
//! │         ├── Ok  ──► notifications.success("Bill #5 saved")              │
//! │         │                                                               │
//! │         └── Err ──► notifications.error(&api_error)                     │
//! │                                                                         │
//! │  Result<T, ApiError> is returned either way                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-field line edits (quantity, rate, discount) notify only when they
//! fail or remove a line; everything else notifies on success too.

pub mod billing;
pub mod config;
pub mod counterparty;
pub mod inventory;
pub mod navigation;
pub mod purchase;
pub mod reports;
pub mod transfer;

use pharmadesk_core::session::Discarded;
use pharmadesk_core::Workspace;

use crate::error::ApiError;
use crate::state::NotificationState;

/// Turns a command result into a notification and passes it through.
///
/// `message` produces the success text; `None` keeps a success silent.
pub(crate) fn notify<T, F>(
    notifications: &NotificationState,
    result: Result<T, ApiError>,
    message: F,
) -> Result<T, ApiError>
where
    F: FnOnce(&T) -> Option<String>,
{
    match &result {
        Ok(value) => {
            if let Some(text) = message(value) {
                notifications.success(text);
            }
        }
        Err(err) => {
            notifications.error(err);
        }
    }
    result
}

/// A discarded session with its counterparty's name resolved while the
/// workspace lock is still held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DiscardNotice {
    pub discarded: Discarded,
    pub counterparty: Option<String>,
}

impl DiscardNotice {
    pub(crate) fn resolve(ws: &Workspace, discarded: Option<Discarded>) -> Option<Self> {
        discarded.map(|discarded| {
            let counterparty = discarded
                .counterparty_id
                .as_deref()
                .and_then(|id| ws.counterparty_name(discarded.kind, id))
                .map(str::to_string);
            DiscardNotice {
                discarded,
                counterparty,
            }
        })
    }
}

/// Warns that starting a session replaced the one in progress, naming the
/// previous store or supplier.
pub(crate) fn warn_discarded(notifications: &NotificationState, notice: Option<&DiscardNotice>) {
    let Some(DiscardNotice {
        discarded,
        counterparty,
    }) = notice
    else {
        return;
    };
    let target = match counterparty {
        Some(name) => format!("{} session for {}", discarded.kind, name),
        None => format!("{} session", discarded.kind),
    };
    notifications.warning(format!(
        "Discarded the previous {} ({} line(s))",
        target, discarded.line_count
    ));
}
