//! # Configuration Commands
//!
//! Read-only access to settings, and the notification queue.

use serde::Serialize;
use tracing::debug;

use crate::state::{ConfigState, Notification, NotificationState, WorkspaceState};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub account_id: String,
    pub currency_symbol: String,
    pub notification_ttl_ms: u64,
    pub sales_tax_enabled: bool,
    pub sales_tax_percent: f64,
}

pub async fn get_config(config: &ConfigState, workspace: &WorkspaceState) -> AppConfig {
    debug!("get_config command");
    let sales = workspace.read(|ws| ws.account.sales.clone()).await;
    AppConfig {
        account_id: config.account_id.clone(),
        currency_symbol: config.currency_symbol.clone(),
        notification_ttl_ms: config.notification_ttl_ms,
        sales_tax_enabled: sales.sales_tax_enabled,
        sales_tax_percent: sales.sales_tax_percent,
    }
}

pub fn list_notifications(notifications: &NotificationState) -> Vec<Notification> {
    notifications.active()
}

pub fn dismiss_notification(notifications: &NotificationState, id: u64) -> bool {
    notifications.dismiss(id)
}
