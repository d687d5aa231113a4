//! # Command Line Surface
//!
//! Maps `pharmadesk-backoffice <command> [args]` onto the command layer.
//! Each invocation opens the account, runs one command and persists, so a
//! bill or purchase composed over several invocations resumes where the
//! previous one stopped. Results go to stdout as JSON; notifications go to
//! stderr.
//!
//! ```text
//! pharmadesk-backoffice bill start store-1
//! pharmadesk-backoffice bill add med-42
//! pharmadesk-backoffice bill quantity med-42 3
//! pharmadesk-backoffice bill finalize
//! ```

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use pharmadesk_core::counterparty::CounterpartyInput;
use pharmadesk_core::inventory::{DiscountSheetEntry, MedicineInput};
use pharmadesk_core::reports::{DateRange, ProfitReport, SupplierPurchaseTotal};
use pharmadesk_core::{BillLayoutSettings, SalesSettings, View};
use pharmadesk_db::DbError;
use serde::Serialize;
use thiserror::Error;

use crate::commands::{
    billing, config, counterparty, inventory, navigation, purchase, reports, transfer,
};
use crate::error::ApiError;
use crate::state::{ConfigState, DbState, NotificationState, WorkspaceState};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Arguments
// =============================================================================

/// Pharmacy back office: inventory, billing, purchasing and reports.
#[derive(Debug, Parser)]
#[command(name = "pharmadesk-backoffice", version, about)]
pub struct Cli {
    /// Defaults to `status`
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Status)
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Account summary
    Status,
    /// Configuration and sales tax in effect
    Config,
    /// Search and maintain the inventory
    #[command(subcommand)]
    Medicine(MedicineCommand),
    /// Medical stores that get billed
    #[command(subcommand)]
    Store(CounterpartyCommand),
    /// Suppliers that medicines are purchased from
    #[command(subcommand)]
    Supplier(CounterpartyCommand),
    /// Compose, finalize and manage bills
    #[command(subcommand)]
    Bill(BillCommand),
    /// Compose, finalize and manage purchases
    #[command(subcommand)]
    Purchase(PurchaseCommand),
    /// Switch the current screen (dashboard, billing, bill-history, ...)
    Navigate {
        #[arg(value_parser = parse_view)]
        view: View,
    },
    /// Sales tax and printed bill settings
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Write a backup file
    Export { path: PathBuf },
    /// Restore a backup file
    Import { path: PathBuf },
    /// Profit and purchase totals
    Report {
        /// First day included (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,
        /// Last day included (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum MedicineCommand {
    /// List the inventory, or search it by name, company or tag
    List { query: Vec<String> },
    /// One medicine with this account's pricing
    Show { id: String },
    Add(MedicineArgs),
    Edit {
        id: String,
        #[command(flatten)]
        fields: MedicineArgs,
    },
    /// Clear this account's pricing; the catalog entry stays
    Delete { id: String },
    /// Set sale and purchase discounts in bulk, all rows or none
    Discounts {
        /// ID:SALE:PURCHASE, an empty percentage clears it
        #[arg(required = true, value_parser = parse_sheet_entry)]
        entries: Vec<DiscountSheetEntry>,
    },
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct MedicineArgs {
    pub name: String,
    #[arg(long, default_value = "")]
    pub company: String,
    #[arg(long = "type", default_value = "")]
    pub medicine_type: String,
    /// Repeat for several tags
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Selling price
    #[arg(long)]
    pub price: Option<f64>,
    /// Purchase discount %
    #[arg(long)]
    pub discount: Option<f64>,
    /// Sale discount %
    #[arg(long)]
    pub sale_discount: Option<f64>,
    #[arg(long, default_value = "")]
    pub batch_no: String,
}

impl From<MedicineArgs> for MedicineInput {
    fn from(args: MedicineArgs) -> Self {
        Self {
            name: args.name,
            company: args.company,
            medicine_type: args.medicine_type,
            tags: args.tags.into_iter().collect(),
            price: args.price,
            discount: args.discount,
            sale_discount: args.sale_discount,
            batch_no: args.batch_no,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum CounterpartyCommand {
    List,
    Add(CounterpartyArgs),
    Update {
        id: String,
        #[command(flatten)]
        fields: CounterpartyArgs,
    },
    Delete { id: String },
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct CounterpartyArgs {
    pub name: String,
    #[arg(long, default_value = "")]
    pub address: String,
    #[arg(long, default_value = "")]
    pub phone: String,
}

impl From<CounterpartyArgs> for CounterpartyInput {
    fn from(args: CounterpartyArgs) -> Self {
        Self {
            name: args.name,
            address: args.address,
            phone: args.phone,
        }
    }
}

/// A medicine added by name, created in the catalog when it is new.
#[derive(Debug, Clone, PartialEq, Args)]
pub struct NewLineArgs {
    pub name: String,
    #[arg(long, default_value = "")]
    pub company: String,
    #[arg(long = "type", default_value = "")]
    pub medicine_type: String,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum BillCommand {
    /// The bill being composed, with totals
    Show,
    /// Finalized bills, newest first
    List,
    /// Start billing a store
    Start { store_id: String },
    /// Add an inventory medicine
    Add { medicine_id: String },
    AddNew(NewLineArgs),
    /// Set a line's quantity; zero or below removes the line
    Quantity {
        medicine_id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: f64,
    },
    /// Override a line's sale discount %, or restore the default
    Discount {
        medicine_id: String,
        discount: Option<f64>,
    },
    /// Set a line's rate, or clear it
    Rate {
        medicine_id: String,
        rate: Option<f64>,
    },
    Remove { medicine_id: String },
    /// Save the bill under BILL_NO, or the suggested number
    Finalize {
        #[arg(allow_negative_numbers = true)]
        bill_no: Option<i64>,
    },
    /// Reopen a finalized bill for editing
    Edit { bill_no: u64 },
    Cancel,
    Delete { bill_no: u64 },
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum PurchaseCommand {
    /// The purchase being composed, with its total
    Show,
    /// Finalized purchases, newest first
    List,
    /// Start a purchase from a supplier
    Start { supplier_id: String },
    /// Add an inventory medicine
    Add { medicine_id: String },
    AddNew(NewLineArgs),
    /// Set a row's quantity; zero or below removes the row
    Quantity {
        medicine_id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: f64,
    },
    /// Set a row's rate, or clear it
    Rate {
        medicine_id: String,
        rate: Option<f64>,
    },
    /// Set a row's discount %, or clear it
    Discount {
        medicine_id: String,
        discount: Option<f64>,
    },
    Batch {
        medicine_id: String,
        #[arg(default_value = "")]
        batch_no: String,
    },
    /// Save the purchase and post its prices to the inventory
    Finalize,
    /// Reopen a finalized purchase for editing
    Edit { purchase_id: u64 },
    Cancel,
    Delete { purchase_id: u64 },
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum SettingsCommand {
    /// Charge sales tax at PERCENT, or stop with --off
    SalesTax {
        #[arg(required_unless_present = "off", conflicts_with = "off")]
        percent: Option<f64>,
        #[arg(long)]
        off: bool,
    },
    /// Printed bill header and footer
    Layout,
    /// Change the printed bill header and footer; omitted fields keep their value
    SetLayout(LayoutArgs),
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct LayoutArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub license_no: Option<String>,
    #[arg(long)]
    pub footer: Option<String>,
    #[arg(long)]
    pub show_batch_no: Option<bool>,
    #[arg(long)]
    pub show_company: Option<bool>,
}

impl LayoutArgs {
    fn apply(self, mut layout: BillLayoutSettings) -> BillLayoutSettings {
        if let Some(v) = self.name {
            layout.business_name = v;
        }
        if let Some(v) = self.address {
            layout.business_address = v;
        }
        if let Some(v) = self.phone {
            layout.business_phone = v;
        }
        if let Some(v) = self.license_no {
            layout.license_no = v;
        }
        if let Some(v) = self.footer {
            layout.footer_note = v;
        }
        if let Some(v) = self.show_batch_no {
            layout.show_batch_no = v;
        }
        if let Some(v) = self.show_company {
            layout.show_company = v;
        }
        layout
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{value}', expected YYYY-MM-DD"))
}

/// Accepts the serialized view names with `-` in place of `_`.
fn parse_view(value: &str) -> Result<View, String> {
    serde_json::from_value(serde_json::Value::String(value.replace('-', "_")))
        .map_err(|_| format!("unknown view '{value}'"))
}

fn parse_sheet_entry(value: &str) -> Result<DiscountSheetEntry, String> {
    let mut parts = value.split(':');
    let (Some(id), Some(sale), Some(purchase), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected ID:SALE:PURCHASE, got '{value}'"));
    };
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing medicine id in '{value}'"));
    }

    let percent = |raw: &str| -> Result<Option<f64>, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse()
            .map(Some)
            .map_err(|_| format!("'{raw}' is not a percentage"))
    };

    Ok(DiscountSheetEntry {
        medicine_id: id.to_string(),
        sale_discount: percent(sale)?,
        discount: percent(purchase)?,
    })
}

fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> DateRange {
    DateRange {
        from: from.map(start_of_day),
        to: to.map(end_of_day),
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    date.and_time(last).and_utc()
}

// =============================================================================
// Execution
// =============================================================================

/// Everything a CLI invocation can reach.
pub struct App {
    pub config: ConfigState,
    pub db: DbState,
    pub workspace: WorkspaceState,
    pub notifications: NotificationState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Status {
    account_id: String,
    medicines: usize,
    priced_medicines: usize,
    stores: usize,
    suppliers: usize,
    bills: usize,
    purchases: usize,
    revenue: String,
    profit: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    profit: ProfitReport,
    purchases_by_supplier: Vec<SupplierPurchaseTotal>,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn execute(app: &App, command: Command) -> Result<(), AppError> {
    let outcome = dispatch(app, command).await;

    for n in config::list_notifications(&app.notifications) {
        eprintln!("[{:?}] {}", n.severity, n.message);
    }
    outcome
}

async fn dispatch(app: &App, command: Command) -> Result<(), AppError> {
    let App {
        config: cfg,
        db,
        workspace,
        notifications,
    } = app;

    match command {
        Command::Status => {
            let profit = reports::profit_report(workspace, DateRange::default()).await?;
            let status = workspace
                .read(|ws| {
                    let medicines = ws.medicines();
                    Status {
                        account_id: cfg.account_id.clone(),
                        priced_medicines: medicines.iter().filter(|m| m.price.is_some()).count(),
                        medicines: medicines.len(),
                        stores: ws.account.stores.len(),
                        suppliers: ws.account.suppliers.len(),
                        bills: ws.account.bills.len(),
                        purchases: ws.account.purchases.len(),
                        revenue: cfg.format_currency(profit.revenue),
                        profit: cfg.format_currency(profit.profit),
                    }
                })
                .await;
            print_json(&status)
        }
        Command::Config => print_json(&config::get_config(cfg, workspace).await),
        Command::Medicine(action) => run_medicine(app, action).await,
        Command::Store(action) => run_store(app, action).await,
        Command::Supplier(action) => run_supplier(app, action).await,
        Command::Bill(action) => run_bill(app, action).await,
        Command::Purchase(action) => run_purchase(app, action).await,
        Command::Navigate { view } => {
            print_json(&navigation::navigate(db, workspace, notifications, view).await?)
        }
        Command::Settings(action) => run_settings(app, action).await,
        Command::Export { path } => {
            let json = transfer::export_backup(workspace, notifications).await?;
            Ok(fs::write(&path, json)?)
        }
        Command::Import { path } => {
            let json = fs::read_to_string(&path)?;
            print_json(&transfer::import_backup(db, workspace, notifications, json).await?)
        }
        Command::Report { from, to } => {
            let range = date_range(from, to);
            let report = Report {
                profit: reports::profit_report(workspace, range).await?,
                purchases_by_supplier: reports::purchase_totals(workspace, range).await?,
            };
            print_json(&report)
        }
    }
}

async fn run_medicine(app: &App, action: MedicineCommand) -> Result<(), AppError> {
    let App {
        db,
        workspace,
        notifications: n,
        ..
    } = app;

    match action {
        MedicineCommand::List { query } => {
            let query = (!query.is_empty()).then(|| query.join(" "));
            print_json(&inventory::list_inventory(workspace, query).await)
        }
        MedicineCommand::Show { id } => print_json(&inventory::get_medicine(workspace, id).await?),
        MedicineCommand::Add(fields) => {
            print_json(&inventory::add_medicine(db, workspace, n, fields.into()).await?)
        }
        MedicineCommand::Edit { id, fields } => {
            print_json(&inventory::edit_medicine(db, workspace, n, id, fields.into()).await?)
        }
        MedicineCommand::Delete { id } => {
            print_json(&inventory::delete_medicine(db, workspace, n, id).await?)
        }
        MedicineCommand::Discounts { entries } => {
            print_json(&inventory::apply_discount_sheet(db, workspace, n, entries).await?)
        }
    }
}

async fn run_store(app: &App, action: CounterpartyCommand) -> Result<(), AppError> {
    let App {
        db,
        workspace,
        notifications: n,
        ..
    } = app;

    match action {
        CounterpartyCommand::List => print_json(&counterparty::list_stores(workspace).await),
        CounterpartyCommand::Add(fields) => {
            print_json(&counterparty::add_store(db, workspace, n, fields.into()).await?)
        }
        CounterpartyCommand::Update { id, fields } => {
            print_json(&counterparty::update_store(db, workspace, n, id, fields.into()).await?)
        }
        CounterpartyCommand::Delete { id } => {
            print_json(&counterparty::delete_store(db, workspace, n, id).await?)
        }
    }
}

async fn run_supplier(app: &App, action: CounterpartyCommand) -> Result<(), AppError> {
    let App {
        db,
        workspace,
        notifications: n,
        ..
    } = app;

    match action {
        CounterpartyCommand::List => print_json(&counterparty::list_suppliers(workspace).await),
        CounterpartyCommand::Add(fields) => {
            print_json(&counterparty::add_supplier(db, workspace, n, fields.into()).await?)
        }
        CounterpartyCommand::Update { id, fields } => {
            print_json(&counterparty::update_supplier(db, workspace, n, id, fields.into()).await?)
        }
        CounterpartyCommand::Delete { id } => {
            print_json(&counterparty::delete_supplier(db, workspace, n, id).await?)
        }
    }
}

async fn run_bill(app: &App, action: BillCommand) -> Result<(), AppError> {
    let App {
        db,
        workspace,
        notifications: n,
        ..
    } = app;

    match action {
        BillCommand::Show => print_json(&billing::get_billing(workspace).await?),
        BillCommand::List => print_json(&billing::list_bills(workspace).await),
        BillCommand::Start { store_id } => {
            print_json(&billing::start_bill(db, workspace, n, store_id).await?)
        }
        BillCommand::Add { medicine_id } => {
            print_json(&billing::add_bill_line(db, workspace, n, medicine_id).await?)
        }
        BillCommand::AddNew(line) => print_json(
            &billing::add_bill_line_by_name(
                db,
                workspace,
                n,
                line.name,
                line.company,
                line.medicine_type,
            )
            .await?,
        ),
        BillCommand::Quantity {
            medicine_id,
            quantity,
        } => print_json(&billing::set_bill_quantity(db, workspace, n, medicine_id, quantity).await?),
        BillCommand::Discount {
            medicine_id,
            discount,
        } => print_json(&billing::set_bill_discount(db, workspace, n, medicine_id, discount).await?),
        BillCommand::Rate { medicine_id, rate } => {
            print_json(&billing::set_bill_rate(db, workspace, n, medicine_id, rate).await?)
        }
        BillCommand::Remove { medicine_id } => {
            print_json(&billing::remove_bill_line(db, workspace, n, medicine_id).await?)
        }
        BillCommand::Finalize { bill_no } => {
            let bill_no = match bill_no {
                Some(no) => no,
                None => {
                    let suggested = billing::get_billing(workspace).await?.suggested_bill_no;
                    i64::try_from(suggested).unwrap_or(i64::MAX)
                }
            };
            print_json(&billing::finalize_bill(db, workspace, n, bill_no).await?)
        }
        BillCommand::Edit { bill_no } => {
            print_json(&billing::edit_bill(db, workspace, n, bill_no).await?)
        }
        BillCommand::Cancel => print_json(&billing::cancel_bill(db, workspace, n).await?),
        BillCommand::Delete { bill_no } => {
            print_json(&billing::delete_bill(db, workspace, n, bill_no).await?)
        }
    }
}

async fn run_purchase(app: &App, action: PurchaseCommand) -> Result<(), AppError> {
    let App {
        db,
        workspace,
        notifications: n,
        ..
    } = app;

    match action {
        PurchaseCommand::Show => print_json(&purchase::get_purchase(workspace).await?),
        PurchaseCommand::List => print_json(&purchase::list_purchases(workspace).await),
        PurchaseCommand::Start { supplier_id } => {
            print_json(&purchase::start_purchase(db, workspace, n, supplier_id).await?)
        }
        PurchaseCommand::Add { medicine_id } => {
            print_json(&purchase::add_purchase_line(db, workspace, n, medicine_id).await?)
        }
        PurchaseCommand::AddNew(line) => print_json(
            &purchase::add_purchase_line_by_name(
                db,
                workspace,
                n,
                line.name,
                line.company,
                line.medicine_type,
            )
            .await?,
        ),
        PurchaseCommand::Quantity {
            medicine_id,
            quantity,
        } => print_json(
            &purchase::set_purchase_quantity(db, workspace, n, medicine_id, quantity).await?,
        ),
        PurchaseCommand::Rate { medicine_id, rate } => {
            print_json(&purchase::set_purchase_rate(db, workspace, n, medicine_id, rate).await?)
        }
        PurchaseCommand::Discount {
            medicine_id,
            discount,
        } => print_json(
            &purchase::set_purchase_discount(db, workspace, n, medicine_id, discount).await?,
        ),
        PurchaseCommand::Batch {
            medicine_id,
            batch_no,
        } => print_json(
            &purchase::set_purchase_batch_no(db, workspace, n, medicine_id, batch_no).await?,
        ),
        PurchaseCommand::Finalize => {
            print_json(&purchase::finalize_purchase(db, workspace, n).await?)
        }
        PurchaseCommand::Edit { purchase_id } => {
            print_json(&purchase::edit_purchase(db, workspace, n, purchase_id).await?)
        }
        PurchaseCommand::Cancel => print_json(&purchase::cancel_purchase(db, workspace, n).await?),
        PurchaseCommand::Delete { purchase_id } => {
            print_json(&purchase::delete_purchase(db, workspace, n, purchase_id).await?)
        }
    }
}

async fn run_settings(app: &App, action: SettingsCommand) -> Result<(), AppError> {
    let App {
        config: cfg,
        db,
        workspace,
        notifications: n,
    } = app;

    match action {
        SettingsCommand::SalesTax { percent, off } => {
            let current = config::get_config(cfg, workspace).await;
            let settings = SalesSettings {
                sales_tax_enabled: !off,
                sales_tax_percent: percent.unwrap_or(current.sales_tax_percent),
            };
            print_json(&billing::update_sales_settings(db, workspace, n, settings).await?)
        }
        SettingsCommand::Layout => print_json(&billing::get_bill_layout(workspace).await),
        SettingsCommand::SetLayout(fields) => {
            let layout = fields.apply(billing::get_bill_layout(workspace).await);
            print_json(&billing::update_bill_layout(db, workspace, n, layout).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        let argv = std::iter::once("pharmadesk-backoffice").chain(args.iter().copied());
        Cli::try_parse_from(argv).map(Cli::into_command)
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_args_is_status() {
        assert_eq!(parse(&[]).unwrap(), Command::Status);
    }

    #[test]
    fn test_inventory_search_words() {
        let cmd = parse(&["medicine", "list", "para", "500"]).unwrap();
        assert_eq!(
            cmd,
            Command::Medicine(MedicineCommand::List {
                query: vec!["para".into(), "500".into()]
            })
        );
    }

    #[test]
    fn test_report_range_covers_whole_days() {
        let cmd = parse(&["report", "--from", "2024-03-01", "--to", "2024-03-31"]).unwrap();
        let Command::Report { from, to } = cmd else {
            panic!("expected report");
        };
        let range = date_range(from, to);
        let from = range.from.unwrap();
        let to = range.to.unwrap();
        assert_eq!((from.day(), from.hour()), (1, 0));
        assert_eq!((to.day(), to.hour(), to.minute()), (31, 23, 59));
    }

    #[test]
    fn test_bad_arguments_are_rejected() {
        assert!(parse(&["export"]).is_err());
        assert!(parse(&["report", "--from"]).is_err());
        assert!(parse(&["report", "--from", "03/01/2024"]).is_err());
        assert!(parse(&["navigate", "checkout"]).is_err());
        assert!(parse(&["settings", "sales-tax"]).is_err());
        assert!(parse(&["frobnicate"]).is_err());
    }

    #[test]
    fn test_negative_quantity_reaches_the_command() {
        let cmd = parse(&["bill", "quantity", "med-1", "-2"]).unwrap();
        assert_eq!(
            cmd,
            Command::Bill(BillCommand::Quantity {
                medicine_id: "med-1".into(),
                quantity: -2.0
            })
        );
    }

    #[test]
    fn test_finalize_without_number_uses_suggestion() {
        let cmd = parse(&["bill", "finalize"]).unwrap();
        assert_eq!(cmd, Command::Bill(BillCommand::Finalize { bill_no: None }));
    }

    #[test]
    fn test_discount_sheet_entries() {
        let cmd = parse(&["medicine", "discounts", "med-1:5:8", "med-2::"]).unwrap();
        let Command::Medicine(MedicineCommand::Discounts { entries }) = cmd else {
            panic!("expected discounts");
        };
        assert_eq!(entries[0].sale_discount, Some(5.0));
        assert_eq!(entries[0].discount, Some(8.0));
        assert_eq!((entries[1].sale_discount, entries[1].discount), (None, None));

        assert!(parse(&["medicine", "discounts", "med-1:5"]).is_err());
        assert!(parse(&["medicine", "discounts", ":5:8"]).is_err());
        assert!(parse(&["medicine", "discounts", "med-1:lots:8"]).is_err());
    }

    #[test]
    fn test_navigate_accepts_dashed_view_names() {
        let cmd = parse(&["navigate", "bill-history"]).unwrap();
        assert_eq!(
            cmd,
            Command::Navigate {
                view: View::BillHistory
            }
        );
    }

    #[test]
    fn test_medicine_flags_become_input() {
        let cmd = parse(&[
            "medicine", "add", "Paracetamol 500", "--company", "Acme", "--tag", "pain",
            "--tag", "fever", "--price", "12.5",
        ])
        .unwrap();
        let Command::Medicine(MedicineCommand::Add(fields)) = cmd else {
            panic!("expected add");
        };
        let input = MedicineInput::from(fields);
        assert_eq!(input.company, "Acme");
        assert_eq!(input.tags.len(), 2);
        assert_eq!(input.price, Some(12.5));
        assert_eq!(input.batch_no, "");
    }

    #[test]
    fn test_layout_keeps_omitted_fields() {
        let current = BillLayoutSettings {
            business_name: "Lake Pharmacy".into(),
            footer_note: "Thank you".into(),
            ..Default::default()
        };
        let cmd = parse(&["settings", "set-layout", "--footer", "Get well soon"]).unwrap();
        let Command::Settings(SettingsCommand::SetLayout(fields)) = cmd else {
            panic!("expected set-layout");
        };
        let layout = fields.apply(current);
        assert_eq!(layout.business_name, "Lake Pharmacy");
        assert_eq!(layout.footer_note, "Get well soon");
    }
}
