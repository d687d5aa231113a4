//! # Session State Machine
//!
//! The in-progress bill or purchase being composed against one counterparty.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │           start(id)                        finalize / cancel            │
//! │   ┌──────┐ ─────────► ┌────────────────┐ ──────────────────► ┌──────┐  │
//! │   │ Idle │            │ Active         │                     │ Idle │  │
//! │   └──────┘ ◄───────── │  counterparty  │                     └──────┘  │
//! │            start(B)   │  lines         │                                │
//! │            discards A │  editing: opt  │                                │
//! │                       └────────────────┘                                │
//! │                                                                         │
//! │  At most one counterparty is in progress per session kind. Starting a  │
//! │  new one while another is active throws the old one away and reports   │
//! │  what was discarded so the UI can warn.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Billing and purchasing are two independent instances of [`Session`]; the
//! kind-specific line handling lives in `billing` and `purchase`.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Kinds and Views
// =============================================================================

/// Which of the two symmetric session types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Billing,
    Purchase,
}

impl SessionKind {
    /// The screen where this kind of session is composed.
    pub const fn entry_view(self) -> View {
        match self {
            SessionKind::Billing => View::Billing,
            SessionKind::Purchase => View::Purchase,
        }
    }

    /// The screen listing finalized records of this kind.
    pub const fn history_view(self) -> View {
        match self {
            SessionKind::Billing => View::BillHistory,
            SessionKind::Purchase => View::PurchaseHistory,
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Billing => write!(f, "billing"),
            SessionKind::Purchase => write!(f, "purchase"),
        }
    }
}

/// Top-level screens of the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Dashboard,
    Billing,
    BillHistory,
    Purchase,
    PurchaseHistory,
    Inventory,
    DiscountSheet,
    Stores,
    Suppliers,
    Reports,
    Settings,
}

// =============================================================================
// Outcomes
// =============================================================================

/// What a session held when it was thrown away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Discarded {
    pub kind: SessionKind,
    pub counterparty_id: Option<String>,
    #[ts(type = "number")]
    pub line_count: usize,
    #[ts(type = "number | null")]
    pub editing_id: Option<u64>,
}

/// A session was reset because the user navigated away mid-edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AutoCancelled {
    pub kind: SessionKind,
    #[ts(type = "number")]
    pub editing_id: u64,
}

/// Result of adding a medicine to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddLine {
    Added,
    /// Billing: the medicine was already on the bill; nothing changed.
    AlreadyPresent,
    /// Purchase: the existing row's editable fields were reset.
    Reset,
}

/// Result of changing a line's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineUpdate {
    Updated,
    /// Quantity dropped to zero or below; the line was deleted.
    Removed,
}

// =============================================================================
// Session
// =============================================================================

/// A line that can sit in a session cart.
pub trait SessionLine {
    /// Catalog id; lines are unique by medicine within a session.
    fn medicine_id(&self) -> &str;

    /// Whether the line counts when finalizing.
    fn is_valid(&self) -> bool;
}

/// Generic in-progress session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session<L> {
    kind: SessionKind,
    counterparty_id: Option<String>,
    lines: Vec<L>,
    editing_id: Option<u64>,
}

impl<L: SessionLine> Session<L> {
    /// Creates an idle session.
    pub fn new(kind: SessionKind) -> Self {
        Session {
            kind,
            counterparty_id: None,
            lines: Vec::new(),
            editing_id: None,
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn counterparty_id(&self) -> Option<&str> {
        self.counterparty_id.as_deref()
    }

    pub fn lines(&self) -> &[L] {
        &self.lines
    }

    /// Id of the finalized record being edited, if any.
    pub fn editing_id(&self) -> Option<u64> {
        self.editing_id
    }

    /// Active means a counterparty is selected or lines are present.
    pub fn is_active(&self) -> bool {
        self.counterparty_id.is_some() || !self.lines.is_empty()
    }

    /// Selects a counterparty, discarding any other session in progress.
    ///
    /// Re-selecting the counterparty already active (outside edit mode) keeps
    /// the cart and returns `None`.
    pub fn start(&mut self, counterparty_id: impl Into<String>) -> Option<Discarded> {
        let counterparty_id = counterparty_id.into();
        if self.editing_id.is_none() && self.counterparty_id.as_deref() == Some(&counterparty_id) {
            return None;
        }

        let discarded = self.is_active().then(|| self.snapshot());
        self.reset();
        self.counterparty_id = Some(counterparty_id);
        discarded
    }

    /// Loads a finalized record for editing, discarding any active session.
    pub fn start_editing(
        &mut self,
        counterparty_id: impl Into<String>,
        editing_id: u64,
        lines: Vec<L>,
    ) -> Option<Discarded> {
        let discarded = self.is_active().then(|| self.snapshot());
        self.counterparty_id = Some(counterparty_id.into());
        self.lines = lines;
        self.editing_id = Some(editing_id);
        discarded
    }

    /// Returns to `Idle` with nothing kept.
    pub fn reset(&mut self) {
        self.counterparty_id = None;
        self.lines.clear();
        self.editing_id = None;
    }

    /// Cancels without persisting and returns the view to show next: the
    /// history list when an existing record was being edited, otherwise the
    /// entry screen.
    pub fn cancel(&mut self) -> View {
        let next = if self.editing_id.is_some() {
            self.kind.history_view()
        } else {
            self.kind.entry_view()
        };
        self.reset();
        next
    }

    /// Applies the navigation rule: an edit session is reset as soon as the
    /// user leaves its entry screen.
    pub fn on_view_change(&mut self, view: View) -> Option<AutoCancelled> {
        let editing_id = self.editing_id?;
        if view == self.kind.entry_view() {
            return None;
        }
        self.reset();
        Some(AutoCancelled {
            kind: self.kind,
            editing_id,
        })
    }

    pub fn contains(&self, medicine_id: &str) -> bool {
        self.lines.iter().any(|l| l.medicine_id() == medicine_id)
    }

    pub fn line(&self, medicine_id: &str) -> Option<&L> {
        self.lines.iter().find(|l| l.medicine_id() == medicine_id)
    }

    pub(crate) fn line_mut(&mut self, medicine_id: &str) -> Option<&mut L> {
        self.lines.iter_mut().find(|l| l.medicine_id() == medicine_id)
    }

    pub(crate) fn lines_mut(&mut self) -> &mut [L] {
        &mut self.lines
    }

    pub(crate) fn push_line(&mut self, line: L) {
        self.lines.push(line);
    }

    /// Removes a line; returns whether it was present.
    pub fn remove_line(&mut self, medicine_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.medicine_id() != medicine_id);
        self.lines.len() != before
    }

    /// Rewrites line medicine ids through `remap`.
    ///
    /// A line that lands on a medicine already in the session is dropped,
    /// keeping lines unique. Returns how many lines were rewritten.
    pub(crate) fn remap_medicines<F>(&mut self, remap: &HashMap<String, String>, id_of: F) -> usize
    where
        F: Fn(&mut L) -> &mut String,
    {
        let mut rewritten = 0;
        for line in &mut self.lines {
            let id = id_of(line);
            if let Some(target) = remap.get(id.as_str()) {
                *id = target.clone();
                rewritten += 1;
            }
        }
        if rewritten > 0 {
            let mut seen = HashSet::new();
            self.lines.retain(|l| seen.insert(l.medicine_id().to_string()));
        }
        rewritten
    }

    /// Lines that will be written on finalize.
    pub fn valid_lines(&self) -> impl Iterator<Item = &L> {
        self.lines.iter().filter(|l| l.is_valid())
    }

    fn snapshot(&self) -> Discarded {
        Discarded {
            kind: self.kind,
            counterparty_id: self.counterparty_id.clone(),
            line_count: self.lines.len(),
            editing_id: self.editing_id,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
