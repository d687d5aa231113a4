//! # Counterparties
//!
//! Medical stores (billed) and suppliers (purchased from). Both share the
//! same shape and rules: a required name, optional address and phone.
//! Finalized bills and purchases snapshot the name, so editing or deleting
//! a counterparty never rewrites history.

use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use crate::account::Workspace;
use crate::error::{CoreError, CoreResult};
use crate::ids::IdGenerator;
use crate::session::SessionKind;
use crate::types::{MedicalStore, Supplier};
use crate::validation::validate_counterparty_name;

/// Form data for a store or supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct CounterpartyInput {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl CounterpartyInput {
    fn validated(&self) -> CoreResult<CounterpartyInput> {
        Ok(CounterpartyInput {
            name: validate_counterparty_name(&self.name)?,
            address: self.address.trim().to_string(),
            phone: self.phone.trim().to_string(),
        })
    }
}

trait Counterparty: Clone {
    fn id(&self) -> &str;
    fn build(id: String, input: CounterpartyInput) -> Self;
    fn not_found(id: &str) -> CoreError;
}

impl Counterparty for MedicalStore {
    fn id(&self) -> &str {
        &self.id
    }

    fn build(id: String, input: CounterpartyInput) -> Self {
        MedicalStore {
            id,
            name: input.name,
            address: input.address,
            phone: input.phone,
        }
    }

    fn not_found(id: &str) -> CoreError {
        CoreError::StoreNotFound(id.to_string())
    }
}

impl Counterparty for Supplier {
    fn id(&self) -> &str {
        &self.id
    }

    fn build(id: String, input: CounterpartyInput) -> Self {
        Supplier {
            id,
            name: input.name,
            address: input.address,
            phone: input.phone,
        }
    }

    fn not_found(id: &str) -> CoreError {
        CoreError::SupplierNotFound(id.to_string())
    }
}

fn add<T: Counterparty>(list: &mut Vec<T>, ids: &dyn IdGenerator, input: &CounterpartyInput) -> CoreResult<T> {
    let input = input.validated()?;
    let item = T::build(ids.next_id(), input);
    list.push(item.clone());
    Ok(item)
}

fn update<T: Counterparty>(list: &mut [T], id: &str, input: &CounterpartyInput) -> CoreResult<T> {
    let input = input.validated()?;
    let slot = list
        .iter_mut()
        .find(|c| c.id() == id)
        .ok_or_else(|| T::not_found(id))?;
    *slot = T::build(id.to_string(), input);
    Ok(slot.clone())
}

fn remove<T: Counterparty>(list: &mut Vec<T>, id: &str) -> CoreResult<T> {
    let index = list
        .iter()
        .position(|c| c.id() == id)
        .ok_or_else(|| T::not_found(id))?;
    Ok(list.remove(index))
}

impl Workspace {
    pub fn add_store(&mut self, input: &CounterpartyInput) -> CoreResult<MedicalStore> {
        let store = add(&mut self.account.stores, self.ids.as_ref(), input)?;
        info!(id = %store.id, name = %store.name, "Medical store added");
        Ok(store)
    }

    pub fn update_store(&mut self, id: &str, input: &CounterpartyInput) -> CoreResult<MedicalStore> {
        let store = update(&mut self.account.stores, id, input)?;
        info!(id, name = %store.name, "Medical store updated");
        Ok(store)
    }

    /// Deletes a store; a bill in progress for it is discarded.
    pub fn delete_store(&mut self, id: &str) -> CoreResult<MedicalStore> {
        let store = remove(&mut self.account.stores, id)?;
        if self.account.billing.counterparty_id() == Some(id) {
            self.account.billing.reset();
        }
        info!(id, name = %store.name, "Medical store deleted");
        Ok(store)
    }

    pub fn add_supplier(&mut self, input: &CounterpartyInput) -> CoreResult<Supplier> {
        let supplier = add(&mut self.account.suppliers, self.ids.as_ref(), input)?;
        info!(id = %supplier.id, name = %supplier.name, "Supplier added");
        Ok(supplier)
    }

    pub fn update_supplier(&mut self, id: &str, input: &CounterpartyInput) -> CoreResult<Supplier> {
        let supplier = update(&mut self.account.suppliers, id, input)?;
        info!(id, name = %supplier.name, "Supplier updated");
        Ok(supplier)
    }

    /// Name of the store (billing) or supplier (purchase) with this id.
    pub fn counterparty_name(&self, kind: SessionKind, id: &str) -> Option<&str> {
        match kind {
            SessionKind::Billing => self
                .account
                .stores
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.name.as_str()),
            SessionKind::Purchase => self
                .account
                .suppliers
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.name.as_str()),
        }
    }

    /// Deletes a supplier; a purchase in progress for it is discarded.
    pub fn delete_supplier(&mut self, id: &str) -> CoreResult<Supplier> {
        let supplier = remove(&mut self.account.suppliers, id)?;
        if self.account.purchase.counterparty_id() == Some(id) {
            self.account.purchase.reset();
        }
        info!(id, name = %supplier.name, "Supplier deleted");
        Ok(supplier)
    }
}
