//! Tenant-scoped event bookings.
//!
//! Rows written before tenancy existed carry no tenant marker. [`EventManager::adopt_legacy`]
//! stamps them with the first tenant that lists events; once stamped they never move again.

mod export;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use export::{CSV_HEADER, events_to_csv};

use crate::error::Result;
use crate::store::Store;
use crate::types::{Contact, Event, Tenant, User};

/// A validated event ready to be written. `id` and timestamps may come from the client.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub id: Option<String>,
    pub title: String,
    pub venue: String,
    pub venue_id: Option<String>,
    pub color: Option<String>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub contact: Contact,
    pub pricing: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields to merge over a stored event. `pricing` always replaces the stored value.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub venue: Option<String>,
    pub venue_id: Option<String>,
    pub color: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub pricing: Option<serde_json::Value>,
    pub notes: Option<String>,
}

pub struct EventManager {
    store: Arc<dyn Store>,
}

fn stamp(tenant: &Tenant, actor: &User, input: NewEvent, now: DateTime<Utc>) -> Event {
    let created_at = input.created_at.unwrap_or(now);
    let attribution = actor.attribution();

    Event {
        id: input.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        tenant_id: Some(tenant.as_str().to_string()),
        venue_id: input.venue_id.unwrap_or_else(|| input.venue.clone()),
        title: input.title,
        venue: input.venue,
        color: input.color,
        date: input.date,
        start_time: input.start_time,
        end_time: input.end_time,
        status: input.status,
        payment_status: input.payment_status,
        payment_method: input.payment_method,
        contact: input.contact,
        pricing: input.pricing,
        notes: input.notes,
        created_at,
        updated_at: input.updated_at.unwrap_or(created_at),
        created_by: Some(attribution.clone()),
        updated_by: Some(attribution),
    }
}

fn merge(event: &mut Event, patch: EventPatch) {
    fn set(slot: &mut String, value: Option<String>) {
        if let Some(value) = value {
            *slot = value;
        }
    }

    set(&mut event.title, patch.title);
    set(&mut event.venue, patch.venue);
    set(&mut event.venue_id, patch.venue_id);
    set(&mut event.date, patch.date);
    set(&mut event.start_time, patch.start_time);
    set(&mut event.end_time, patch.end_time);
    set(&mut event.status, patch.status);
    set(&mut event.payment_status, patch.payment_status);
    set(&mut event.contact.name, patch.contact_name);
    set(&mut event.contact.phone, patch.contact_phone);
    set(&mut event.contact.email, patch.contact_email);

    if patch.color.is_some() {
        event.color = patch.color;
    }
    if patch.payment_method.is_some() {
        event.payment_method = patch.payment_method;
    }
    if patch.notes.is_some() {
        event.notes = patch.notes;
    }
    event.pricing = patch.pricing;
}

impl EventManager {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Assigns every ownerless event to `tenant`. Idempotent.
    pub fn adopt_legacy(&self, tenant: &Tenant) -> Result<usize> {
        let adopted = self.store.adopt_ownerless_events(tenant)?;
        if adopted > 0 {
            tracing::info!(tenant = %tenant, adopted, "Adopted legacy events");
        }
        Ok(adopted)
    }

    /// Lists the tenant's events by date and start time, adopting legacy rows first.
    pub fn list(&self, tenant: &Tenant) -> Result<Vec<Event>> {
        self.adopt_legacy(tenant)?;
        self.store.list_events(tenant)
    }

    pub fn get(&self, tenant: &Tenant, id: &str) -> Result<Option<Event>> {
        self.store.get_event(tenant, id)
    }

    pub fn create(&self, tenant: &Tenant, actor: &User, input: NewEvent) -> Result<Event> {
        let event = stamp(tenant, actor, input, Utc::now());
        self.store.create_event(&event)?;
        Ok(event)
    }

    /// Inserts all events atomically and returns the tenant's full event list.
    pub fn bulk_create(&self, tenant: &Tenant, actor: &User, inputs: Vec<NewEvent>) -> Result<Vec<Event>> {
        let now = Utc::now();
        let events: Vec<Event> = inputs
            .into_iter()
            .map(|input| stamp(tenant, actor, input, now))
            .collect();

        self.store.create_events(&events)?;
        tracing::info!(tenant = %tenant, count = events.len(), "Bulk imported events");
        self.store.list_events(tenant)
    }

    /// Returns `None` when the event does not exist in this tenant.
    pub fn update(
        &self,
        tenant: &Tenant,
        actor: &User,
        id: &str,
        patch: EventPatch,
    ) -> Result<Option<Event>> {
        let Some(mut event) = self.store.get_event(tenant, id)? else {
            return Ok(None);
        };

        merge(&mut event, patch);
        event.updated_at = Utc::now();
        event.updated_by = Some(actor.attribution());

        self.store.update_event(&event)?;
        Ok(Some(event))
    }

    pub fn delete(&self, tenant: &Tenant, id: &str) -> Result<bool> {
        self.store.delete_event(tenant, id)
    }

    pub fn clear(&self, tenant: &Tenant) -> Result<usize> {
        let removed = self.store.delete_tenant_events(tenant)?;
        tracing::info!(tenant = %tenant, removed, "Cleared events");
        Ok(removed)
    }

    pub fn export_csv(&self, tenant: &Tenant) -> Result<String> {
        Ok(events_to_csv(&self.store.list_events(tenant)?))
    }
}
