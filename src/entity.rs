//! Entity-side seams: the versioned-entity trait, the host repository,
//! and the request-scoped context passed into recording calls.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde_json::Value;

use crate::error::RowverResult;

/// A live record whose lifecycle is observed.
///
/// Implementors expose their table name, primary key, and a field mapping
/// used for snapshots. Which of the writable fields actually end up in a
/// snapshot is decided by the per-table allow-list in
/// [`VersioningConfig`](crate::config::VersioningConfig), not here.
pub trait VersionedEntity {
    /// Name of the table holding the live entity rows.
    fn table_name() -> &'static str
    where
        Self: Sized;

    /// Primary key of this entity.
    fn entity_id(&self) -> i64;

    /// Full writable-field mapping of the entity's current state.
    fn writable_fields(&self) -> BTreeMap<String, Value>;

    /// Overwrite the entity's fields from a snapshot mapping.
    ///
    /// Keys absent from the mapping leave the corresponding field untouched.
    fn apply_fields(&mut self, fields: &BTreeMap<String, Value>) -> RowverResult<()>;
}

/// Whether a delete left the row recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteKind {
    /// The row was tombstoned and can be restored.
    Soft,
    /// The row was physically removed.
    Hard,
}

/// Host-side persistence, consumed by restore operations.
///
/// The versioning layer never touches the primary store directly; materializing
/// a snapshot back into a live row goes through this trait.
pub trait EntityRepository<E: VersionedEntity> {
    /// Insert a brand-new entity built from a snapshot mapping; returns the
    /// entity with its freshly assigned primary key.
    fn create(&self, fields: &BTreeMap<String, Value>) -> RowverResult<E>;

    /// Persist the entity's current fields in place.
    fn update(&self, entity: &E) -> RowverResult<()>;
}

/// Request-scoped metadata captured alongside each snapshot.
///
/// Passed explicitly into every recording call; absent values are stored
/// as nulls and never fail the operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Acting authenticated-user identifier, if any.
    pub user_id: Option<String>,
    /// Client network address, if known.
    pub ip_address: Option<IpAddr>,
}

impl RequestContext {
    /// Context with no acting user and no client address.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Builder: set the acting user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Builder: set the client address.
    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip_address = Some(ip);
        self
    }
}
