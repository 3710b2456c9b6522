//! The versioner: records lifecycle events and restores snapshots.
//!
//! The host calls the `on_entity_*` notifications after its own write
//! commits; recording is synchronous and best-effort, never atomic with
//! the primary write.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::config::VersioningConfig;
use crate::entity::{DeleteKind, EntityRepository, RequestContext, VersionedEntity};
use crate::error::RowverResult;
use crate::versioning::entry::{VersionAction, VersionLogEntry, VersionMetadata};
use crate::versioning::store::VersionStore;

/// Outcome of a restore attempt.
#[derive(Debug)]
pub enum RestoreOutcome<E> {
    /// Snapshot applied onto the live entity in place.
    Restored,
    /// A new entity was created from the snapshot.
    CreatedNew(E),
    /// No live entry with the requested version id; nothing was touched.
    NotFound,
}

impl<E> RestoreOutcome<E> {
    /// Whether any entity was mutated or created.
    pub fn is_restored(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

/// Records version history for entities and restores past snapshots.
///
/// Stateless between calls; everything lives in the underlying
/// [`VersionStore`].
pub struct Versioner {
    store: VersionStore,
    config: VersioningConfig,
}

impl Versioner {
    /// Build a versioner over an already-open store.
    pub fn new(store: VersionStore, config: VersioningConfig) -> Self {
        Self { store, config }
    }

    /// Open the versioning database named by the configuration.
    pub fn open(config: VersioningConfig) -> RowverResult<Self> {
        let store = VersionStore::open(&config.database_path, config.enforce_cascade)?;
        Ok(Self { store, config })
    }

    /// Direct access to the underlying log store.
    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    /// Notification: an entity was created.
    ///
    /// Recorded only when the entity table opts in via
    /// [`EntityPolicy::version_on_create`](crate::config::EntityPolicy).
    pub fn on_entity_created<E: VersionedEntity>(
        &self,
        entity: &E,
        ctx: &RequestContext,
    ) -> RowverResult<()> {
        if !self.config.policy_for(E::table_name()).version_on_create {
            debug!(
                table = E::table_name(),
                id = entity.entity_id(),
                "create versioning disabled, skipping"
            );
            return Ok(());
        }
        self.record(entity, VersionAction::Create, ctx)
    }

    /// Notification: an entity's fields were updated. Always recorded.
    pub fn on_entity_updated<E: VersionedEntity>(
        &self,
        entity: &E,
        ctx: &RequestContext,
    ) -> RowverResult<()> {
        self.record(entity, VersionAction::Update, ctx)
    }

    /// Notification: an entity was deleted.
    ///
    /// Soft deletes are recorded; hard deletes are not, since the cascading
    /// foreign key removes the entity's log rows anyway.
    pub fn on_entity_deleted<E: VersionedEntity>(
        &self,
        entity: &E,
        kind: DeleteKind,
        ctx: &RequestContext,
    ) -> RowverResult<()> {
        match kind {
            DeleteKind::Hard => {
                debug!(
                    table = E::table_name(),
                    id = entity.entity_id(),
                    "hard delete, not recording"
                );
                Ok(())
            }
            DeleteKind::Soft => self.record(entity, VersionAction::Delete, ctx),
        }
    }

    /// History of an entity, newest first. Empty when no history exists.
    pub fn versions<E: VersionedEntity>(&self, entity_id: i64) -> RowverResult<Vec<VersionLogEntry>> {
        self.store.list(E::table_name(), entity_id)
    }

    /// Materialize a past snapshot back into a live entity.
    ///
    /// With `as_new`, a brand-new entity is built and persisted through the
    /// repository (new primary key, normal create notification). Otherwise the
    /// snapshot overwrites `entity`'s fields in place and the restoration is
    /// recorded as an `update`.
    ///
    /// A missing or tombstoned version id touches nothing and yields
    /// [`RestoreOutcome::NotFound`].
    pub fn restore_version<E, R>(
        &self,
        entity: &mut E,
        version_id: i64,
        as_new: bool,
        repo: &R,
        ctx: &RequestContext,
    ) -> RowverResult<RestoreOutcome<E>>
    where
        E: VersionedEntity,
        R: EntityRepository<E>,
    {
        let Some(entry) = self.store.get(E::table_name(), version_id)? else {
            debug!(
                table = E::table_name(),
                version_id, "restore target not found"
            );
            return Ok(RestoreOutcome::NotFound);
        };

        if as_new {
            let created = repo.create(&entry.data)?;
            self.on_entity_created(&created, ctx)?;
            debug!(
                table = E::table_name(),
                version_id,
                new_id = created.entity_id(),
                "restored snapshot as new entity"
            );
            Ok(RestoreOutcome::CreatedNew(created))
        } else {
            entity.apply_fields(&entry.data)?;
            repo.update(entity)?;
            self.on_entity_updated(entity, ctx)?;
            debug!(
                table = E::table_name(),
                version_id,
                id = entity.entity_id(),
                "restored snapshot in place"
            );
            Ok(RestoreOutcome::Restored)
        }
    }

    /// Tombstone a log entry without physically removing it.
    pub fn tombstone_version<E: VersionedEntity>(&self, version_id: i64) -> RowverResult<bool> {
        self.store.tombstone(E::table_name(), version_id)
    }

    fn record<E: VersionedEntity>(
        &self,
        entity: &E,
        action: VersionAction,
        ctx: &RequestContext,
    ) -> RowverResult<()> {
        let table = E::table_name();
        self.store.ensure_table(table)?;

        let data = self.versionable_fields(table, entity.writable_fields());
        let metadata = VersionMetadata {
            user_id: ctx.user_id.clone(),
            ip_address: ctx.ip_address.map(|ip| ip.to_string()),
        };

        let entry = self
            .store
            .append(table, entity.entity_id(), action, &data, Some(&metadata))?;
        debug!(
            table,
            id = entry.original_id,
            version = entry.version_number,
            action = action.as_str(),
            "recorded version"
        );
        Ok(())
    }

    fn versionable_fields(
        &self,
        table: &str,
        mut fields: BTreeMap<String, Value>,
    ) -> BTreeMap<String, Value> {
        let policy = self.config.policy_for(table);
        if let Some(allow) = policy.versionable {
            fields.retain(|name, _| allow.iter().any(|a| a == name));
        }
        fields
    }
}
