//! Lifecycle operations shared by every resource family.
//!
//! # Responsibility
//! - Visibility-checked loads.
//! - Versioned patch, soft delete and restore.
//! - Default-container provisioning and container deletion.
//!
//! # Invariants
//! - Every accepted mutation bumps `version` by exactly 1 through
//!   `ResourceMeta::touch` and is persisted with a compare-and-swap.
//! - Only the owner may change `shared_with`.

use crate::model::resource::{Patch, SoftDelete, Timestamp, ValidationError, Versioned};
use crate::repo::resource_repo::{
    ContainerRecord, ContainerRepository, RepoError, ResourceRecord, ResourceRepository,
};
use crate::service::{ContainerDeleteOutcome, DeleteOutcome, ServiceError, ServiceResult};
use log::{info, warn};

/// Unconditional writes re-read and retry when a concurrent write wins.
const WRITE_ATTEMPTS: usize = 3;

/// Loads a record the viewer may see, including soft-deleted ones.
pub(crate) fn load_accessible<T, R>(repo: &R, id: &str, viewer: &str) -> ServiceResult<T>
where
    T: ResourceRecord,
    R: ResourceRepository<T>,
{
    match repo.get(id)? {
        Some(record) if record.meta().can_access(viewer) => Ok(record),
        _ => Err(ServiceError::not_found(T::KIND, id)),
    }
}

/// Loads an active record the viewer may see.
pub(crate) fn load_visible<T, R>(repo: &R, id: &str, viewer: &str) -> ServiceResult<T>
where
    T: ResourceRecord,
    R: ResourceRepository<T>,
{
    let record = load_accessible(repo, id, viewer)?;
    if !record.is_active() {
        return Err(ServiceError::not_found(T::KIND, id));
    }
    Ok(record)
}

/// Applies `patch` to an already loaded record and persists it.
pub(crate) fn commit_patch<T, P, R>(
    repo: &R,
    mut record: T,
    viewer: &str,
    patch: P,
    now: Timestamp,
) -> ServiceResult<T>
where
    T: ResourceRecord,
    P: Patch<T>,
    R: ResourceRepository<T>,
{
    if patch.is_empty() {
        return Err(ValidationError::EmptyPatch.into());
    }
    if patch.changes_sharing() && !record.meta().is_owner(viewer) {
        return Err(ServiceError::Forbidden("Only the owner can change sharing"));
    }

    let stored_version = record.meta().version;
    if let Some(expected) = patch.if_version() {
        if expected != stored_version {
            warn!(
                "event=patch_conflict module=service status=error kind={} expected={} stored={}",
                T::KIND,
                expected,
                stored_version
            );
            return Err(ServiceError::Conflict("Version conflict".to_string()));
        }
    }

    patch.apply(&mut record);
    record.meta_mut().touch(now);
    repo.update_versioned(&record, stored_version)?;
    Ok(record)
}

/// Loads a visible record and applies `patch` to it.
///
/// A patch without `if_version` is retried against the fresh row when a
/// concurrent write lands first; a patch with one fails with `Conflict`.
pub(crate) fn apply_patch<T, P, R>(
    repo: &R,
    id: &str,
    viewer: &str,
    patch: P,
    now: Timestamp,
) -> ServiceResult<T>
where
    T: ResourceRecord,
    P: Patch<T> + Clone,
    R: ResourceRepository<T>,
{
    if patch.is_empty() {
        return Err(ValidationError::EmptyPatch.into());
    }
    for _ in 0..WRITE_ATTEMPTS {
        let record = load_visible(repo, id, viewer)?;
        match commit_patch(repo, record, viewer, patch.clone(), now) {
            Err(ServiceError::Conflict(_)) if patch.if_version().is_none() => continue,
            outcome => return outcome,
        }
    }
    Err(ServiceError::Conflict("Version conflict".to_string()))
}

/// Marks a record deleted. A second call reports `deleted: false`.
pub(crate) fn soft_delete<T, R>(
    repo: &R,
    id: &str,
    viewer: &str,
    now: Timestamp,
) -> ServiceResult<DeleteOutcome>
where
    T: ResourceRecord + SoftDelete,
    R: ResourceRepository<T>,
{
    for _ in 0..WRITE_ATTEMPTS {
        let mut record = load_accessible(repo, id, viewer)?;
        if record.is_deleted() {
            return Ok(DeleteOutcome { deleted: false });
        }

        let stored_version = record.meta().version;
        record.set_deleted_at(Some(now));
        record.meta_mut().touch(now);
        match repo.update_versioned(&record, stored_version) {
            Ok(()) => return Ok(DeleteOutcome { deleted: true }),
            Err(RepoError::VersionConflict { .. }) => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Err(ServiceError::Conflict("Version conflict".to_string()))
}

/// Clears the deleted marker. Items that are not deleted are `NotFound`.
///
/// When a concurrent write lands first the row is re-read; if a concurrent
/// restore already cleared the marker, that restored record is returned.
pub(crate) fn restore<T, R>(repo: &R, id: &str, viewer: &str, now: Timestamp) -> ServiceResult<T>
where
    T: ResourceRecord + SoftDelete,
    R: ResourceRepository<T>,
{
    for attempt in 0..WRITE_ATTEMPTS {
        let mut record = load_accessible(repo, id, viewer)?;
        if !record.is_deleted() {
            if attempt == 0 {
                return Err(ServiceError::not_found(T::KIND, id));
            }
            info!(
                "event=restore_converged module=service status=ok kind={} attempt={}",
                T::KIND,
                attempt
            );
            return Ok(record);
        }

        let stored_version = record.meta().version;
        record.set_deleted_at(None);
        record.meta_mut().touch(now);
        match repo.update_versioned(&record, stored_version) {
            Ok(()) => return Ok(record),
            Err(RepoError::VersionConflict { .. }) => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Err(ServiceError::Conflict("Version conflict".to_string()))
}

/// Returns the owner's default container, creating it on first use.
pub(crate) fn ensure_default_container<C, R>(
    repo: &R,
    owner: &str,
    now: Timestamp,
) -> ServiceResult<C>
where
    C: ContainerRecord,
    R: ContainerRepository<C>,
{
    if let Some(existing) = repo.find_default(owner)? {
        return Ok(existing);
    }

    let created = C::default_for(owner, now)?;
    match repo.insert(&created) {
        Ok(()) => {}
        Err(RepoError::AlreadyExists { .. }) => {
            return repo
                .find_default(owner)?
                .ok_or_else(|| ServiceError::not_found(C::KIND, owner));
        }
        Err(err) => return Err(err.into()),
    }
    info!(
        "event=default_container_create module=service status=ok kind={}",
        C::KIND
    );
    Ok(created)
}

/// Deletes a container, moving its members to the owner's default.
pub(crate) fn delete_container<C, R>(
    repo: &R,
    id: &str,
    viewer: &str,
    now: Timestamp,
) -> ServiceResult<ContainerDeleteOutcome>
where
    C: ContainerRecord,
    R: ContainerRepository<C>,
{
    let container: C = load_visible(repo, id, viewer)?;
    if !container.meta().is_owner(viewer) {
        return Err(ServiceError::Forbidden("Only the owner can delete"));
    }
    if container.is_default() {
        return Err(ServiceError::Conflict(format!(
            "Cannot delete the default {}",
            C::KIND
        )));
    }

    let fallback: C = ensure_default_container(repo, viewer, now)?;
    let moved_to = fallback.meta().id.clone();
    let moved = repo.delete_and_reassign(id, &moved_to, now)?;
    info!(
        "event=container_delete module=service status=ok kind={} moved={}",
        C::KIND,
        moved
    );
    Ok(ContainerDeleteOutcome {
        id: id.to_string(),
        moved_to,
        moved,
    })
}
