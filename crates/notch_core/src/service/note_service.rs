//! Note use-case service.
//!
//! # Responsibility
//! - Note group (container) CRUD with default `General` provisioning.
//! - Note create/list/get/patch/delete/restore.
//! - Share-link issue, open and edit.
//!
//! # Invariants
//! - Notes always land in a group; a create without one uses `General`.
//! - Share links grant access to exactly one note and never outlive it:
//!   a deleted note is not reachable through its links.
//! - Share-link edits are limited to `title` and `body_md`.

use crate::model::note::{NewNote, NewNoteGroup, Note, NoteGroup, NoteGroupPatch, NotePatch};
use crate::model::resource::{Timestamp, Versioned};
use crate::model::share::{IssuedShare, ShareLink, ShareRequest};
use crate::query::{NoteFilter, QueryFilter};
use crate::repo::resource_repo::{ContainerRepository, ResourceListQuery, ResourceRepository};
use crate::repo::share_repo::ShareLinkRepository;
use crate::service::credentials::generate_token;
use crate::service::resource_service::{
    apply_patch, commit_patch, delete_container, ensure_default_container, load_visible, restore,
    soft_delete,
};
use crate::service::{
    ContainerDeleteOutcome, DeleteOutcome, ListLimits, ServiceError, ServiceResult,
};
use log::info;
use serde::Serialize;

/// Note reached through a share link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedNote {
    pub note: Note,
    pub can_edit: bool,
}

/// Note service facade over repository implementations.
pub struct NoteService<N, G, S> {
    notes: N,
    groups: G,
    shares: S,
    limits: ListLimits,
    app_base_url: String,
}

impl<N, G, S> NoteService<N, G, S>
where
    N: ResourceRepository<Note>,
    G: ContainerRepository<NoteGroup>,
    S: ShareLinkRepository,
{
    pub fn new(notes: N, groups: G, shares: S) -> Self {
        Self {
            notes,
            groups,
            shares,
            limits: ListLimits::default(),
            app_base_url: String::new(),
        }
    }

    pub fn with_limits(mut self, limits: ListLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Base URL prefixed to share-link URLs.
    pub fn with_app_base_url(mut self, app_base_url: impl Into<String>) -> Self {
        self.app_base_url = app_base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Lists visible groups, provisioning the caller's `General` first.
    pub fn list_groups(&self, viewer: &str, now: Timestamp) -> ServiceResult<Vec<NoteGroup>> {
        ensure_default_container(&self.groups, viewer, now)?;
        Ok(self.groups.list(&ResourceListQuery::for_viewer(viewer))?)
    }

    pub fn create_group(
        &self,
        viewer: &str,
        payload: NewNoteGroup,
        now: Timestamp,
    ) -> ServiceResult<NoteGroup> {
        let group = NoteGroup::create(payload, viewer, now)?;
        self.groups.insert(&group)?;
        Ok(group)
    }

    pub fn get_group(&self, viewer: &str, id: &str) -> ServiceResult<NoteGroup> {
        load_visible(&self.groups, id, viewer)
    }

    pub fn patch_group(
        &self,
        viewer: &str,
        id: &str,
        patch: NoteGroupPatch,
        now: Timestamp,
    ) -> ServiceResult<NoteGroup> {
        apply_patch(&self.groups, id, viewer, patch, now)
    }

    /// Deletes a group and moves its notes to the owner's `General`.
    pub fn delete_group(
        &self,
        viewer: &str,
        id: &str,
        now: Timestamp,
    ) -> ServiceResult<ContainerDeleteOutcome> {
        delete_container(&self.groups, id, viewer, now)
    }

    pub fn list_notes(&self, viewer: &str, filter: &NoteFilter) -> ServiceResult<Vec<Note>> {
        let filter = filter.clone().normalized();
        let query = ResourceListQuery {
            viewer: viewer.to_string(),
            scope: filter.group_id,
            include_deleted: filter.include_deleted,
            deleted_only: filter.deleted_only,
            text: filter.query,
            conditions: Vec::new(),
            limit: Some(self.limits.resolve(filter.limit)),
            offset: filter.offset,
        };
        Ok(self.notes.list(&query)?)
    }

    pub fn get_note(&self, viewer: &str, id: &str) -> ServiceResult<Note> {
        load_visible(&self.notes, id, viewer)
    }

    pub fn create_note(
        &self,
        viewer: &str,
        payload: NewNote,
        now: Timestamp,
    ) -> ServiceResult<Note> {
        let mut note = Note::create(payload, viewer, now)?;
        let group_id = match note.group_id.as_deref() {
            Some(group_id) => self.get_group(viewer, group_id)?.meta.id,
            None => {
                let general: NoteGroup = ensure_default_container(&self.groups, viewer, now)?;
                general.meta.id
            }
        };
        note.group_id = Some(group_id);
        self.notes.insert(&note)?;
        Ok(note)
    }

    pub fn patch_note(
        &self,
        viewer: &str,
        id: &str,
        patch: NotePatch,
        now: Timestamp,
    ) -> ServiceResult<Note> {
        if let Some(group_id) = patch.target_group() {
            self.get_group(viewer, group_id)?;
        }
        apply_patch(&self.notes, id, viewer, patch, now)
    }

    pub fn delete_note(
        &self,
        viewer: &str,
        id: &str,
        now: Timestamp,
    ) -> ServiceResult<DeleteOutcome> {
        soft_delete(&self.notes, id, viewer, now)
    }

    pub fn restore_note(&self, viewer: &str, id: &str, now: Timestamp) -> ServiceResult<Note> {
        restore(&self.notes, id, viewer, now)
    }

    /// Issues a share link for a note the viewer can see.
    pub fn create_share(
        &self,
        viewer: &str,
        note_id: &str,
        request: ShareRequest,
        now: Timestamp,
    ) -> ServiceResult<IssuedShare> {
        let expires_at = request.expires_at(now)?;
        let note = self.get_note(viewer, note_id)?;

        let purged = self.shares.purge_expired(now)?;
        if purged > 0 {
            info!("event=share_purge module=service status=ok removed={purged}");
        }

        let link = ShareLink {
            token: generate_token(),
            note_id: note.meta.id,
            can_edit: request.can_edit,
            created_by: viewer.to_string(),
            created_at: now,
            expires_at,
        };
        self.shares.insert_share(&link)?;
        info!(
            "event=share_create module=service status=ok can_edit={} expires={}",
            link.can_edit,
            link.expires_at.is_some()
        );
        let url = self.share_url(&link.token);
        Ok(IssuedShare { link, url })
    }

    /// Live links for a note the viewer can see, newest first.
    pub fn list_shares(
        &self,
        viewer: &str,
        note_id: &str,
        now: Timestamp,
    ) -> ServiceResult<Vec<IssuedShare>> {
        let note = self.get_note(viewer, note_id)?;
        let links = self.shares.list_shares(&note.meta.id)?;
        Ok(links
            .into_iter()
            .filter(|link| !link.is_expired(now))
            .map(|link| {
                let url = self.share_url(&link.token);
                IssuedShare { link, url }
            })
            .collect())
    }

    /// Resolves a share token to its note.
    pub fn open_share(&self, token: &str, now: Timestamp) -> ServiceResult<SharedNote> {
        let (link, note) = self.resolve_share(token, now)?;
        Ok(SharedNote {
            note,
            can_edit: link.can_edit,
        })
    }

    /// Applies a title/body patch through an editable share link.
    pub fn patch_share(
        &self,
        token: &str,
        patch: NotePatch,
        now: Timestamp,
    ) -> ServiceResult<Note> {
        let (link, note) = self.resolve_share(token, now)?;
        if !link.can_edit {
            return Err(ServiceError::Forbidden("Share link is read-only"));
        }
        if !patch.is_content_only() {
            return Err(ServiceError::Forbidden(
                "Share links may only edit title and body",
            ));
        }
        let owner = note.meta().created_by.clone();
        commit_patch(&self.notes, note, &owner, patch, now)
    }

    fn resolve_share(&self, token: &str, now: Timestamp) -> ServiceResult<(ShareLink, Note)> {
        let link = match self.shares.get_share(token)? {
            Some(link) if !link.is_expired(now) => link,
            _ => return Err(ServiceError::not_found("share", "link")),
        };
        match self.notes.get(&link.note_id)? {
            Some(note) if note.is_active() => Ok((link, note)),
            _ => Err(ServiceError::not_found("share", "link")),
        }
    }

    fn share_url(&self, token: &str) -> String {
        format!("{}/share/{token}", self.app_base_url)
    }
}
