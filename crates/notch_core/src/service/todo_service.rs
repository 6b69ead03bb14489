//! Todo use-case service.
//!
//! # Responsibility
//! - Todo list (container) CRUD with default `Inbox` provisioning.
//! - Todo create/list/get/patch/delete/restore.
//! - Reminder hooks for the external notification collaborator.
//!
//! # Invariants
//! - Creating or moving a todo into a list requires access to that list.
//! - `include_done=false` never returns a done todo.

use crate::model::resource::Timestamp;
use crate::model::todo::{NewTodo, NewTodoList, Todo, TodoList, TodoListPatch, TodoPatch};
use crate::query::{QueryFilter, TodoFilter};
use crate::repo::resource_repo::{ContainerRepository, ResourceListQuery, ResourceRepository};
use crate::repo::todo_repo::ReminderRepository;
use crate::service::resource_service::{
    apply_patch, delete_container, ensure_default_container, load_visible, restore, soft_delete,
};
use crate::service::{ContainerDeleteOutcome, DeleteOutcome, ListLimits, ServiceResult};

/// Todo service facade over repository implementations.
pub struct TodoService<T, L> {
    todos: T,
    lists: L,
    limits: ListLimits,
}

impl<T, L> TodoService<T, L>
where
    T: ResourceRepository<Todo> + ReminderRepository,
    L: ContainerRepository<TodoList>,
{
    pub fn new(todos: T, lists: L) -> Self {
        Self {
            todos,
            lists,
            limits: ListLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ListLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Lists visible todo lists, provisioning the caller's `Inbox` first.
    pub fn list_lists(&self, viewer: &str, now: Timestamp) -> ServiceResult<Vec<TodoList>> {
        ensure_default_container(&self.lists, viewer, now)?;
        Ok(self.lists.list(&ResourceListQuery::for_viewer(viewer))?)
    }

    pub fn create_list(
        &self,
        viewer: &str,
        payload: NewTodoList,
        now: Timestamp,
    ) -> ServiceResult<TodoList> {
        let list = TodoList::create(payload, viewer, now)?;
        self.lists.insert(&list)?;
        Ok(list)
    }

    pub fn get_list(&self, viewer: &str, id: &str) -> ServiceResult<TodoList> {
        load_visible(&self.lists, id, viewer)
    }

    pub fn patch_list(
        &self,
        viewer: &str,
        id: &str,
        patch: TodoListPatch,
        now: Timestamp,
    ) -> ServiceResult<TodoList> {
        apply_patch(&self.lists, id, viewer, patch, now)
    }

    /// Deletes a list and moves its todos to the owner's `Inbox`.
    pub fn delete_list(
        &self,
        viewer: &str,
        id: &str,
        now: Timestamp,
    ) -> ServiceResult<ContainerDeleteOutcome> {
        delete_container(&self.lists, id, viewer, now)
    }

    pub fn list_todos(&self, viewer: &str, filter: &TodoFilter) -> ServiceResult<Vec<Todo>> {
        let filter = filter.clone().normalized();
        let mut conditions = Vec::new();
        if !filter.include_done {
            conditions.push("done = 0");
        }
        let query = ResourceListQuery {
            viewer: viewer.to_string(),
            scope: filter.list_id,
            include_deleted: filter.include_deleted,
            deleted_only: filter.deleted_only,
            text: filter.query,
            conditions,
            limit: Some(self.limits.resolve(filter.limit)),
            offset: filter.offset,
        };
        Ok(self.todos.list(&query)?)
    }

    pub fn get_todo(&self, viewer: &str, id: &str) -> ServiceResult<Todo> {
        load_visible(&self.todos, id, viewer)
    }

    pub fn create_todo(
        &self,
        viewer: &str,
        payload: NewTodo,
        now: Timestamp,
    ) -> ServiceResult<Todo> {
        let todo = Todo::create(payload, viewer, now)?;
        if let Some(list_id) = todo.list_id.as_deref() {
            self.get_list(viewer, list_id)?;
        }
        self.todos.insert(&todo)?;
        Ok(todo)
    }

    pub fn patch_todo(
        &self,
        viewer: &str,
        id: &str,
        patch: TodoPatch,
        now: Timestamp,
    ) -> ServiceResult<Todo> {
        if let Some(list_id) = patch.target_list() {
            self.get_list(viewer, list_id)?;
        }
        apply_patch(&self.todos, id, viewer, patch, now)
    }

    pub fn delete_todo(&self, viewer: &str, id: &str, now: Timestamp) -> ServiceResult<DeleteOutcome> {
        soft_delete(&self.todos, id, viewer, now)
    }

    pub fn restore_todo(&self, viewer: &str, id: &str, now: Timestamp) -> ServiceResult<Todo> {
        restore(&self.todos, id, viewer, now)
    }

    /// Due, unsent reminders across all users.
    pub fn due_reminders(&self, now: Timestamp, limit: u32) -> ServiceResult<Vec<Todo>> {
        Ok(self
            .todos
            .due_reminders(now, self.limits.resolve(Some(limit)))?)
    }

    /// Records delivery of a reminder. Returns the updated todo.
    pub fn mark_reminder_sent(&self, id: &str, sent_at: Timestamp) -> ServiceResult<Todo> {
        Ok(self.todos.mark_reminder_sent(id, sent_at)?)
    }
}

#[cfg(test)]
mod tests {
    use super::TodoService;
    use crate::db::open_db_in_memory;
    use crate::model::todo::{NewTodo, NewTodoList, TodoPatch};
    use crate::query::TodoFilter;
    use crate::repo::todo_repo::{SqliteTodoListRepository, SqliteTodoRepository};
    use crate::service::ServiceError;
    use rusqlite::Connection;

    fn service(
        conn: &Connection,
    ) -> TodoService<SqliteTodoRepository<'_>, SqliteTodoListRepository<'_>> {
        TodoService::new(
            SqliteTodoRepository::try_new(conn).unwrap(),
            SqliteTodoListRepository::try_new(conn).unwrap(),
        )
    }

    #[test]
    fn listing_lists_provisions_inbox_once() {
        let conn = open_db_in_memory().unwrap();
        let service = service(&conn);
        let first = service.list_lists("u1", 1).unwrap();
        let second = service.list_lists("u1", 2).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "Inbox");
        assert_eq!(second, first);
    }

    #[test]
    fn creating_into_invisible_list_is_not_found() {
        let conn = open_db_in_memory().unwrap();
        let service = service(&conn);
        let private = service
            .create_list("u1", NewTodoList::new("Private"), 1)
            .unwrap();

        let err = service
            .create_todo("u2", NewTodo::new("sneak").in_list(private.meta.id), 2)
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { kind: "list", .. }));
    }

    #[test]
    fn done_items_are_hidden_unless_requested() {
        let conn = open_db_in_memory().unwrap();
        let service = service(&conn);
        let todo = service.create_todo("u1", NewTodo::new("a"), 1).unwrap();
        service
            .patch_todo("u1", &todo.meta.id, TodoPatch::new().done(true), 2)
            .unwrap();

        assert!(service.list_todos("u1", &TodoFilter::new()).unwrap().is_empty());
        let all = service
            .list_todos("u1", &TodoFilter::new().include_done(true))
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn inbox_cannot_be_deleted() {
        let conn = open_db_in_memory().unwrap();
        let service = service(&conn);
        let inbox = service.list_lists("u1", 1).unwrap().remove(0);
        let err = service.delete_list("u1", &inbox.meta.id, 2).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
