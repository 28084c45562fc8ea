//! In-memory store
//!
//! Backs the test suite and development runs without `DATABASE_URL`.
//! Uniqueness is enforced on insert the way the database indexes do.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StatusFilter, StatusRepository, UserRepository};
use crate::{CoreError, Result, Status, User};

/// Process-local identity and status store
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    statuses: RwLock<Vec<Status>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;

        if users.iter().any(|u| u.username_matches(&user.username)) {
            return Err(CoreError::Conflict(format!(
                "username {} already exists",
                user.username
            )));
        }
        if users.iter().any(|u| u.email_matches(&user.email)) {
            return Err(CoreError::Conflict(format!(
                "email {} already exists",
                user.email
            )));
        }

        users.push(user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username_matches(username)).cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| u.username_matches(username)))
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| u.email_matches(email)))
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Vec<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| u.username_matches(identifier) || u.email_matches(identifier))
            .cloned()
            .collect())
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| CoreError::NotFound(format!("user {id}")))?;
        user.last_login = Some(at);
        Ok(())
    }
}

#[async_trait]
impl StatusRepository for MemoryStore {
    async fn create_status(&self, status: &Status) -> Result<()> {
        self.statuses.write().await.push(status.clone());
        Ok(())
    }

    async fn get_status(&self, id: Uuid) -> Result<Option<Status>> {
        let statuses = self.statuses.read().await;
        Ok(statuses.iter().find(|s| s.id == id).cloned())
    }

    async fn list_statuses(&self, filter: &StatusFilter) -> Result<Vec<Status>> {
        let statuses = self.statuses.read().await;
        let query = filter.query.as_ref().map(|q| q.to_lowercase());

        let mut matched: Vec<Status> = statuses
            .iter()
            .filter(|s| filter.user_id.map_or(true, |uid| s.user_id == uid))
            .filter(|s| match &query {
                Some(q) => s
                    .content
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(q.as_str())),
                None => true,
            })
            .cloned()
            .collect();

        // Newest first; insertion order breaks timestamp ties
        matched.reverse();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matched
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::StatusEntry;

    fn entry(content: &str) -> StatusEntry {
        StatusEntry {
            content: Some(content.to_string()),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup_case_insensitive() {
        let store = MemoryStore::new();
        let user = User::new("Alice", "Alice@Example.com", "hash");
        store.create_user(&user).await.unwrap();

        assert!(store.username_exists("alice").await.unwrap());
        assert!(store.email_exists("ALICE@example.com").await.unwrap());
        assert!(!store.email_exists("bob@example.com").await.unwrap());

        let found = store.find_by_username("ALICE").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = MemoryStore::new();
        store
            .create_user(&User::new("alice", "alice@example.com", "hash"))
            .await
            .unwrap();

        let dup_name = store
            .create_user(&User::new("ALICE", "other@example.com", "hash"))
            .await;
        assert!(matches!(dup_name, Err(CoreError::Conflict(_))));

        let dup_email = store
            .create_user(&User::new("other", "Alice@Example.com", "hash"))
            .await;
        assert!(matches!(dup_email, Err(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_find_by_login_matches_username_or_email() {
        let store = MemoryStore::new();
        let alice = User::new("alice", "alice@example.com", "hash");
        // A username that equals another identity's email
        let tricky = User::new("bob@example.com", "carol@example.com", "hash");
        let bob = User::new("bob", "bob@example.com", "hash");
        store.create_user(&alice).await.unwrap();
        store.create_user(&tricky).await.unwrap();
        // bob's email collides with tricky's username, but not with any email
        store.create_user(&bob).await.unwrap();

        assert_eq!(store.find_by_login("ALICE").await.unwrap().len(), 1);
        assert_eq!(store.find_by_login("alice@EXAMPLE.com").await.unwrap().len(), 1);
        assert_eq!(store.find_by_login("bob@example.com").await.unwrap().len(), 2);
        assert!(store.find_by_login("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_last_login() {
        let store = MemoryStore::new();
        let user = User::new("alice", "alice@example.com", "hash");
        store.create_user(&user).await.unwrap();

        let now = Utc::now();
        store.update_last_login(user.id, now).await.unwrap();
        let stored = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.last_login, Some(now));

        let missing = store.update_last_login(Uuid::new_v4(), now).await;
        assert!(matches!(missing, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_statuses_filters_and_orders() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let first = Status::new(alice, entry("hello world"));
        let second = Status::new(bob, entry("Hello again"));
        let third = Status::new(alice, entry("goodbye"));
        for status in [&first, &second, &third] {
            store.create_status(status).await.unwrap();
        }

        let all = store.list_statuses(&StatusFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, third.id);

        let by_alice = store
            .list_statuses(&StatusFilter {
                user_id: Some(alice),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_alice.len(), 2);

        let search = store
            .list_statuses(&StatusFilter {
                query: Some("HELLO".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 2);

        let page = store
            .list_statuses(&StatusFilter {
                limit: 1,
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, second.id);
    }
}
