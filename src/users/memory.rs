use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{
    repo::{StoreError, StoreResult, UserStore},
    repo_types::{NewUser, User, UserChanges},
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: Vec<User>,
}

/// In-process user store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> StoreResult<Vec<User>> {
        // ids are assigned in increasing order and never reused
        Ok(self.inner.read().await.users.clone())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create(&self, new: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::EmailTaken);
        }
        inner.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: inner.next_id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .iter()
            .any(|u| u.id != id && u.email == changes.email)
        {
            return Err(StoreError::EmailTaken);
        }
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.username = changes.username;
        user.email = changes.email;
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.users.len();
        inner.users.retain(|u| u.id != id);
        Ok(inner.users.len() < before)
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.inner.read().await.users.len() as i64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: "someone".into(),
            email: email.into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn ids_are_sequential_and_not_reused() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@example.com")).await.unwrap();
        let b = store.create(new_user("b@example.com")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        assert!(store.delete(b.id).await.unwrap());
        let c = store.create(new_user("c@example.com")).await.unwrap();
        assert_eq!(c.id, 3);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_email_is_refused() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@example.com")).await.unwrap();
        let err = store.create(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
    }

    #[tokio::test]
    async fn update_keeps_hash_unless_given() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("a@example.com")).await.unwrap();

        let updated = store
            .update(
                user.id,
                UserChanges {
                    username: "renamed".into(),
                    email: "a2@example.com".into(),
                    password_hash: None,
                },
            )
            .await
            .unwrap()
            .expect("user exists");
        assert_eq!(updated.username, "renamed");
        assert_eq!(updated.password_hash, "hash");
        assert!(store.find_by_email("a@example.com").await.unwrap().is_none());
        assert!(store.find_by_email("a2@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_refuses_email_of_another_user() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@example.com")).await.unwrap();
        store.create(new_user("b@example.com")).await.unwrap();
        let err = store
            .update(
                a.id,
                UserChanges {
                    username: "a".into(),
                    email: "b@example.com".into(),
                    password_hash: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
    }

    #[tokio::test]
    async fn missing_rows_report_absence() {
        let store = MemoryUserStore::new();
        assert!(store.find_by_id(7).await.unwrap().is_none());
        assert!(!store.delete(7).await.unwrap());
        let none = store
            .update(
                7,
                UserChanges {
                    username: "x".into(),
                    email: "x@example.com".into(),
                    password_hash: None,
                },
            )
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
