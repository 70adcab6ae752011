use super::model::{CreateUser, UpdateUser, User};
use super::repository::UserRepository;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::Span;

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    logger: Span,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, logger: Span) -> Self {
        Self { repo, logger }
    }

    pub async fn create_user(&self, input: &CreateUser) -> Result<User> {
        input.validate()?;
        self.repo.create(input).await
    }

    /// Self-service sign-up; stricter than [`create_user`](Self::create_user)
    pub async fn register(&self, input: &CreateUser) -> Result<User> {
        input.validate_registration()?;
        let user = self.repo.create(input).await?;
        tracing::info!(parent: &self.logger, user_id = user.id, "registered user");
        Ok(user)
    }

    pub async fn read_user(&self, id: i32) -> Result<User> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("user", id))
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.repo.list().await
    }

    pub async fn update_user(&self, id: i32, input: &UpdateUser) -> Result<User> {
        if input.is_empty() {
            return Err(Error::BadRequest("no fields to update".into()));
        }
        input.validate()?;
        self.repo
            .update(id, input)
            .await?
            .ok_or_else(|| Error::not_found("user", id))
    }

    pub async fn delete_user(&self, id: i32) -> Result<()> {
        if !self.repo.delete(id).await? {
            return Err(Error::not_found("user", id));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MemoryUserRepository {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserRepository for MemoryUserRepository {
        async fn create(&self, input: &CreateUser) -> Result<User> {
            let mut users = self.users.lock().unwrap();
            let now = Utc::now();
            let user = User {
                id: users.len() as i32 + 1,
                email: input.email.clone(),
                first_name: input.first_name.clone(),
                last_name: input.last_name.clone(),
                username: input.username.clone(),
                password_hash: input.password_hash.clone(),
                created_at: now,
                updated_at: now,
            };
            users.push(user.clone());
            Ok(user)
        }

        async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
            Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
        }

        async fn list(&self) -> Result<Vec<User>> {
            let mut users = self.users.lock().unwrap().clone();
            users.reverse();
            Ok(users)
        }

        async fn update(&self, id: i32, input: &UpdateUser) -> Result<Option<User>> {
            let mut users = self.users.lock().unwrap();
            Ok(users.iter_mut().find(|u| u.id == id).map(|user| {
                if let Some(email) = &input.email {
                    user.email = email.clone();
                }
                if let Some(first_name) = &input.first_name {
                    user.first_name = first_name.clone();
                }
                if let Some(last_name) = &input.last_name {
                    user.last_name = last_name.clone();
                }
                if let Some(username) = &input.username {
                    user.username = username.clone();
                }
                if let Some(hash) = &input.password_hash {
                    user.password_hash = hash.clone();
                }
                user.updated_at = Utc::now();
                user.clone()
            }))
        }

        async fn delete(&self, id: i32) -> Result<bool> {
            let mut users = self.users.lock().unwrap();
            let before = users.len();
            users.retain(|u| u.id != id);
            Ok(users.len() != before)
        }
    }

    pub(crate) fn input(username: &str) -> CreateUser {
        CreateUser {
            email: format!("{username}@example.com"),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            username: username.into(),
            password_hash: "hash".into(),
        }
    }

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryUserRepository::default()), Span::none())
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let service = service();
        service.create_user(&input("first")).await.unwrap();
        service.register(&input("second")).await.unwrap();

        let names: Vec<_> = service
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["second", "first"]);
    }

    #[tokio::test]
    async fn test_update_keeps_absent_fields() {
        let service = service();
        let user = service.create_user(&input("ada")).await.unwrap();

        let updated = service
            .update_user(
                user.id,
                &UpdateUser {
                    first_name: Some("Augusta".into()),
                    ..UpdateUser::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Augusta");
        assert_eq!(updated.email, user.email);

        assert!(matches!(
            service.update_user(user.id, &UpdateUser::default()).await,
            Err(Error::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_users_are_not_found() {
        let service = service();
        assert!(matches!(service.read_user(9).await, Err(Error::NotFound { .. })));
        assert!(matches!(service.delete_user(9).await, Err(Error::NotFound { .. })));

        let user = service.create_user(&input("ada")).await.unwrap();
        service.delete_user(user.id).await.unwrap();
        assert!(matches!(
            service.read_user(user.id).await,
            Err(Error::NotFound { .. })
        ));
    }
}
