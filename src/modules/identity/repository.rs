use super::model::{CreateUser, UpdateUser, User};
use crate::Result;
use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbBackend, FromQueryResult, Statement, Value};

/// Access to `identity.user`
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &CreateUser) -> Result<User>;
    async fn get_by_id(&self, id: i32) -> Result<Option<User>>;
    /// All users, newest first
    async fn list(&self) -> Result<Vec<User>>;
    async fn update(&self, id: i32, user: &UpdateUser) -> Result<Option<User>>;
    /// Returns `false` when no user had this id
    async fn delete(&self, id: i32) -> Result<bool>;
}

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, username, password_hash, created_at, updated_at";

#[derive(Debug, FromQueryResult)]
struct IdRow {
    #[allow(dead_code)]
    id: i32,
}

pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn statement<I>(sql: String, values: I) -> Statement
    where
        I: IntoIterator<Item = Value>,
    {
        Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &CreateUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO identity.user (email, first_name, last_name, username, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let stmt = Self::statement(
            sql,
            [
                user.email.as_str().into(),
                user.first_name.as_str().into(),
                user.last_name.as_str().into(),
                user.username.as_str().into(),
                user.password_hash.as_str().into(),
            ],
        );
        User::find_by_statement(stmt)
            .one(&self.db)
            .await?
            .ok_or_else(|| crate::Error::Internal("insert returned no user".into()))
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM identity.user WHERE id = $1");
        Ok(User::find_by_statement(Self::statement(sql, [id.into()]))
            .one(&self.db)
            .await?)
    }

    async fn list(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM identity.user ORDER BY created_at DESC");
        Ok(User::find_by_statement(Self::statement(sql, Vec::<Value>::new()))
            .all(&self.db)
            .await?)
    }

    async fn update(&self, id: i32, user: &UpdateUser) -> Result<Option<User>> {
        let sql = format!(
            "UPDATE identity.user SET \
               email = COALESCE($2, email), \
               first_name = COALESCE($3, first_name), \
               last_name = COALESCE($4, last_name), \
               username = COALESCE($5, username), \
               password_hash = COALESCE($6, password_hash), \
               updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let stmt = Self::statement(
            sql,
            [
                id.into(),
                user.email.clone().into(),
                user.first_name.clone().into(),
                user.last_name.clone().into(),
                user.username.clone().into(),
                user.password_hash.clone().into(),
            ],
        );
        Ok(User::find_by_statement(stmt).one(&self.db).await?)
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let stmt = Self::statement(
            "DELETE FROM identity.user WHERE id = $1 RETURNING id".to_string(),
            [id.into()],
        );
        Ok(IdRow::find_by_statement(stmt).one(&self.db).await?.is_some())
    }
}
