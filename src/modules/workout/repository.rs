use super::model::{Filters, Muscle, MuscleInput, MuscleRank, Plan, PlanEntry, RankInput};
use crate::Result;
use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbBackend, FromQueryResult, Statement, TransactionTrait, Value};

/// Access to the `workout` schema
#[async_trait]
pub trait WorkoutRepository: Send + Sync {
    /// Number of known muscles; doubles as a reachability check
    async fn count_muscles(&self) -> Result<i64>;
    async fn select_muscle(&self, id: i32) -> Result<Option<Muscle>>;
    async fn select_muscles(&self) -> Result<Vec<Muscle>>;
    async fn insert_muscle(&self, input: &MuscleInput) -> Result<Muscle>;

    async fn select_ranks(&self, filters: Filters) -> Result<Vec<MuscleRank>>;
    async fn upsert_rank(&self, input: &RankInput) -> Result<MuscleRank>;

    async fn select_plans(&self, filters: Filters) -> Result<Vec<Plan>>;
    async fn select_plan(&self, id: i32) -> Result<Option<Plan>>;
    /// Insert a plan and one entry per muscle, all or nothing
    async fn insert_plan_with_entries(
        &self,
        user_id: i32,
        notes: Option<&str>,
        muscle_ids: &[i32],
        sets: i32,
    ) -> Result<(Plan, Vec<PlanEntry>)>;
    async fn delete_plan(&self, id: i32) -> Result<Option<Plan>>;

    async fn select_plan_entries(&self, filters: Filters) -> Result<Vec<PlanEntry>>;
    /// Delete entries matching `filters`; returns how many were removed
    async fn delete_plan_entries(&self, filters: Filters) -> Result<u64>;
    async fn patch_plan_entry(&self, id: i32, sets: i32) -> Result<Option<PlanEntry>>;
}

const COUNT_MUSCLES: &str = "SELECT COUNT(*) AS count FROM workout.muscles";

const SELECT_MUSCLE: &str = r#"
SELECT id, name, muscle_group, description
FROM workout.muscles
WHERE id = $1
"#;

const SELECT_MUSCLES: &str = r#"
SELECT id, name, muscle_group, description
FROM workout.muscles
ORDER BY id
"#;

const INSERT_MUSCLE: &str = r#"
INSERT INTO workout.muscles (name, muscle_group, description)
VALUES ($1, $2, $3)
RETURNING id, name, muscle_group, description
"#;

const SELECT_RANKS: &str = r#"
SELECT id, user_id, muscle_id, rank, updated_at
FROM workout.muscles_ranks
WHERE ($1::int IS NULL OR user_id = $1)
ORDER BY muscle_id
"#;

const UPSERT_RANK: &str = r#"
INSERT INTO workout.muscles_ranks (user_id, muscle_id, rank)
VALUES ($1, $2, $3)
ON CONFLICT (user_id, muscle_id)
  DO UPDATE SET rank = EXCLUDED.rank, updated_at = now()
RETURNING id, user_id, muscle_id, rank, updated_at
"#;

const SELECT_PLANS: &str = r#"
SELECT id, user_id, date, created_at, notes
FROM workout.plans
WHERE ($1::int IS NULL OR user_id = $1)
ORDER BY created_at DESC
"#;

const SELECT_PLAN: &str = r#"
SELECT id, user_id, date, created_at, notes
FROM workout.plans
WHERE id = $1
"#;

const INSERT_PLAN: &str = r#"
INSERT INTO workout.plans (user_id, date, notes)
VALUES ($1, now(), $2)
RETURNING id, user_id, date, created_at, notes
"#;

const DELETE_PLAN: &str = r#"
DELETE FROM workout.plans
WHERE id = $1
RETURNING id, user_id, date, created_at, notes
"#;

const SELECT_PLAN_ENTRIES: &str = r#"
SELECT e.id, e.plan_id, e.muscle_id, e.sets, e.created_at
FROM workout.plan_entries e
JOIN workout.plans p ON p.id = e.plan_id
WHERE ($1::int IS NULL OR p.user_id = $1)
  AND ($2::int IS NULL OR e.plan_id = $2)
ORDER BY e.id
"#;

const INSERT_PLAN_ENTRY: &str = r#"
INSERT INTO workout.plan_entries (plan_id, muscle_id, sets)
VALUES ($1, $2, $3)
RETURNING id, plan_id, muscle_id, sets, created_at
"#;

const DELETE_PLAN_ENTRIES: &str = r#"
DELETE FROM workout.plan_entries
WHERE ($1::int IS NULL OR plan_id = $1)
  AND ($2::int IS NULL OR muscle_id = $2)
RETURNING id
"#;

const PATCH_PLAN_ENTRY: &str = r#"
UPDATE workout.plan_entries
SET sets = $2
WHERE id = $1
RETURNING id, plan_id, muscle_id, sets, created_at
"#;

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

#[derive(Debug, FromQueryResult)]
struct IdRow {
    #[allow(dead_code)]
    id: i32,
}

fn statement<I>(sql: &str, values: I) -> Statement
where
    I: IntoIterator<Item = Value>,
{
    Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
}

/// Postgres-backed [`WorkoutRepository`] over the shared connection pool
pub struct PgWorkoutRepository {
    db: DatabaseConnection,
}

impl PgWorkoutRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WorkoutRepository for PgWorkoutRepository {
    async fn count_muscles(&self) -> Result<i64> {
        let row = CountRow::find_by_statement(statement(COUNT_MUSCLES, Vec::<Value>::new()))
            .one(&self.db)
            .await?;
        Ok(row.map(|row| row.count).unwrap_or(0))
    }

    async fn select_muscle(&self, id: i32) -> Result<Option<Muscle>> {
        Ok(Muscle::find_by_statement(statement(SELECT_MUSCLE, [id.into()]))
            .one(&self.db)
            .await?)
    }

    async fn select_muscles(&self) -> Result<Vec<Muscle>> {
        Ok(Muscle::find_by_statement(statement(SELECT_MUSCLES, Vec::<Value>::new()))
            .all(&self.db)
            .await?)
    }

    async fn insert_muscle(&self, input: &MuscleInput) -> Result<Muscle> {
        let stmt = statement(
            INSERT_MUSCLE,
            [
                input.name.trim().into(),
                input.muscle_group.trim().into(),
                input.description.clone().into(),
            ],
        );
        Muscle::find_by_statement(stmt)
            .one(&self.db)
            .await?
            .ok_or_else(|| crate::Error::Internal("insert returned no muscle".into()))
    }

    async fn select_ranks(&self, filters: Filters) -> Result<Vec<MuscleRank>> {
        Ok(
            MuscleRank::find_by_statement(statement(SELECT_RANKS, [filters.user_id.into()]))
                .all(&self.db)
                .await?,
        )
    }

    async fn upsert_rank(&self, input: &RankInput) -> Result<MuscleRank> {
        let stmt = statement(
            UPSERT_RANK,
            [input.user_id.into(), input.muscle_id.into(), input.rank.into()],
        );
        MuscleRank::find_by_statement(stmt)
            .one(&self.db)
            .await?
            .ok_or_else(|| crate::Error::Internal("upsert returned no rank".into()))
    }

    async fn select_plans(&self, filters: Filters) -> Result<Vec<Plan>> {
        Ok(Plan::find_by_statement(statement(SELECT_PLANS, [filters.user_id.into()]))
            .all(&self.db)
            .await?)
    }

    async fn select_plan(&self, id: i32) -> Result<Option<Plan>> {
        Ok(Plan::find_by_statement(statement(SELECT_PLAN, [id.into()]))
            .one(&self.db)
            .await?)
    }

    async fn insert_plan_with_entries(
        &self,
        user_id: i32,
        notes: Option<&str>,
        muscle_ids: &[i32],
        sets: i32,
    ) -> Result<(Plan, Vec<PlanEntry>)> {
        // Dropping `txn` without a commit rolls it back.
        let txn = self.db.begin().await?;

        let notes = notes.map(str::to_string);
        let plan = Plan::find_by_statement(statement(INSERT_PLAN, [user_id.into(), notes.into()]))
            .one(&txn)
            .await?
            .ok_or_else(|| crate::Error::Internal("insert returned no plan".into()))?;

        let mut entries = Vec::with_capacity(muscle_ids.len());
        for muscle_id in muscle_ids {
            let stmt = statement(
                INSERT_PLAN_ENTRY,
                [plan.id.into(), (*muscle_id).into(), sets.into()],
            );
            let entry = PlanEntry::find_by_statement(stmt)
                .one(&txn)
                .await?
                .ok_or_else(|| crate::Error::Internal("insert returned no plan entry".into()))?;
            entries.push(entry);
        }

        txn.commit().await?;
        Ok((plan, entries))
    }

    async fn delete_plan(&self, id: i32) -> Result<Option<Plan>> {
        Ok(Plan::find_by_statement(statement(DELETE_PLAN, [id.into()]))
            .one(&self.db)
            .await?)
    }

    async fn select_plan_entries(&self, filters: Filters) -> Result<Vec<PlanEntry>> {
        let stmt = statement(
            SELECT_PLAN_ENTRIES,
            [filters.user_id.into(), filters.plan_id.into()],
        );
        Ok(PlanEntry::find_by_statement(stmt).all(&self.db).await?)
    }

    async fn delete_plan_entries(&self, filters: Filters) -> Result<u64> {
        let stmt = statement(
            DELETE_PLAN_ENTRIES,
            [filters.plan_id.into(), filters.muscle_id.into()],
        );
        let deleted = IdRow::find_by_statement(stmt).all(&self.db).await?;
        Ok(deleted.len() as u64)
    }

    async fn patch_plan_entry(&self, id: i32, sets: i32) -> Result<Option<PlanEntry>> {
        Ok(
            PlanEntry::find_by_statement(statement(PATCH_PLAN_ENTRY, [id.into(), sets.into()]))
                .one(&self.db)
                .await?,
        )
    }
}
