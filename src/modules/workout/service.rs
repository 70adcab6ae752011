use super::model::{
    DEFAULT_USER_ID, Filters, Muscle, MuscleInput, MuscleRank, Plan, PlanDetail, PlanEntry,
    PlanEntryDetail, PlanInput, RankInput, check_sets,
};
use super::repository::WorkoutRepository;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Span;

/// What the workout module offers its siblings
#[async_trait]
pub trait WorkoutClient: Send + Sync {
    async fn read_muscles(&self) -> Result<Vec<Muscle>>;

    /// Create a plan for the default user with one single-set entry per muscle
    async fn create_plan_with_entries(&self, notes: &str, muscle_ids: &[i32]) -> Result<PlanDetail>;

    async fn update_plan_entry_sets(&self, id: i32, sets: i32) -> Result<PlanEntry>;

    /// Delete a plan and its entries; returns the number of entries removed
    async fn delete_plan(&self, id: i32) -> Result<u64>;
}

pub struct WorkoutService {
    repo: Arc<dyn WorkoutRepository>,
    logger: Span,
}

impl WorkoutService {
    pub fn new(repo: Arc<dyn WorkoutRepository>, logger: Span) -> Self {
        Self { repo, logger }
    }

    /// Fails when the workout tables cannot be reached
    pub async fn check_store(&self) -> Result<i64> {
        self.repo.count_muscles().await
    }

    pub async fn create_muscle(&self, input: &MuscleInput) -> Result<Muscle> {
        input.validate()?;
        self.repo.insert_muscle(input).await
    }

    pub async fn read_ranks(&self, filters: Filters) -> Result<Vec<MuscleRank>> {
        self.repo.select_ranks(filters).await
    }

    pub async fn set_rank(&self, input: &RankInput) -> Result<MuscleRank> {
        input.validate()?;
        if self.repo.select_muscle(input.muscle_id).await?.is_none() {
            return Err(Error::not_found("muscle", input.muscle_id));
        }
        self.repo.upsert_rank(input).await
    }

    pub async fn read_plans(&self, filters: Filters) -> Result<Vec<Plan>> {
        self.repo.select_plans(filters).await
    }

    pub async fn read_plan(&self, id: i32) -> Result<PlanDetail> {
        let plan = self
            .repo
            .select_plan(id)
            .await?
            .ok_or_else(|| Error::not_found("plan", id))?;

        let entries = self
            .repo
            .select_plan_entries(Filters {
                plan_id: Some(id),
                ..Filters::default()
            })
            .await?;

        let muscles: HashMap<i32, Muscle> = self
            .repo
            .select_muscles()
            .await?
            .into_iter()
            .map(|muscle| (muscle.id, muscle))
            .collect();

        let entries = entries
            .into_iter()
            .map(|entry| PlanEntryDetail {
                muscle: muscles.get(&entry.muscle_id).cloned(),
                entry,
            })
            .collect();

        Ok(PlanDetail { plan, entries })
    }

    pub async fn create_plan(&self, input: &PlanInput) -> Result<PlanDetail> {
        input.validate()?;

        let mut muscles = Vec::with_capacity(input.muscle_ids.len());
        for muscle_id in &input.muscle_ids {
            let muscle = self
                .repo
                .select_muscle(*muscle_id)
                .await?
                .ok_or_else(|| Error::not_found("muscle", muscle_id))?;
            muscles.push(muscle);
        }

        let notes = input.notes.as_deref().filter(|n| !n.is_empty());
        let (plan, entries) = self
            .repo
            .insert_plan_with_entries(input.user_id, notes, &input.muscle_ids, 1)
            .await?;

        let entries: Vec<PlanEntryDetail> = entries
            .into_iter()
            .zip(muscles)
            .map(|(entry, muscle)| PlanEntryDetail {
                entry,
                muscle: Some(muscle),
            })
            .collect();

        tracing::info!(
            parent: &self.logger,
            plan_id = plan.id,
            entries = entries.len(),
            "created plan"
        );
        Ok(PlanDetail { plan, entries })
    }

    pub async fn remove_plan(&self, id: i32) -> Result<u64> {
        let deleted = self
            .repo
            .delete_plan_entries(Filters {
                plan_id: Some(id),
                ..Filters::default()
            })
            .await?;
        tracing::info!(
            parent: &self.logger,
            plan_id = id,
            n_deleted = deleted,
            "deleted plan entries"
        );

        self.repo
            .delete_plan(id)
            .await?
            .ok_or_else(|| Error::not_found("plan", id))?;
        tracing::info!(parent: &self.logger, plan_id = id, "deleted plan");
        Ok(deleted)
    }

    pub async fn set_entry_sets(&self, id: i32, sets: i32) -> Result<PlanEntry> {
        check_sets(sets)?;
        self.repo
            .patch_plan_entry(id, sets)
            .await?
            .ok_or_else(|| Error::not_found("plan entry", id))
    }
}

#[async_trait]
impl WorkoutClient for WorkoutService {
    async fn read_muscles(&self) -> Result<Vec<Muscle>> {
        self.repo.select_muscles().await
    }

    async fn create_plan_with_entries(&self, notes: &str, muscle_ids: &[i32]) -> Result<PlanDetail> {
        self.create_plan(&PlanInput {
            user_id: DEFAULT_USER_ID,
            notes: Some(notes.to_string()),
            muscle_ids: muscle_ids.to_vec(),
        })
        .await
    }

    async fn update_plan_entry_sets(&self, id: i32, sets: i32) -> Result<PlanEntry> {
        self.set_entry_sets(id, sets).await
    }

    async fn delete_plan(&self, id: i32) -> Result<u64> {
        self.remove_plan(id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    /// In-memory stand-in for the workout schema
    #[derive(Default)]
    pub(crate) struct MemoryWorkoutRepository {
        muscles: Mutex<Vec<Muscle>>,
        ranks: Mutex<Vec<MuscleRank>>,
        plans: Mutex<Vec<Plan>>,
        entries: Mutex<Vec<PlanEntry>>,
    }

    impl MemoryWorkoutRepository {
        pub(crate) fn with_muscles(names: &[&str]) -> Self {
            let repo = Self::default();
            *repo.muscles.lock().unwrap() = names
                .iter()
                .enumerate()
                .map(|(i, name)| Muscle {
                    id: i as i32 + 1,
                    name: name.to_string(),
                    muscle_group: "group".into(),
                    description: None,
                })
                .collect();
            repo
        }
    }

    #[async_trait]
    impl WorkoutRepository for MemoryWorkoutRepository {
        async fn count_muscles(&self) -> Result<i64> {
            Ok(self.muscles.lock().unwrap().len() as i64)
        }

        async fn select_muscle(&self, id: i32) -> Result<Option<Muscle>> {
            Ok(self.muscles.lock().unwrap().iter().find(|m| m.id == id).cloned())
        }

        async fn select_muscles(&self) -> Result<Vec<Muscle>> {
            Ok(self.muscles.lock().unwrap().clone())
        }

        async fn insert_muscle(&self, input: &MuscleInput) -> Result<Muscle> {
            let mut muscles = self.muscles.lock().unwrap();
            let muscle = Muscle {
                id: muscles.len() as i32 + 1,
                name: input.name.clone(),
                muscle_group: input.muscle_group.clone(),
                description: input.description.clone(),
            };
            muscles.push(muscle.clone());
            Ok(muscle)
        }

        async fn select_ranks(&self, filters: Filters) -> Result<Vec<MuscleRank>> {
            Ok(self
                .ranks
                .lock()
                .unwrap()
                .iter()
                .filter(|r| filters.user_id.is_none_or(|user| r.user_id == user))
                .cloned()
                .collect())
        }

        async fn upsert_rank(&self, input: &RankInput) -> Result<MuscleRank> {
            let mut ranks = self.ranks.lock().unwrap();
            let next_id = ranks.len() as i32 + 1;
            ranks.retain(|r| !(r.user_id == input.user_id && r.muscle_id == input.muscle_id));
            let rank = MuscleRank {
                id: next_id,
                user_id: input.user_id,
                muscle_id: input.muscle_id,
                rank: input.rank,
                updated_at: Utc::now(),
            };
            ranks.push(rank.clone());
            Ok(rank)
        }

        async fn select_plans(&self, filters: Filters) -> Result<Vec<Plan>> {
            Ok(self
                .plans
                .lock()
                .unwrap()
                .iter()
                .filter(|p| filters.user_id.is_none_or(|user| p.user_id == user))
                .cloned()
                .collect())
        }

        async fn select_plan(&self, id: i32) -> Result<Option<Plan>> {
            Ok(self.plans.lock().unwrap().iter().find(|p| p.id == id).cloned())
        }

        async fn insert_plan_with_entries(
            &self,
            user_id: i32,
            notes: Option<&str>,
            muscle_ids: &[i32],
            sets: i32,
        ) -> Result<(Plan, Vec<PlanEntry>)> {
            let mut plans = self.plans.lock().unwrap();
            let mut entries = self.entries.lock().unwrap();
            let plan = Plan {
                id: plans.iter().map(|p| p.id).max().unwrap_or(0) + 1,
                user_id,
                date: Utc::now(),
                created_at: Utc::now(),
                notes: notes.map(str::to_string),
            };
            let mut created = Vec::with_capacity(muscle_ids.len());
            for muscle_id in muscle_ids {
                let entry = PlanEntry {
                    id: entries.iter().map(|e| e.id).max().unwrap_or(0) + 1,
                    plan_id: plan.id,
                    muscle_id: *muscle_id,
                    sets,
                    created_at: Utc::now(),
                };
                entries.push(entry.clone());
                created.push(entry);
            }
            plans.push(plan.clone());
            Ok((plan, created))
        }

        async fn delete_plan(&self, id: i32) -> Result<Option<Plan>> {
            let mut plans = self.plans.lock().unwrap();
            let position = plans.iter().position(|p| p.id == id);
            Ok(position.map(|index| plans.remove(index)))
        }

        async fn select_plan_entries(&self, filters: Filters) -> Result<Vec<PlanEntry>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| filters.plan_id.is_none_or(|plan| e.plan_id == plan))
                .cloned()
                .collect())
        }

        async fn delete_plan_entries(&self, filters: Filters) -> Result<u64> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|e| {
                !(filters.plan_id.is_none_or(|plan| e.plan_id == plan)
                    && filters.muscle_id.is_none_or(|muscle| e.muscle_id == muscle))
            });
            Ok((before - entries.len()) as u64)
        }

        async fn patch_plan_entry(&self, id: i32, sets: i32) -> Result<Option<PlanEntry>> {
            let mut entries = self.entries.lock().unwrap();
            Ok(entries.iter_mut().find(|e| e.id == id).map(|entry| {
                entry.sets = sets;
                entry.clone()
            }))
        }
    }

    fn service() -> WorkoutService {
        WorkoutService::new(
            Arc::new(MemoryWorkoutRepository::with_muscles(&[
                "Biceps", "Triceps", "Quads",
            ])),
            Span::none(),
        )
    }

    #[tokio::test]
    async fn test_create_plan_with_entries_starts_at_one_set() {
        let service = service();
        let detail = service
            .create_plan_with_entries("leg day", &[1, 3])
            .await
            .unwrap();

        assert_eq!(detail.plan.user_id, DEFAULT_USER_ID);
        assert_eq!(detail.plan.notes.as_deref(), Some("leg day"));
        assert_eq!(detail.entries.len(), 2);
        assert!(detail.entries.iter().all(|e| e.entry.sets == 1));
        assert_eq!(
            detail.entries[1].muscle.as_ref().map(|m| m.name.as_str()),
            Some("Quads")
        );
    }

    #[tokio::test]
    async fn test_create_plan_with_unknown_muscle_is_not_found() {
        let err = service()
            .create_plan_with_entries("", &[42])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { resource: "muscle", .. }));
    }

    #[tokio::test]
    async fn test_unknown_muscle_leaves_no_plan_behind() {
        let service = service();
        let err = service
            .create_plan_with_entries("arms", &[1, 42, 2])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { resource: "muscle", .. }));

        assert!(service.read_plans(Filters::default()).await.unwrap().is_empty());
        assert!(
            service
                .repo
                .select_plan_entries(Filters::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_delete_plan_removes_entries() {
        let service = service();
        let detail = service.create_plan_with_entries("", &[1, 2]).await.unwrap();

        assert_eq!(service.delete_plan(detail.plan.id).await.unwrap(), 2);
        assert!(matches!(
            service.read_plan(detail.plan.id).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            service.delete_plan(detail.plan.id).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_sets_validates_and_patches() {
        let service = service();
        let detail = service.create_plan_with_entries("", &[2]).await.unwrap();
        let entry_id = detail.entries[0].entry.id;

        let entry = service.update_plan_entry_sets(entry_id, 4).await.unwrap();
        assert_eq!(entry.sets, 4);

        assert!(matches!(
            service.update_plan_entry_sets(entry_id, -1).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.update_plan_entry_sets(999, 3).await,
            Err(Error::NotFound { .. })
        ));

        let plan = service.read_plan(detail.plan.id).await.unwrap();
        assert_eq!(plan.entries[0].entry.sets, 4);
        assert_eq!(
            plan.entries[0].muscle.as_ref().map(|m| m.name.as_str()),
            Some("Triceps")
        );
    }

    #[tokio::test]
    async fn test_set_rank_requires_known_muscle() {
        let service = service();
        let rank = service
            .set_rank(&RankInput {
                user_id: 1,
                muscle_id: 2,
                rank: Some(3),
            })
            .await
            .unwrap();
        assert_eq!(rank.rank, Some(3));

        assert!(matches!(
            service
                .set_rank(&RankInput {
                    user_id: 1,
                    muscle_id: 77,
                    rank: None,
                })
                .await,
            Err(Error::NotFound { .. })
        ));
        assert_eq!(
            service
                .read_ranks(Filters {
                    user_id: Some(1),
                    ..Filters::default()
                })
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_plan_changes_are_logged_under_the_module_logger() {
        use tracing_subscriber::layer::SubscriberExt;

        let captured = crate::logging::capture::Captured::default();
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(captured.clone()),
        );

        let service = WorkoutService::new(
            Arc::new(MemoryWorkoutRepository::with_muscles(&["Biceps"])),
            tracing::info_span!("module", name = "workout"),
        );
        let detail = service.create_plan_with_entries("", &[1]).await.unwrap();
        service.delete_plan(detail.plan.id).await.unwrap();

        for message in ["created plan", "deleted plan entries", "deleted plan"] {
            assert_eq!(
                captured.span_of(message).as_deref(),
                Some("module"),
                "{message}"
            );
        }
    }
}
