//! View models handed to the HTML templates

use crate::modules::workout::{Muscle, PlanDetail, PlanEntry, model::MAX_SETS};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub suggestion: Option<SuggestionView>,
    pub muscles: Vec<Muscle>,
    pub recent_muscles: Vec<MuscleView>,
    pub kpi: Kpi,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionView {
    pub id: String,
    pub primary_label: String,
    pub accessories: String,
    pub avoid: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Kpi {
    pub sessions: u32,
    pub unique_muscles: u32,
    pub run_km: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MuscleView {
    pub name: String,
}

impl DashboardView {
    /// Dashboard around the given muscle picker.
    ///
    /// Suggestion, recent muscles and KPIs are placeholders until training
    /// history is recorded.
    pub fn seeded(muscles: Vec<Muscle>) -> Self {
        Self {
            suggestion: Some(SuggestionView {
                id: "seed".into(),
                primary_label: "Upper Pull (back, biceps)".into(),
                accessories: "Core stability".into(),
                avoid: "Chest".into(),
            }),
            muscles,
            recent_muscles: ["Chest", "Quads"]
                .into_iter()
                .map(|name| MuscleView { name: name.into() })
                .collect(),
            kpi: Kpi {
                sessions: 3,
                unique_muscles: 8,
                run_km: 18,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanEntriesView {
    pub plan_id: i32,
    pub date: String,
    pub notes: Option<String>,
    pub max_sets: i32,
    pub entries: Vec<PlanEntryView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanEntryView {
    pub entry_id: i32,
    pub muscle_name: String,
    pub sets: i32,
}

impl From<&PlanDetail> for PlanEntriesView {
    fn from(detail: &PlanDetail) -> Self {
        Self {
            plan_id: detail.plan.id,
            date: detail.plan.date.format("%Y-%m-%d").to_string(),
            notes: detail.plan.notes.clone(),
            max_sets: MAX_SETS,
            entries: detail
                .entries
                .iter()
                .map(|e| PlanEntryView {
                    entry_id: e.entry.id,
                    muscle_name: e
                        .muscle
                        .as_ref()
                        .map(|m| m.name.clone())
                        .unwrap_or_else(|| format!("muscle #{}", e.entry.muscle_id)),
                    sets: e.entry.sets,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedEntriesView {
    pub count: usize,
    pub entries: Vec<SavedEntryView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedEntryView {
    pub entry_id: i32,
    pub sets: i32,
}

impl From<&[PlanEntry]> for SavedEntriesView {
    fn from(entries: &[PlanEntry]) -> Self {
        Self {
            count: entries.len(),
            entries: entries
                .iter()
                .map(|e| SavedEntryView {
                    entry_id: e.id,
                    sets: e.sets,
                })
                .collect(),
        }
    }
}
