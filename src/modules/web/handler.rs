use super::templates::{self, TemplateSet};
use super::views::{DashboardView, PlanEntriesView, SavedEntriesView};
use crate::common::{FormFields, PathId, StatusCode};
use crate::modules::workout::WorkoutClient;
use crate::monolith::{Deferred, RequestLogger, RouteDefinition};
use crate::{Error, Result};
use axum::extract::State;
use axum::response::Html;
use std::sync::Arc;

/// Notes attached to plans created from the dashboard
const DASHBOARD_PLAN_NOTES: &str = "created from dashboard";

/// Page handlers. The workout client is bound after setup; until then every
/// handler answers 503.
#[derive(Clone)]
pub struct WebHandlers {
    workout: Deferred<dyn WorkoutClient>,
    templates: Arc<TemplateSet>,
}

impl WebHandlers {
    pub fn new(workout: Deferred<dyn WorkoutClient>, templates: Arc<TemplateSet>) -> Self {
        Self { workout, templates }
    }

    pub fn routes(&self) -> crate::monolith::Result<Vec<RouteDefinition>> {
        let state = self.clone();
        Ok(vec![
            RouteDefinition::new("GET /dashboard", dashboard_page, state.clone())?,
            RouteDefinition::new("POST /plans/new", new_plan_page, state.clone())?,
            RouteDefinition::new("DELETE /plans/{id}", delete_plan, state.clone())?,
            RouteDefinition::new("POST /plans/entries", plan_entries_page, state)?,
        ])
    }
}

fn parse_ids<'a>(values: impl Iterator<Item = &'a str>, field: &str) -> Result<Vec<i32>> {
    values
        .map(|v| {
            v.trim()
                .parse::<i32>()
                .map_err(|_| Error::BadRequest(format!("invalid {field} value {v:?}")))
        })
        .collect()
}

async fn dashboard_page(State(h): State<WebHandlers>) -> Result<Html<String>> {
    let muscles = h.workout.get()?.read_muscles().await?;
    let page = h
        .templates
        .render(templates::DASHBOARD, &DashboardView::seeded(muscles))?;
    Ok(Html(page))
}

async fn new_plan_page(
    log: RequestLogger,
    State(h): State<WebHandlers>,
    form: FormFields,
) -> Result<Html<String>> {
    let workout = h.workout.get()?;
    let muscle_ids = parse_ids(form.all("muscles"), "muscles")?;
    if muscle_ids.is_empty() {
        return Err(Error::BadRequest("pick at least one muscle".into()));
    }

    let plan = workout
        .create_plan_with_entries(DASHBOARD_PLAN_NOTES, &muscle_ids)
        .await?;
    tracing::info!(parent: log.span(), plan_id = plan.plan.id, entries = plan.entries.len(), "plan created");

    let fragment = h
        .templates
        .render(templates::PLAN_ENTRIES_FORM, &PlanEntriesView::from(&plan))?;
    Ok(Html(fragment))
}

async fn delete_plan(
    log: RequestLogger,
    State(h): State<WebHandlers>,
    PathId(id): PathId,
) -> Result<axum::http::StatusCode> {
    let deleted_entries = h.workout.get()?.delete_plan(id).await?;
    tracing::info!(parent: log.span(), plan_id = id, deleted_entries, "plan deleted");
    Ok(StatusCode::NoContent.into())
}

async fn plan_entries_page(
    log: RequestLogger,
    State(h): State<WebHandlers>,
    form: FormFields,
) -> Result<Html<String>> {
    let workout = h.workout.get()?;
    let entry_ids = parse_ids(form.all("entry"), "entry")?;
    let sets = parse_ids(form.all("sets"), "sets")?;
    if entry_ids.len() != sets.len() {
        return Err(Error::BadRequest(
            "every entry needs exactly one sets value".into(),
        ));
    }

    let mut updated = Vec::with_capacity(entry_ids.len());
    for (entry_id, sets) in entry_ids.into_iter().zip(sets) {
        updated.push(workout.update_plan_entry_sets(entry_id, sets).await?);
    }
    tracing::info!(parent: log.span(), entries = updated.len(), "plan entries updated");

    let fragment = h.templates.render(
        templates::PLAN_ENTRIES_SAVED,
        &SavedEntriesView::from(updated.as_slice()),
    )?;
    Ok(Html(fragment))
}
