//! Modules and fixtures shared by the container tests

use super::application::Shared;
use super::mux::RouteDefinition;
use super::{Module, Monolith, MonolithError};
use crate::config::Config;
use async_trait::async_trait;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use std::sync::{Arc, Mutex};
use tracing::Span;

pub(crate) fn mock_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

pub(crate) fn test_shared() -> Shared {
    Shared::new(mock_db(), Config::default(), Span::none())
}

/// Records lifecycle calls across modules, in call order
#[derive(Clone, Default)]
pub(crate) struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub(crate) fn record(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub(crate) trait Gauge: Send + Sync {
    fn value(&self) -> i32;
}

struct FixedGauge(i32);

impl Gauge for FixedGauge {
    fn value(&self) -> i32 {
        self.0
    }
}

pub(crate) struct TestModule {
    name: &'static str,
    trace: Trace,
    setup_error: Option<&'static str>,
    shutdown_fails: bool,
    provides: Option<i32>,
    reads_gauge: bool,
}

impl TestModule {
    pub(crate) fn new(name: &'static str, trace: &Trace) -> Self {
        Self {
            name,
            trace: trace.clone(),
            setup_error: None,
            shutdown_fails: false,
            provides: None,
            reads_gauge: false,
        }
    }

    pub(crate) fn failing_setup(mut self, message: &'static str) -> Self {
        self.setup_error = Some(message);
        self
    }

    pub(crate) fn failing_shutdown(mut self) -> Self {
        self.shutdown_fails = true;
        self
    }

    pub(crate) fn providing(mut self, value: i32) -> Self {
        self.provides = Some(value);
        self
    }

    pub(crate) fn resolving_during_setup(mut self) -> Self {
        self.reads_gauge = true;
        self
    }
}

#[async_trait]
impl Module for TestModule {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn setup(&mut self, mono: &dyn Monolith) -> crate::Result<()> {
        self.trace.record(format!("setup:{}", self.name));
        if let Some(message) = self.setup_error {
            return Err(crate::Error::Internal(message.to_string()));
        }
        if let Some(value) = self.provides {
            mono.capabilities()
                .provide::<dyn Gauge>(self.name, Arc::new(FixedGauge(value)))?;
        }
        if self.reads_gauge {
            match mono.capabilities().resolve::<dyn Gauge>() {
                Err(MonolithError::CapabilityNotReady { .. }) => {
                    self.trace.record(format!("resolve:{}:not-ready", self.name));
                }
                Ok(_) => self.trace.record(format!("resolve:{}:ready", self.name)),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    async fn post_setup(&mut self, mono: &dyn Monolith) -> crate::Result<()> {
        if self.reads_gauge {
            let gauge = mono.capabilities().resolve::<dyn Gauge>()?;
            self.trace
                .record(format!("post:{}:{}", self.name, gauge.value()));
        } else {
            self.trace.record(format!("post:{}", self.name));
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> crate::Result<()> {
        self.trace.record(format!("shutdown:{}", self.name));
        if self.shutdown_fails {
            return Err(crate::Error::Internal("cache flush failed".into()));
        }
        Ok(())
    }
}

/// Module that answers `GET {path}` with its own name
pub(crate) struct RouteModule {
    name: &'static str,
    path: &'static str,
    trace: Trace,
}

impl RouteModule {
    pub(crate) fn new(name: &'static str, path: &'static str, trace: &Trace) -> Self {
        Self {
            name,
            path,
            trace: trace.clone(),
        }
    }
}

#[async_trait]
impl Module for RouteModule {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn setup(&mut self, mono: &dyn Monolith) -> crate::Result<()> {
        let name = self.name;
        let route = RouteDefinition::stateless(&format!("GET {}", self.path), move || async move {
            name
        })?;
        mono.mux().handle(name, route)?;
        self.trace.record(format!("setup:{name}"));
        Ok(())
    }

    async fn shutdown(&mut self) -> crate::Result<()> {
        self.trace.record(format!("shutdown:{}", self.name));
        Ok(())
    }
}
