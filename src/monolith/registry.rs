//! Ordered module registry
//!
//! Drives the per-module state machine. Setup and post-setup walk the
//! registry in registration order; shutdown walks it backwards.

use super::{Module, Monolith, MonolithError};
use tracing::Span;

/// Where a module stands in its lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ModuleState {
    Uninitialized,
    SetupComplete,
    PostSetupComplete,
    ShutdownComplete,
}

struct ModuleEntry {
    module: Box<dyn Module>,
    state: ModuleState,
}

/// Outcome of a shutdown pass
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Modules shut down, in the order they were stopped
    pub stopped: Vec<&'static str>,
    /// Modules whose shutdown returned an error (still counted as stopped)
    pub failed: Vec<&'static str>,
}

/// The ordered collection of hosted modules
#[derive(Default)]
pub struct ModuleRegistry {
    entries: Vec<ModuleEntry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module. Registration order is dependency order.
    pub fn register(&mut self, module: Box<dyn Module>) -> Result<(), MonolithError> {
        let name = module.name();
        if self.entries.iter().any(|entry| entry.module.name() == name) {
            return Err(MonolithError::phase(
                "register",
                format!("module '{name}' registered twice"),
            ));
        }
        if self.entries.iter().any(|entry| entry.state != ModuleState::Uninitialized) {
            return Err(MonolithError::phase(
                "register",
                format!("cannot add '{name}' once setup has started"),
            ));
        }
        self.entries.push(ModuleEntry {
            module,
            state: ModuleState::Uninitialized,
        });
        Ok(())
    }

    /// Module names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.module.name()).collect()
    }

    pub fn state_of(&self, name: &str) -> Option<ModuleState> {
        self.entries
            .iter()
            .find(|entry| entry.module.name() == name)
            .map(|entry| entry.state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run `setup` on every module, in order, stopping at the first error.
    ///
    /// The failing module's error is returned unchanged. Modules set up
    /// before it stay in [`ModuleState::SetupComplete`] so that a later
    /// shutdown still releases them.
    pub async fn setup_all(&mut self, mono: &dyn Monolith, logger: &Span) -> crate::Result<()> {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.state != ModuleState::Uninitialized)
        {
            return Err(MonolithError::phase(
                "setup",
                format!("module '{}' is already {}", entry.module.name(), entry.state),
            )
            .into());
        }

        for entry in &mut self.entries {
            let name = entry.module.name();
            tracing::debug!(parent: logger, module = name, "setting up module");

            if let Err(err) = entry.module.setup(mono).await {
                tracing::error!(parent: logger, module = name, error = %err, "module setup failed");
                return Err(err);
            }

            entry.state = ModuleState::SetupComplete;
            tracing::info!(parent: logger, module = name, "module set up");
        }
        Ok(())
    }

    /// Run `post_setup` on every module, in order, stopping at the first
    /// error. Refuses to start unless every module completed setup.
    pub async fn post_setup_all(
        &mut self,
        mono: &dyn Monolith,
        logger: &Span,
    ) -> crate::Result<()> {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.state != ModuleState::SetupComplete)
        {
            return Err(MonolithError::phase(
                "post-setup",
                format!(
                    "module '{}' is {}, expected {}",
                    entry.module.name(),
                    entry.state,
                    ModuleState::SetupComplete
                ),
            )
            .into());
        }

        for entry in &mut self.entries {
            let name = entry.module.name();
            if let Err(err) = entry.module.post_setup(mono).await {
                tracing::error!(parent: logger, module = name, error = %err, "module post-setup failed");
                return Err(err);
            }
            entry.state = ModuleState::PostSetupComplete;
            tracing::debug!(parent: logger, module = name, "module post-setup complete");
        }
        Ok(())
    }

    /// Shut down every module that completed setup, in reverse order.
    ///
    /// Errors are logged and the pass continues. Calling this again is a
    /// no-op for modules already shut down.
    pub async fn shutdown_all(&mut self, logger: &Span) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        for entry in self.entries.iter_mut().rev() {
            if !matches!(
                entry.state,
                ModuleState::SetupComplete | ModuleState::PostSetupComplete
            ) {
                continue;
            }

            let name = entry.module.name();
            if let Err(err) = entry.module.shutdown().await {
                tracing::error!(parent: logger, module = name, error = %err, "module shutdown failed");
                report.failed.push(name);
            } else {
                tracing::info!(parent: logger, module = name, "module shut down");
            }
            entry.state = ModuleState::ShutdownComplete;
            report.stopped.push(name);
        }
        report
    }
}
