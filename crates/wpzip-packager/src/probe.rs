//! Remote capability detection.
//!
//! # Design
//! - A probe result is decisive for the whole run: no retries, one remote
//!   process per distinct command.
//! - The probe is itself a [`RemoteCommandRunner`], so strategy factories and
//!   exporters can take it wherever a runner is expected.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;
use wpzip_core::{RemoteCommandRunner, RemoteResult, RemoteStream};

/// Caches `can_run` answers per command string; `run` passes straight through.
pub struct CapabilityProbe {
    runner: Arc<dyn RemoteCommandRunner>,
    cache: Mutex<HashMap<String, bool>>,
}

impl CapabilityProbe {
    /// Wrap `runner` with an empty cache.
    #[must_use]
    pub fn new(runner: Arc<dyn RemoteCommandRunner>) -> Self {
        Self {
            runner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl RemoteCommandRunner for CapabilityProbe {
    fn can_run(&self, command: &str) -> bool {
        if let Some(known) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(command)
        {
            return *known;
        }

        let available = self.runner.can_run(command);
        debug!(available, "probed remote capability");
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command.to_string(), available);
        available
    }

    fn run(&self, command: &str) -> RemoteResult<RemoteStream> {
        self.runner.run(command)
    }
}
