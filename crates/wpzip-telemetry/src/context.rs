//! Run-scoped tracing context.
//!
//! # Design
//! - Each packaging run gets a fresh identifier carried on a root span, so
//!   every event from discovery to archive finalisation can be correlated.
//! - The span stays entered for as long as the guard lives.

use tracing::span::EnteredSpan;
use uuid::Uuid;

use crate::init::version;

/// Guard keeping the `run` span entered for one packaging run.
pub struct RunContext {
    run_id: Uuid,
    _span: EnteredSpan,
}

impl RunContext {
    /// Enter a new `run` span tagged with a random run id, the target host,
    /// and the tool version.
    #[must_use]
    pub fn enter(host: &str) -> Self {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "run",
            run_id = %run_id,
            host = %host,
            version = %version()
        )
        .entered();
        Self {
            run_id,
            _span: span,
        }
    }

    /// Identifier of this run.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_run_gets_a_distinct_id() {
        let first = RunContext::enter("example.com");
        let first_id = first.run_id();
        drop(first);
        let second = RunContext::enter("example.com");
        assert_ne!(first_id, second.run_id());
        assert_eq!(second.run_id().get_version_num(), 4);
    }
}
