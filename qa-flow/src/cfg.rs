//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use ai_llm_service::error_handler::{EnvLookup, env_opt_u64};

use crate::error::FlowError;

/// Chunks fetched on the first retrieval of every question.
pub const INITIAL_RETRIEVAL_BREADTH: usize = 5;
/// Added to the breadth by the widen step of the ladder.
pub const BREADTH_STEP: usize = 5;

/// Knobs of the correction flow. All fields have defaults via [`FlowConfig::default`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowConfig {
    pub initial_breadth: usize,
    pub breadth_step: usize,
    /// Upper bound for any single retrieval or model call.
    pub call_timeout: Duration,
    /// Upper bound for a whole question, across every attempt.
    pub deadline: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            initial_breadth: INITIAL_RETRIEVAL_BREADTH,
            breadth_step: BREADTH_STEP,
            call_timeout: Duration::from_secs(60),
            deadline: Duration::from_secs(300),
        }
    }
}

impl FlowConfig {
    /// Reads `FLOW_CALL_TIMEOUT_SECS` (60) and `FLOW_DEADLINE_SECS` (300).
    pub fn from_lookup(env: EnvLookup<'_>) -> Result<Self, FlowError> {
        let mut cfg = Self::default();
        let secs = |name: &'static str| {
            env_opt_u64(env, name).map_err(|e| FlowError::Config(e.to_string()))
        };
        if let Some(s) = secs("FLOW_CALL_TIMEOUT_SECS")? {
            cfg.call_timeout = Duration::from_secs(s);
        }
        if let Some(s) = secs("FLOW_DEADLINE_SECS")? {
            cfg.deadline = Duration::from_secs(s);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        if self.initial_breadth == 0 {
            return Err(FlowError::Config("initial retrieval breadth must be > 0".into()));
        }
        if self.call_timeout.is_zero() || self.deadline.is_zero() {
            return Err(FlowError::Config("timeouts must be > 0 seconds".into()));
        }
        Ok(())
    }
}
