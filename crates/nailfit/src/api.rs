//! High-level session API.
//!
//! [`NailFitter`] is the primary entry point. It wraps a [`PipelineConfig`]
//! and runs whole sessions against caller-supplied services.

use std::path::Path;

use crate::config::{ConfigError, PipelineConfig};
use crate::pipeline::{self, PipelineError, Services, SessionInput, SessionReport};
use crate::session::SessionId;

/// Primary pipeline interface.
///
/// Create once, analyze many sessions.
///
/// # Examples
///
/// ```no_run
/// use nailfit::{
///     FsSessionStorage, NailFitter, OfflineGenerator, Photo, ReplayOracle, Services,
///     SessionId, SessionInput, ThreadSleeper,
/// };
/// use std::path::Path;
///
/// let oracle = ReplayOracle::from_json_file(Path::new("oracle.json")).unwrap();
/// let storage = FsSessionStorage::new("sessions");
/// let services = Services {
///     oracle: &oracle,
///     generator: &OfflineGenerator,
///     storage: &storage,
///     sleeper: &ThreadSleeper,
/// };
/// let input = SessionInput {
///     reference: Photo::open(Path::new("card.jpg")).unwrap(),
///     fingers: Vec::new(),
///     style: None,
/// };
/// let fitter = NailFitter::new();
/// let report = fitter
///     .analyze(&SessionId::new("demo").unwrap(), &input, &services)
///     .unwrap();
/// println!("overall confidence {:.2}", report.measurements.overall_confidence());
/// ```
#[derive(Debug, Clone, Default)]
pub struct NailFitter {
    config: PipelineConfig,
}

impl NailFitter {
    /// Create with default configuration (ID-1 card, 300 dpi, stretch fit).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with full config control.
    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Load a JSON config file and create a fitter in one step.
    pub fn from_config_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::with_config(PipelineConfig::from_json_file(path)?))
    }

    /// Access the current configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    /// Run one session and persist its outputs under `session`.
    ///
    /// Fails only when the reference object cannot be calibrated (nothing is
    /// written in that case) or when storage fails.
    pub fn analyze(
        &self,
        session: &SessionId,
        input: &SessionInput,
        services: &Services<'_>,
    ) -> Result<SessionReport, PipelineError> {
        pipeline::run_session(&self.config, session, input, services)
    }
}
