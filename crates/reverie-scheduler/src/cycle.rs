//! The cycle engine: the fixed-cadence loop driving unowned characters.
//!
//! One engine runs per world. Each cycle it measures the elapsed wall
//! time, queries the eligible characters (unowned and awake, story
//! characters first), and processes them strictly in order: physiology
//! tick, context build, model call, parse, validate, execute. Characters
//! later in the order re-read world state, so they observe what earlier
//! characters did in the same cycle.
//!
//! The next cycle is scheduled after the previous one completes -- the
//! interval is minimum spacing between cycle starts, and a loaded cycle
//! may exceed it (best-effort cadence, never overlapping).
//!
//! Per-character failures are isolated: a failed turn is counted and
//! logged, and the cycle moves to the next character.

use std::time::{Duration, Instant};

use reverie_db::{area_store, character_store, item_store};
use reverie_kernel::{Kernel, KernelError, StateUpdate, physiology};
use reverie_llm::{GenerationOptions, LlmRouter};
use reverie_types::{Character, WorldId};
use tokio::sync::watch;

use crate::context::{TurnContext, build_prompt};
use crate::error::TurnError;
use crate::execute;
use crate::parse;
use crate::stats::CycleStats;

/// Default minimum spacing between cycle starts, in milliseconds.
const DEFAULT_CYCLE_INTERVAL_MS: u64 = 5000;

/// Sampling temperature for action generation.
const ACTION_TEMPERATURE: f64 = 0.3;

/// Output bound for action generation: one small JSON object.
const ACTION_MAX_TOKENS: u32 = 64;

/// Invalid scheduler configuration.
#[derive(Debug, thiserror::Error)]
#[error("invalid scheduler configuration: {0}")]
pub struct ConfigError(String);

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// The world this engine drives.
    pub world_id: WorldId,
    /// Minimum spacing between cycle starts.
    pub cycle_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            world_id: WorldId::new(1),
            cycle_interval: Duration::from_millis(DEFAULT_CYCLE_INTERVAL_MS),
        }
    }
}

impl SchedulerConfig {
    /// Load from `WORLD_ID` and `CYCLE_INTERVAL` (milliseconds).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a set variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let world_id = match std::env::var("WORLD_ID") {
            Ok(raw) if !raw.is_empty() => WorldId::new(
                raw.parse()
                    .map_err(|e| ConfigError(format!("invalid WORLD_ID: {e}")))?,
            ),
            _ => defaults.world_id,
        };
        let cycle_interval = match std::env::var("CYCLE_INTERVAL") {
            Ok(raw) if !raw.is_empty() => Duration::from_millis(
                raw.parse()
                    .map_err(|e| ConfigError(format!("invalid CYCLE_INTERVAL: {e}")))?,
            ),
            _ => defaults.cycle_interval,
        };
        Ok(Self {
            world_id,
            cycle_interval,
        })
    }
}

/// What one cycle did, for logging.
#[derive(Debug, Clone, Copy)]
pub struct CycleSummary {
    /// Characters eligible at the start of the cycle.
    pub eligible: usize,
    /// Turns that executed an action successfully.
    pub succeeded: usize,
    /// Turns that failed anywhere in the pipeline.
    pub failed: usize,
    /// Turns skipped because the character fell asleep during the
    /// physiology tick.
    pub skipped: usize,
}

/// The per-world cycle engine.
pub struct CycleEngine {
    kernel: Kernel,
    router: LlmRouter,
    config: SchedulerConfig,
    stats: CycleStats,
    last_cycle: Instant,
}

impl CycleEngine {
    /// Create an engine; the elapsed-time clock starts now.
    pub fn new(kernel: Kernel, router: LlmRouter, config: SchedulerConfig) -> Self {
        Self {
            kernel,
            router,
            config,
            stats: CycleStats::default(),
            last_cycle: Instant::now(),
        }
    }

    /// The accumulated statistics.
    pub const fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Run cycles until `shutdown` flips to `true`. The in-flight cycle
    /// always completes; statistics are logged on the way out.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> CycleStats {
        tracing::info!(
            world_id = %self.config.world_id,
            cycle_interval_ms = self.config.cycle_interval.as_millis() as u64,
            "scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_cycle().await {
                Ok(summary) => {
                    tracing::debug!(
                        eligible = summary.eligible,
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        skipped = summary.skipped,
                        "cycle complete"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cycle failed, continuing");
                }
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.cycle_interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        tracing::info!("scheduler stopped");
        self.stats.log_summary();
        self.stats
    }

    /// Run exactly one cycle, measuring the elapsed wall time since the
    /// previous one.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError`] only if the eligibility query itself fails;
    /// per-character failures are absorbed into the summary.
    pub async fn run_cycle(&mut self) -> Result<CycleSummary, KernelError> {
        let now = Instant::now();
        let dt_secs = now.duration_since(self.last_cycle).as_secs_f64();
        self.last_cycle = now;
        self.run_cycle_with_dt(dt_secs).await
    }

    /// Run exactly one cycle against an explicit elapsed time. Exposed
    /// for manual stepping and tests that need a synthetic delta.
    ///
    /// # Errors
    ///
    /// See [`CycleEngine::run_cycle`].
    pub async fn run_cycle_with_dt(
        &mut self,
        dt_secs: f64,
    ) -> Result<CycleSummary, KernelError> {
        let started = Instant::now();

        let eligible =
            character_store::list_eligible(self.kernel.db().pool(), self.config.world_id).await?;

        let mut summary = CycleSummary {
            eligible: eligible.len(),
            succeeded: 0,
            failed: 0,
            skipped: 0,
        };

        for character in &eligible {
            self.stats.characters_processed = self.stats.characters_processed.saturating_add(1);
            match self.take_turn(character, dt_secs).await {
                Ok(Some(kind)) => {
                    summary.succeeded = summary.succeeded.saturating_add(1);
                    self.stats.actions_succeeded = self.stats.actions_succeeded.saturating_add(1);
                    tracing::info!(
                        character_id = %character.id,
                        action = kind,
                        "action executed"
                    );
                }
                Ok(None) => {
                    summary.skipped = summary.skipped.saturating_add(1);
                }
                Err(e) => {
                    summary.failed = summary.failed.saturating_add(1);
                    self.stats.actions_failed = self.stats.actions_failed.saturating_add(1);
                    tracing::warn!(
                        character_id = %character.id,
                        error = %e,
                        "turn failed, continuing with next character"
                    );
                }
            }
        }

        self.stats.record_cycle(started.elapsed());
        Ok(summary)
    }

    /// Process one character's turn: physiology, context, model, parse,
    /// execute. Returns the executed action kind, or `None` when the
    /// character fell asleep during the physiology tick.
    async fn take_turn(
        &mut self,
        character: &Character,
        dt_secs: f64,
    ) -> Result<Option<&'static str>, TurnError> {
        // Physiology against the shared cycle delta, committed as a single
        // state update. The kernel re-applies clamps and the forced-sleep
        // rule on write.
        let mut projected = character.clone();
        let forced_asleep = physiology::apply_elapsed(&mut projected, dt_secs);
        let update = StateUpdate {
            nutrition: Some(projected.nutrition),
            hydration: Some(projected.hydration),
            tiredness: Some(projected.tiredness),
            alertness: Some(projected.alertness),
            damage: Some(projected.damage.clone()),
        };
        self.kernel.update_state(character.id, &update).await?;

        if forced_asleep || !projected.is_awake() {
            tracing::debug!(character_id = %character.id, "fell asleep, turn skipped");
            return Ok(None);
        }

        // Fresh reads: a character later in the cycle observes what
        // earlier characters did.
        let pool = self.kernel.db().pool();
        let current = character_store::fetch(pool, character.id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "character",
                id: character.id.into_inner(),
            })?;

        let area = match current.current_area_id {
            Some(area_id) => area_store::fetch(pool, area_id).await?,
            None => None,
        };
        let (occupants, area_items) = match &area {
            Some(area) => (
                character_store::list_in_area(pool, area.id).await?,
                item_store::list_in_area(pool, area.id).await?,
            ),
            None => (Vec::new(), Vec::new()),
        };
        let inventory = item_store::list_held_by(pool, current.id).await?;

        let ctx = TurnContext {
            character: &current,
            area: area.as_ref(),
            occupants: &occupants,
            area_items: &area_items,
            inventory: &inventory,
        };
        let prompt = build_prompt(&ctx);

        // The closing brace is a stop string: the action is one small
        // JSON object and generation has no other reason to continue.
        let options = GenerationOptions {
            temperature: ACTION_TEMPERATURE,
            top_p: None,
            max_tokens: ACTION_MAX_TOKENS,
            stop: vec!["}".to_owned(), "\n\n".to_owned()],
        };
        let raw = self
            .router
            .complete(current.character_class, &prompt, &options)
            .await?;

        self.stats.actions_attempted = self.stats.actions_attempted.saturating_add(1);
        let action = parse::parse_action(&raw)?;
        execute::execute(&self.kernel, &current, &action).await?;
        Ok(Some(action.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = SchedulerConfig::default();
        assert_eq!(config.world_id, WorldId::new(1));
        assert_eq!(config.cycle_interval, Duration::from_millis(5000));
    }

    #[test]
    fn from_env_falls_back_when_unset() {
        // These variables are not set in the test environment.
        let config = SchedulerConfig::from_env();
        assert!(config.is_ok());
    }
}
