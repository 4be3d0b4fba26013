//! Reconciliation runner
//!
//! The Reconciler drives one pass over the managed zones:
//! - Listing each zone's records via DnsProvider
//! - Computing the zone's action set
//! - Applying it (whole, or stage by stage), unless in dry-run mode
//! - Reporting what happened
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   Vec<DesiredZone>
//! │  ZoneLayout  │─────────────────────┐
//! └──────────────┘                     │
//!                                      ▼
//!                             ┌──────────────┐
//!                             │  Reconciler  │
//!                             └──────────────┘
//!                                      │
//!         ┌────────────────────────────┼───────────────────────────┐
//!         │                            │                           │
//!         ▼                            ▼                           ▼
//! ┌──────────────┐           ┌──────────────────┐          ┌─────────────┐
//! │ DnsProvider  │           │ compute_actions  │          │   Events    │
//! │ (list/apply) │           │ (pure)           │          │  (notify)   │
//! └──────────────┘           └──────────────────┘          └─────────────┘
//! ```
//!
//! ## Flow per zone
//!
//! 1. `DnsProvider::list_records()`
//! 2. `compute_zone_actions()`
//! 3. Nothing to do → `ZoneUnchanged`
//! 4. Dry-run → `DryRun`, nothing submitted
//! 5. Otherwise `DnsProvider::apply()`, once or per stage
//!
//! The first error stops the pass; nothing is retried.

use crate::config::EngineConfig;
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::reconcile::{self, Stage};
use crate::record::ActionSet;
use crate::traits::{ApplyOutcome, DnsProvider};
use crate::tree::DesiredZone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Pass started
    Started {
        zones_count: usize,
    },

    /// A zone's records were listed
    ZoneListed {
        zone: Domain,
        records_count: usize,
    },

    /// A zone's action set was computed
    ActionsComputed {
        zone: Domain,
        puts: usize,
        deletes: usize,
    },

    /// A zone already matches its layout
    ZoneUnchanged {
        zone: Domain,
    },

    /// A stage of a zone's plan was applied
    StageApplied {
        zone: Domain,
        depth: usize,
        outcome: ApplyOutcome,
    },

    /// All of a zone's actions were applied
    ZoneApplied {
        zone: Domain,
        outcome: ApplyOutcome,
    },

    /// A zone's actions were computed but not applied
    DryRun {
        zone: Domain,
        actions: ActionSet,
    },

    /// Processing a zone failed
    Failed {
        zone: Domain,
        error: String,
    },

    /// Pass finished
    Finished {
        changed_zones: usize,
    },
}

/// What happened to one zone during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneReport {
    /// Zone apex
    pub zone: Domain,
    /// Computed actions
    pub actions: ActionSet,
    /// What the provider changed; `None` when nothing was submitted
    pub applied: Option<ApplyOutcome>,
}

/// Outcome of a full pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// When the pass started
    pub started_at: DateTime<Utc>,
    /// When the pass finished
    pub finished_at: DateTime<Utc>,
    /// Whether changes were withheld
    pub dry_run: bool,
    /// Per-zone results, in layout order
    pub zones: Vec<ZoneReport>,
}

impl ReconcileReport {
    /// True when no zone needed any change
    pub fn is_converged(&self) -> bool {
        self.zones.iter().all(|z| z.actions.is_empty())
    }

    /// Every zone's actions, concatenated in layout order
    pub fn actions(&self) -> ActionSet {
        let mut all = ActionSet::new();
        for zone in &self.zones {
            all.extend(zone.actions.clone());
        }
        all
    }
}

/// A zone's computed actions, before anything is applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonePlan {
    /// Zone apex
    pub zone: Domain,
    /// Computed actions
    pub actions: ActionSet,
    /// Dependency-ordered stages of `actions`, empty unless staged apply
    /// is enabled
    pub stages: Vec<Stage>,
}

/// Reconciliation runner
///
/// Holds the provider and the desired zones, and runs single passes on
/// demand. It keeps no state between passes.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::run_once()`] (or [`Reconciler::plan()`])
/// 3. Drain the event receiver if interested
pub struct Reconciler {
    /// DNS provider for listing and changing records
    provider: Box<dyn DnsProvider>,

    /// Zones to manage
    zones: Vec<DesiredZone>,

    /// Compute only, never apply
    dry_run: bool,

    /// Apply dependency-ordered stages instead of one batch
    staged_apply: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `provider`: DNS provider implementation
    /// - `zones`: Desired zones, usually from [`crate::layout::ZoneLayout`]
    /// - `config`: Engine configuration
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// engine events
    pub fn new(
        provider: Box<dyn DnsProvider>,
        zones: Vec<DesiredZone>,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;
        if zones.is_empty() {
            return Err(Error::config("No zones configured"));
        }

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let reconciler = Self {
            provider,
            zones,
            dry_run: config.dry_run,
            staged_apply: config.staged_apply,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Managed zones
    pub fn zones(&self) -> &[DesiredZone] {
        &self.zones
    }

    /// List and compute every zone's actions without applying anything
    ///
    /// # Errors
    ///
    /// Returns the first listing or reconciliation error. With staged apply
    /// enabled, an action set that cannot be staged is an error as well.
    pub async fn plan(&self) -> Result<Vec<ZonePlan>> {
        let mut plans = Vec::with_capacity(self.zones.len());
        for zone in &self.zones {
            let actions = self.compute(zone).await?;
            let stages = if self.staged_apply {
                reconcile::stage(&zone.apex, &actions)?
            } else {
                Vec::new()
            };
            plans.push(ZonePlan {
                zone: zone.apex.clone(),
                actions,
                stages,
            });
        }
        Ok(plans)
    }

    /// Run one reconciliation pass over every zone
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileReport)`: Every zone was processed
    /// - `Err(Error)`: The first failure; later zones are not processed
    pub async fn run_once(&self) -> Result<ReconcileReport> {
        let started_at = Utc::now();
        self.emit_event(EngineEvent::Started {
            zones_count: self.zones.len(),
        });
        info!(
            "Reconciling {} zone(s) via {}{}",
            self.zones.len(),
            self.provider.provider_name(),
            if self.dry_run { " [DRY-RUN]" } else { "" }
        );

        let mut reports = Vec::with_capacity(self.zones.len());
        for zone in &self.zones {
            match self.reconcile_zone(zone).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!("Failed to reconcile {}: {}", zone.apex, e);
                    self.emit_event(EngineEvent::Failed {
                        zone: zone.apex.clone(),
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }

        let changed_zones = reports.iter().filter(|r| r.applied.is_some()).count();
        self.emit_event(EngineEvent::Finished { changed_zones });
        info!("Reconciliation finished: {} zone(s) changed", changed_zones);

        Ok(ReconcileReport {
            started_at,
            finished_at: Utc::now(),
            dry_run: self.dry_run,
            zones: reports,
        })
    }

    /// List a zone and compute its actions
    async fn compute(&self, zone: &DesiredZone) -> Result<ActionSet> {
        let observed = self
            .provider
            .list_records(&zone.apex)
            .await
            .map_err(|e| wrap_list(&zone.apex, e))?;
        debug!("Listed {} record(s) for {}", observed.len(), zone.apex);
        self.emit_event(EngineEvent::ZoneListed {
            zone: zone.apex.clone(),
            records_count: observed.len(),
        });

        let actions = reconcile::compute_zone_actions(zone, &observed)?;
        self.emit_event(EngineEvent::ActionsComputed {
            zone: zone.apex.clone(),
            puts: actions.puts.len(),
            deletes: actions.deletes.len(),
        });
        Ok(actions)
    }

    /// Process a single zone
    async fn reconcile_zone(&self, zone: &DesiredZone) -> Result<ZoneReport> {
        let actions = self.compute(zone).await?;

        if actions.is_empty() {
            debug!("Zone {} is up to date", zone.apex);
            self.emit_event(EngineEvent::ZoneUnchanged {
                zone: zone.apex.clone(),
            });
            return Ok(ZoneReport {
                zone: zone.apex.clone(),
                actions,
                applied: None,
            });
        }

        for record in &actions.puts {
            info!("{} upsert {}", zone.apex, record);
        }
        for name in &actions.deletes {
            info!("{} delete {}", zone.apex, name);
        }

        if self.dry_run {
            info!(
                "[DRY-RUN] Would apply {} action(s) to {}",
                actions.len(),
                zone.apex
            );
            self.emit_event(EngineEvent::DryRun {
                zone: zone.apex.clone(),
                actions: actions.clone(),
            });
            return Ok(ZoneReport {
                zone: zone.apex.clone(),
                actions,
                applied: None,
            });
        }

        let outcome = if self.staged_apply {
            self.apply_staged(&zone.apex, &actions).await?
        } else {
            self.apply(&zone.apex, &actions).await?
        };

        info!(
            "Applied to {}: {} upserted, {} deleted",
            zone.apex, outcome.upserted, outcome.deleted
        );
        self.emit_event(EngineEvent::ZoneApplied {
            zone: zone.apex.clone(),
            outcome,
        });

        Ok(ZoneReport {
            zone: zone.apex.clone(),
            actions,
            applied: Some(outcome),
        })
    }

    /// Submit a whole action set in one call
    async fn apply(&self, zone: &Domain, actions: &ActionSet) -> Result<ApplyOutcome> {
        self.provider
            .apply(zone, actions)
            .await
            .map_err(|e| wrap_apply(zone, e))
    }

    /// Submit an action set stage by stage
    async fn apply_staged(&self, zone: &Domain, actions: &ActionSet) -> Result<ApplyOutcome> {
        let stages = reconcile::stage(zone, actions)?;
        debug!("Applying {} stage(s) to {}", stages.len(), zone);

        let mut total = ApplyOutcome::default();
        for stage in &stages {
            let outcome = self.apply(zone, &stage.actions).await?;
            self.emit_event(EngineEvent::StageApplied {
                zone: zone.clone(),
                depth: stage.depth,
                outcome,
            });
            total = total.merge(outcome);
        }
        Ok(total)
    }

    /// Emit an engine event
    ///
    /// # Parameters
    ///
    /// - `event`: The event to emit
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Receiver dropped: the embedder does not want events
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Attach the zone to a listing error unless the provider already did
fn wrap_list(zone: &Domain, e: Error) -> Error {
    match e {
        Error::ProviderList { .. } => e,
        other => Error::provider_list(zone.as_str(), other),
    }
}

/// Attach the zone to an apply error unless the provider already did
fn wrap_apply(zone: &Domain, e: Error) -> Error {
    match e {
        Error::ProviderApply { .. } => e,
        other => Error::provider_apply(zone.as_str(), other),
    }
}
