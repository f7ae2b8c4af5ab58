//! The generic discover → snapshot → apply → verify → restore engine.
//!
//! A [`MutationEngine`] is parameterised by a domain table, a store, an
//! inventory and a snapshot store. Every resource is processed independently:
//! a failure on one never stops its siblings, and operation-level success
//! means at least one resource ended up at the desired state.
use std::cell::Cell;
use std::fmt;
use std::path::PathBuf;

use crate::domains::{DesiredValues, DomainSpec, Target};
use crate::error::{ELEVATION_HINT, EngineError, StoreError};
use crate::logging::Log;
use crate::resources::{HandleResolver, Resource, ResourceInventory, Scope};
use crate::setting::Desired;
use crate::snapshot::{Captured, ScopeCapture, Snapshot, SnapshotStore};
use crate::store::ConfigStore;

/// What the caller wants done.
#[derive(Debug, Clone, Default)]
pub struct MutationRequest {
    /// Desired values, in write order.
    pub values: DesiredValues,
    /// Only touch resources whose name matches (case-insensitive).
    pub resource_filter: Option<String>,
    /// Capture current values before writing.
    pub take_snapshot: bool,
}

/// Final state of one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutcome {
    /// Values were written and verified.
    Applied,
    /// Values were already at the desired state.
    Skipped,
    /// Something went wrong; earlier writes may have persisted.
    Failed(String),
}

impl ResourceOutcome {
    /// `Applied` and `Skipped` both count as success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ResourceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Skipped => write!(f, "already configured"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Outcome for one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReport {
    /// Resource name, or `machine`.
    pub label: String,
    /// What happened.
    pub outcome: ResourceOutcome,
}

/// Aggregate result of an apply or restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationResult {
    /// Per-scope outcomes in processing order.
    pub reports: Vec<ResourceReport>,
    /// Scopes attempted.
    pub attempted: usize,
    /// Scopes that ended `Applied` or `Skipped`.
    pub succeeded: usize,
    /// Where the pre-change snapshot was written, if one was.
    pub snapshot: Option<PathBuf>,
}

impl MutationResult {
    fn record(&mut self, label: &str, outcome: ResourceOutcome) {
        self.attempted += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        }
        self.reports.push(ResourceReport {
            label: label.to_string(),
            outcome,
        });
    }

    /// At least one scope attempted and at least one succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.attempted > 0 && self.succeeded > 0
    }

    /// `"N of M succeeded"`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} of {} succeeded", self.succeeded, self.attempted)
    }
}

/// Current values of one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Resource name, or `machine`.
    pub label: String,
    /// Resolved store key; `None` when no key could be found.
    pub handle: Option<String>,
    /// Setting name and current state, in declared order.
    pub values: Vec<(&'static str, Captured)>,
}

/// A discovered resource: either resolved to a scope, or only a name.
type Resolved = Result<Scope, String>;

/// The engine for one domain.
pub struct MutationEngine<'a> {
    spec: &'static DomainSpec,
    store: &'a dyn ConfigStore,
    inventory: &'a dyn ResourceInventory,
    snapshots: &'a SnapshotStore,
    log: &'a dyn Log,
    permission_denied: Cell<bool>,
}

impl fmt::Debug for MutationEngine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationEngine")
            .field("domain", &self.spec.name)
            .field("store", &self.store.name())
            .field("snapshots", &self.snapshots.dir())
            .finish_non_exhaustive()
    }
}

impl<'a> MutationEngine<'a> {
    /// Create an engine for `spec` over the given collaborators.
    #[must_use]
    pub fn new(
        spec: &'static DomainSpec,
        store: &'a dyn ConfigStore,
        inventory: &'a dyn ResourceInventory,
        snapshots: &'a SnapshotStore,
        log: &'a dyn Log,
    ) -> Self {
        Self {
            spec,
            store,
            inventory,
            snapshots,
            log,
            permission_denied: Cell::new(false),
        }
    }

    /// Validate, snapshot, write and verify.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] before touching anything if a
    /// value is invalid, and [`EngineError::Discovery`] if resources cannot
    /// be enumerated. Per-resource failures are reported in the result.
    pub fn apply(&self, request: &MutationRequest) -> Result<MutationResult, EngineError> {
        self.permission_denied.set(false);
        let values = self.validate(&request.values)?;
        let resolved = self.scopes(request.resource_filter.as_deref())?;
        let scopes: Vec<Scope> = resolved.iter().filter_map(|r| r.clone().ok()).collect();

        let mut result = MutationResult::default();
        if request.take_snapshot && !scopes.is_empty() {
            let snapshot = self.capture(&scopes);
            match self.snapshots.save(&snapshot) {
                Ok(path) => {
                    self.log
                        .debug(&format!("snapshot saved to {}", path.display()));
                    result.snapshot = Some(path);
                }
                Err(e) => self
                    .log
                    .warn(&format!("could not save snapshot, continuing: {e}")),
            }
        }

        for entry in &resolved {
            let (label, outcome) = match entry {
                Ok(scope) => (scope.label(), self.apply_scope(scope, &values)),
                Err(name) => (
                    name.as_str(),
                    ResourceOutcome::Failed("no configuration key".to_string()),
                ),
            };
            self.report(label, &outcome);
            result.record(label, outcome);
        }

        self.finish(&result);
        Ok(result)
    }

    /// Write back the values captured by the last snapshot.
    ///
    /// Captured-absent values are deleted (already-absent counts as done),
    /// present values are written without re-validation, and unreadable ones
    /// are skipped. A missing snapshot is "nothing to restore": zero
    /// attempted, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Snapshot`] if the snapshot exists but cannot be
    /// read.
    pub fn restore(&self, resource_filter: Option<&str>) -> Result<MutationResult, EngineError> {
        self.permission_denied.set(false);
        let mut result = MutationResult::default();
        let Some(snapshot) = self.snapshots.load(self.spec.name)? else {
            self.log
                .info(&format!("no {} snapshot; nothing to restore", self.spec.name));
            return Ok(result);
        };
        self.log.debug(&format!(
            "restoring {} snapshot from {}",
            self.spec.name, snapshot.created_at
        ));

        for capture in snapshot.scopes.values() {
            if let (Some(filter), Scope::Resource { name, .. }) = (resource_filter, &capture.scope)
                && !name.eq_ignore_ascii_case(filter)
            {
                continue;
            }
            let outcome = self.restore_scope(capture);
            self.report(capture.scope.label(), &outcome);
            result.record(capture.scope.label(), outcome);
        }

        self.finish(&result);
        Ok(result)
    }

    /// Read-only report of the current values.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Discovery`] if resources cannot be enumerated.
    pub fn status(&self, resource_filter: Option<&str>) -> Result<Vec<StatusReport>, EngineError> {
        Ok(self
            .scopes(resource_filter)?
            .into_iter()
            .map(|entry| match entry {
                Ok(scope) => StatusReport {
                    label: scope.label().to_string(),
                    handle: Some(scope.key().to_string()),
                    values: self
                        .spec
                        .settings
                        .iter()
                        .map(|s| (s.name, self.read_captured(scope.key(), s.name)))
                        .collect(),
                },
                Err(name) => StatusReport {
                    label: name,
                    handle: None,
                    values: Vec::new(),
                },
            })
            .collect())
    }

    /// Record the current value of every declared setting in `scopes`.
    #[must_use]
    pub fn capture(&self, scopes: &[Scope]) -> Snapshot {
        let mut snapshot = Snapshot::new(self.spec.name);
        for scope in scopes {
            let settings = self
                .spec
                .settings
                .iter()
                .map(|s| (s.name.to_string(), self.read_captured(scope.key(), s.name)))
                .collect();
            snapshot.insert(ScopeCapture {
                scope: scope.clone(),
                settings,
            });
        }
        snapshot
    }

    fn validate(&self, values: &DesiredValues) -> Result<DesiredValues, EngineError> {
        let mut out = Vec::with_capacity(values.len());
        for (name, desired) in values {
            let spec = self.spec.setting(name).ok_or_else(|| {
                crate::error::ValidationError::UnknownSetting {
                    setting: name.clone(),
                }
            })?;
            let desired = match desired {
                Desired::Set(v) => Desired::Set(spec.validate(v)?),
                Desired::Unset => Desired::Unset,
            };
            out.push((spec.name.to_string(), desired));
        }
        Ok(out)
    }

    /// Resolve the scopes to operate on, in discovery order.
    fn scopes(&self, filter: Option<&str>) -> Result<Vec<Resolved>, EngineError> {
        let strategy = match self.spec.target {
            Target::Machine { key } => {
                return Ok(vec![Ok(Scope::Machine {
                    key: key.to_string(),
                })]);
            }
            Target::Keys(keys) => {
                let scopes: Vec<Resolved> = keys
                    .iter()
                    .filter(|(name, _)| filter.is_none_or(|f| name.eq_ignore_ascii_case(f)))
                    .map(|(name, key)| {
                        Ok(Scope::Resource {
                            name: (*name).to_string(),
                            handle: (*key).to_string(),
                        })
                    })
                    .collect();
                if scopes.is_empty()
                    && let Some(f) = filter
                {
                    self.log.warn(&format!("no {} entry named '{f}'", self.spec.name));
                }
                return Ok(scopes);
            }
            Target::PerResource(strategy) => strategy,
        };

        let resources: Vec<Resource> = self
            .inventory
            .discover()?
            .into_iter()
            .filter(|r| filter.is_none_or(|f| r.name.eq_ignore_ascii_case(f)))
            .collect();
        if resources.is_empty() {
            self.log.warn(&match filter {
                Some(f) => format!("no adapter named '{f}' found"),
                None => "no eligible adapters found".to_string(),
            });
        }

        let resolver = HandleResolver::new(self.store);
        Ok(resources
            .into_iter()
            .map(|mut resource| {
                resource.handle = resolver.resolve(&resource, strategy);
                match resource.handle {
                    Some(handle) => {
                        self.log.debug(&format!(
                            "{} ({}) -> {handle}",
                            resource.name, resource.status
                        ));
                        Ok(Scope::Resource {
                            name: resource.name,
                            handle,
                        })
                    }
                    None => Err(resource.name),
                }
            })
            .collect())
    }

    /// Current state of one value. A missing key holds no values, so it reads
    /// as absent.
    fn read_captured(&self, key: &str, name: &str) -> Captured {
        match self.store.read(key, name) {
            Ok(Some(value)) => Captured::Present { value },
            Ok(None) | Err(StoreError::NotFound { .. }) => Captured::Absent,
            Err(e) => Captured::Unreadable {
                reason: e.to_string(),
            },
        }
    }

    fn apply_scope(&self, scope: &Scope, values: &DesiredValues) -> ResourceOutcome {
        let key = scope.key();
        if values.iter().all(|(name, d)| self.is_at(key, name, d)) {
            return ResourceOutcome::Skipped;
        }

        for (name, desired) in values {
            let written = match desired {
                Desired::Set(v) => self.store.write(key, name, v),
                Desired::Unset => match self.store.delete(key, name) {
                    Err(StoreError::NotFound { .. }) => Ok(()),
                    other => other,
                },
            };
            if let Err(e) = written {
                return self.failed(&format!("{name}: {e}"), &e);
            }
            self.log
                .debug(&format!("{}: {name} <- {desired}", scope.label()));
        }

        for (name, desired) in values {
            if !self.is_at(key, name, desired) {
                let actual = match self.read_captured(key, name) {
                    Captured::Present { value } => value.to_string(),
                    Captured::Absent => "<absent>".to_string(),
                    Captured::Unreadable { reason } => reason,
                };
                return ResourceOutcome::Failed(format!(
                    "verification failed for {name}: expected {desired}, read {actual}"
                ));
            }
        }
        ResourceOutcome::Applied
    }

    fn restore_scope(&self, capture: &ScopeCapture) -> ResourceOutcome {
        let key = capture.scope.key();
        let mut names: Vec<&str> = Vec::with_capacity(capture.settings.len());
        for setting in self.spec.settings {
            names.push(setting.name);
        }
        for name in capture.settings.keys() {
            if self.spec.setting(name).is_none() {
                names.push(name);
            }
        }
        let mut changed = false;

        for name in names {
            let Some(captured) = capture.settings.get(name) else {
                continue;
            };
            let done = match captured {
                Captured::Present { value } => {
                    if self.store.read(key, name).ok().flatten().as_ref() == Some(value) {
                        continue;
                    }
                    self.store.write(key, name, value)
                }
                Captured::Absent => match self.store.delete(key, name) {
                    Err(StoreError::NotFound { .. }) => continue,
                    other => other,
                },
                Captured::Unreadable { reason } => {
                    self.log.warn(&format!(
                        "{}: {name} was unreadable when captured ({reason}); left unchanged",
                        capture.scope.label()
                    ));
                    continue;
                }
            };
            if let Err(e) = done {
                return self.failed(&format!("{name}: {e}"), &e);
            }
            changed = true;
        }

        if changed {
            ResourceOutcome::Applied
        } else {
            ResourceOutcome::Skipped
        }
    }

    fn is_at(&self, key: &str, name: &str, desired: &Desired) -> bool {
        match (desired, self.store.read(key, name)) {
            (Desired::Set(want), Ok(Some(have))) => want.matches(&have),
            (Desired::Unset, Ok(None) | Err(StoreError::NotFound { .. })) => true,
            _ => false,
        }
    }

    fn failed(&self, reason: &str, error: &StoreError) -> ResourceOutcome {
        if matches!(error, StoreError::PermissionDenied { .. }) {
            self.permission_denied.set(true);
        }
        ResourceOutcome::Failed(reason.to_string())
    }

    fn report(&self, label: &str, outcome: &ResourceOutcome) {
        let msg = format!("{label}: {outcome}");
        match outcome {
            ResourceOutcome::Failed(_) => self.log.error(&msg),
            ResourceOutcome::Applied | ResourceOutcome::Skipped => self.log.info(&msg),
        }
    }

    fn finish(&self, result: &MutationResult) {
        if self.permission_denied.get() {
            self.log.warn(&format!("permission denied: {ELEVATION_HINT}"));
        }
        self.log
            .debug(&format!("{}: {}", self.spec.name, result.summary()));
    }
}
