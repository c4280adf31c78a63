//! FaultInjector - Seeded Fault Injection
//!
//! TigerStyle: Storage operations ask the injector before touching state, so
//! a seed fixes exactly which calls fail.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use super::rng::DeterministicRng;
use crate::constants::DST_FAULT_PROBABILITY_MAX;

/// Storage faults the in-memory backend can simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultType {
    /// Write operation fails
    StorageWriteFail,
    /// Read operation fails
    StorageReadFail,
    /// Delete/clean operation fails
    StorageDeleteFail,
}

impl FaultType {
    /// Stable name used in error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StorageWriteFail => "storage_write_fail",
            Self::StorageReadFail => "storage_read_fail",
            Self::StorageDeleteFail => "storage_delete_fail",
        }
    }
}

impl fmt::Display for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fault rule: what to inject, how often, and for which operations.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// The fault to report
    pub fault_type: FaultType,
    /// Chance per matching call, in [0, 1]
    pub probability: f64,
    /// Substring an operation name must contain (None = every operation)
    pub operation_filter: Option<String>,
    /// Cap on injections by this rule (None = unlimited)
    pub max_injections: Option<u64>,
}

impl FaultConfig {
    /// Create a rule that fires with `probability` on every operation.
    ///
    /// # Panics
    /// Panics if probability is not in [0, 1].
    #[must_use]
    pub fn new(fault_type: FaultType, probability: f64) -> Self {
        // Precondition
        assert!(
            (0.0..=DST_FAULT_PROBABILITY_MAX).contains(&probability),
            "probability must be in [0, {DST_FAULT_PROBABILITY_MAX}], got {probability}"
        );

        Self {
            fault_type,
            probability,
            operation_filter: None,
            max_injections: None,
        }
    }

    /// Only fire for operations whose name contains `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.operation_filter = Some(filter.into());
        self
    }

    /// Stop firing after `max` injections.
    ///
    /// # Panics
    /// Panics if `max` is zero.
    #[must_use]
    pub fn with_max_injections(mut self, max: u64) -> Self {
        // Precondition
        assert!(max > 0, "max_injections must be positive");
        self.max_injections = Some(max);
        self
    }

    fn applies_to(&self, operation: &str) -> bool {
        self.operation_filter
            .as_deref()
            .map_or(true, |filter| operation.contains(filter))
    }

    fn exhausted(&self, fired: u64) -> bool {
        self.max_injections.is_some_and(|max| fired >= max)
    }
}

/// RNG and per-rule counters, locked together so one decision sees one state.
#[derive(Debug)]
struct InjectorState {
    rng: DeterministicRng,
    fired: Vec<u64>,
}

/// Decides, per storage call, whether to fail it.
///
/// Shared via `Arc` between a test and the backends under test.
#[derive(Debug)]
pub struct FaultInjector {
    rules: Vec<FaultConfig>,
    state: Mutex<InjectorState>,
}

impl FaultInjector {
    /// Create an injector with no rules.
    #[must_use]
    pub fn new(rng: DeterministicRng) -> Self {
        Self {
            rules: Vec::new(),
            state: Mutex::new(InjectorState {
                rng,
                fired: Vec::new(),
            }),
        }
    }

    /// Add a rule. Rules are consulted in registration order.
    pub fn register(&mut self, rule: FaultConfig) {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .fired
            .push(0);
        self.rules.push(rule);
    }

    /// The fault to report for `operation`, if any.
    ///
    /// The first rule that applies, is not exhausted and wins its roll fires.
    pub fn should_inject(&self, operation: &str) -> Option<FaultType> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let InjectorState { rng, fired } = &mut *state;

        for (rule, fired) in self.rules.iter().zip(fired.iter_mut()) {
            if !rule.applies_to(operation) || rule.exhausted(*fired) {
                continue;
            }
            if rng.next_bool(rule.probability) {
                *fired += 1;
                return Some(rule.fault_type);
            }
        }

        None
    }

    /// Faults injected so far across all rules.
    #[must_use]
    pub fn total_injections(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fired
            .iter()
            .sum()
    }
}

/// Builder for `FaultInjector`, so rules are fixed before it is shared.
pub struct FaultInjectorBuilder {
    injector: FaultInjector,
}

impl FaultInjectorBuilder {
    /// Start a builder with the given RNG.
    #[must_use]
    pub fn new(rng: DeterministicRng) -> Self {
        Self {
            injector: FaultInjector::new(rng),
        }
    }

    /// Add a rule.
    #[must_use]
    pub fn with_fault(mut self, rule: FaultConfig) -> Self {
        self.injector.register(rule);
        self
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> FaultInjector {
        self.injector
    }
}
