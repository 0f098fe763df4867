//! Property-Based Testing over Deterministic Simulation
//!
//! `TigerStyle`: Random operation sequences with invariant checking after
//! every step, reproducible by seed.
//!
//! The runner owns a manual [`Clock`] and optionally advances it between
//! operations, so TTL expiry, recency decay, and eviction paths are all
//! reachable from a single seeded run.

use std::fmt::Debug;

use crate::clock::Clock;
use crate::constants::DST_OPERATIONS_COUNT_MAX;
use crate::dst::rng::DeterministicRng;

/// Trait for stores that can be property-tested.
pub trait PropertyTestable {
    /// The type of operations that can be performed.
    type Operation: Debug + Clone;

    /// Generate a random operation valid for the current state.
    fn generate_operation(&self, rng: &mut DeterministicRng) -> Self::Operation;

    /// Apply an operation to the state. May read the clock.
    fn apply_operation(&mut self, op: &Self::Operation, clock: &Clock);

    /// Check that all invariants hold.
    ///
    /// Returns `Ok(())` if all invariants pass, `Err(message)` otherwise.
    fn check_invariants(&self) -> Result<(), String>;

    /// Describe the current state for failure reports.
    fn describe_state(&self) -> String {
        String::from("(state description not implemented)")
    }
}

/// Result of a property test run.
#[derive(Debug)]
pub struct PropertyTestResult {
    /// Number of operations successfully executed
    pub operations_executed: u64,
    /// Seed used for reproduction
    pub seed: u64,
    /// Failure details, if any
    pub failure: Option<PropertyTestFailure>,
}

impl PropertyTestResult {
    /// Check if the test passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Check if the test failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    /// Unwrap the result, panicking with reproduction info if failed.
    ///
    /// # Panics
    /// Panics if the test failed.
    pub fn unwrap(self) {
        if let Some(failure) = self.failure {
            panic!(
                "Property test failed!\n\
                 Seed: {} (use this to reproduce)\n\
                 Operation #{}: {}\n\
                 Invariant violation: {}\n\
                 State: {}",
                self.seed,
                failure.operation_index,
                failure.operation,
                failure.message,
                failure.state_description
            );
        }
    }
}

/// Details of a property test failure.
#[derive(Debug)]
pub struct PropertyTestFailure {
    /// Index of the failing operation (0-based)
    pub operation_index: u64,
    /// Debug rendering of the operation that caused the failure
    pub operation: String,
    /// The invariant violation message
    pub message: String,
    /// Description of the state at failure
    pub state_description: String,
}

/// Configuration for clock advancement between operations.
#[derive(Debug, Clone)]
pub struct TimeAdvanceConfig {
    /// Minimum time to advance per operation (ms)
    pub min_ms: u64,
    /// Maximum time to advance per operation (ms)
    pub max_ms: u64,
    /// Probability of advancing time (0.0 to 1.0)
    pub probability: f64,
}

impl Default for TimeAdvanceConfig {
    fn default() -> Self {
        Self {
            min_ms: 0,
            max_ms: 1000,
            probability: 0.5,
        }
    }
}

impl TimeAdvanceConfig {
    /// No time advancement.
    #[must_use]
    pub fn none() -> Self {
        Self {
            min_ms: 0,
            max_ms: 0,
            probability: 0.0,
        }
    }

    /// Always advance by a fixed amount.
    #[must_use]
    pub fn fixed(ms: u64) -> Self {
        Self {
            min_ms: ms,
            max_ms: ms,
            probability: 1.0,
        }
    }

    /// Advance within a range, with the given probability per operation.
    ///
    /// # Panics
    /// Panics if the range or probability is invalid.
    #[must_use]
    pub fn random(min_ms: u64, max_ms: u64, probability: f64) -> Self {
        assert!((0.0..=1.0).contains(&probability));
        assert!(min_ms <= max_ms);
        Self {
            min_ms,
            max_ms,
            probability,
        }
    }
}

/// Property-based test runner.
///
/// `TigerStyle`:
/// - Deterministic via seed
/// - Explicit operation count limit
/// - Invariant checking after each operation
#[derive(Debug)]
pub struct PropertyTest {
    seed: u64,
    max_operations: u64,
    time_config: TimeAdvanceConfig,
    start_ms: u64,
}

impl PropertyTest {
    /// Create a new property test with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            max_operations: 100,
            time_config: TimeAdvanceConfig::default(),
            start_ms: 0,
        }
    }

    /// Set the maximum number of operations to run.
    ///
    /// # Panics
    /// Panics if max exceeds `DST_OPERATIONS_COUNT_MAX`.
    #[must_use]
    pub fn with_max_operations(mut self, max: u64) -> Self {
        assert!(
            max <= DST_OPERATIONS_COUNT_MAX,
            "max_operations {} exceeds DST_OPERATIONS_COUNT_MAX {}",
            max,
            DST_OPERATIONS_COUNT_MAX
        );
        self.max_operations = max;
        self
    }

    /// Configure clock advancement between operations.
    #[must_use]
    pub fn with_time_advance(mut self, config: TimeAdvanceConfig) -> Self {
        self.time_config = config;
        self
    }

    /// Set the starting clock time (ms since epoch).
    #[must_use]
    pub fn with_start_ms(mut self, start_ms: u64) -> Self {
        self.start_ms = start_ms;
        self
    }

    /// Run the property test against a state built from the runner's clock.
    ///
    /// The factory receives the manual clock so the store under test reads
    /// the same time the runner advances.
    #[must_use]
    pub fn run<T, F>(self, state_factory: F) -> PropertyTestResult
    where
        T: PropertyTestable,
        F: FnOnce(Clock) -> T,
    {
        let mut rng = DeterministicRng::new(self.seed);
        let clock = Clock::manual_at_ms(self.start_ms);
        let mut state = state_factory(clock.clone());

        // Check initial invariants
        if let Err(msg) = state.check_invariants() {
            return PropertyTestResult {
                operations_executed: 0,
                seed: self.seed,
                failure: Some(PropertyTestFailure {
                    operation_index: 0,
                    operation: "(initial state)".to_string(),
                    message: format!("Initial state violates invariants: {}", msg),
                    state_description: state.describe_state(),
                }),
            };
        }

        for i in 0..self.max_operations {
            // Maybe advance time
            if self.time_config.probability > 0.0 && rng.next_bool(self.time_config.probability) {
                let advance = if self.time_config.min_ms == self.time_config.max_ms {
                    self.time_config.min_ms
                } else {
                    rng.next_usize(
                        self.time_config.min_ms as usize,
                        self.time_config.max_ms as usize,
                    ) as u64
                };
                clock.advance_ms(advance);
            }

            // Generate and apply operation
            let op = state.generate_operation(&mut rng);
            let op_debug = format!("{:?}", op);
            state.apply_operation(&op, &clock);

            // Check invariants
            if let Err(msg) = state.check_invariants() {
                return PropertyTestResult {
                    operations_executed: i + 1,
                    seed: self.seed,
                    failure: Some(PropertyTestFailure {
                        operation_index: i,
                        operation: op_debug,
                        message: msg,
                        state_description: state.describe_state(),
                    }),
                };
            }
        }

        PropertyTestResult {
            operations_executed: self.max_operations,
            seed: self.seed,
            failure: None,
        }
    }

    /// Run the property test, panicking on failure.
    ///
    /// # Panics
    /// Panics if any invariant is violated.
    pub fn run_and_assert<T, F>(self, state_factory: F)
    where
        T: PropertyTestable,
        F: FnOnce(Clock) -> T,
    {
        self.run(state_factory).unwrap();
    }
}

/// Run the same property test under multiple seeds.
///
/// `TigerStyle`: Multi-seed testing for broader coverage.
///
/// # Panics
/// Panics if any seed fails.
pub fn run_property_tests<T, F>(seeds: &[u64], max_operations: u64, state_factory: F)
where
    T: PropertyTestable,
    F: Fn(Clock) -> T,
{
    for &seed in seeds {
        PropertyTest::new(seed)
            .with_max_operations(max_operations)
            .run_and_assert(&state_factory);
    }
}
