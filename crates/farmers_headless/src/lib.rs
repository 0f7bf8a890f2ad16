//! Headless sandbox for the farmers policy.
//!
//! A small deterministic engine that implements the policy's engine
//! interface, so the policy can be played end to end without a game:
//!
//! - **Smoke runs**: play a scenario and print what each team did
//! - **Batches**: many seeds in parallel, summarized as JSON
//! - **Determinism checks**: the same seed must always end in the same state
//!
//! # Example
//!
//! ```bash
//! # Play the built-in duel
//! cargo run -p farmers_headless -- run --scenario duel
//!
//! # Run 200 seeds of a scenario file
//! cargo run -p farmers_headless -- batch --scenario scenarios/duel.ron --count 200
//!
//! # Verify determinism
//! cargo run -p farmers_headless -- verify --scenario free_for_all --runs 5
//! ```

pub mod batch;
pub mod metrics;
pub mod runner;
pub mod sandbox;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, GameMetrics, TeamMetrics};
pub use runner::HeadlessRunner;
pub use sandbox::{Sandbox, SandboxWorld};
pub use scenario::{Scenario, ScenarioError};
