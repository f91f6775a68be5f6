//! # Engine Primitives
//!
//! Hardcoded constants for the evaluation engine.
//!
//! These values are compiled into the binary. The ones that callers may tune
//! at runtime are only *defaults* for [`EngineConfig`](crate::EngineConfig).

/// Magnitude below which a presented query result is reported as exactly zero.
///
/// - Results with `|p| < ZERO_THRESHOLD` become `0.0`.
/// - Applied to presentation only, never to intermediate computation.
/// - A configured threshold may be lower, never higher.
pub const ZERO_THRESHOLD: f64 = 1e-6;

/// Default upper bound on the number of nodes in an evaluated circuit.
///
/// Evaluation is linear in circuit size thanks to memoization, but memo
/// tables hold one value per signed node reference. This bound keeps a
/// malformed upstream circuit from exhausting memory.
pub const MAX_CIRCUIT_NODES: usize = 10_000_000;

/// Maximum length for names in the circuit's name tables.
///
/// Longer names are rejected by [`Circuit::add_name`](crate::Circuit::add_name).
pub const MAX_NAME_LENGTH: usize = 1024;
