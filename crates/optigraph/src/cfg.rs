//! Fixed defaults for the search (internal).
//!
//! Policy
//! - Defaults are constants; callers override through `OptCfg` / `SearchCfg`
//!   rather than by editing these.

use std::time::Duration;

/// Initial value of every element parameter before optimization.
pub const DEFAULT_PARAM: f64 = 0.5;
/// Absolute tolerance on parameter movement for the local refinement.
pub const DEFAULT_XTOL: f64 = 1e-2;
/// Wall-clock budget of one optimization attempt.
pub const DEFAULT_MAX_TIME: Duration = Duration::from_millis(10);
/// Number of circuit input ports fixed per distributed template.
pub const DEFAULT_TEMPLATE_DEPTH: usize = 3;
/// Sifter aims for at least this many templates per thread.
pub const TEMPLATES_PER_THREAD: u128 = 10;
/// Deviation of a topology that cannot realize the logical pattern.
pub const MAX_DEVIATION: f64 = f64::MAX;
