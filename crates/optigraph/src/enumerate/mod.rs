//! Topology enumerator: templates, completion and per-template best search.
//!
//! Work is split in two granularities. `enumerate_templates` fixes only the
//! first few circuit input ports, which dominate the branching factor, and
//! yields cheap units for the scheduler. `for_each_completion` backtracks over
//! the remaining nodes of one template. `search_best` runs the full pipeline
//! (sift, kind permutations, tuning) on every completion.
//!
//! Files
//! - `template.rs`: `Template` and shallow template generation.
//! - `completion.rs`: forward-only backtracking completion.
//! - `search.rs`: `SearchCfg`, `SearchContext`, `search_best`.

mod completion;
mod search;
mod template;

pub use completion::for_each_completion;
pub use search::{search_best, SearchCfg, SearchContext};
pub use template::{depth_for, enumerate_templates, template_count, Template};

pub(crate) use search::tune_kinds;
