// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Namespace for the Conduit collaborator: transport seam and typed method wrappers
// role: conduit/namespace
// outputs: ConduitApi trait, backend construction, typed results for search/transactions/projects
// invariants: All tracker I/O goes through ConduitApi so tests can substitute fixtures
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod api;
pub mod methods;

pub use api::{ConduitApi, build_api};
