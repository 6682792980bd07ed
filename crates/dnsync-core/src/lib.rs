// # dnsync-core
//
// Reconciliation engine for DNS records declared as files in a git repository.
//
// ## Architecture Overview
//
// A run is a pipeline with explicit data handed between stages:
//
// - **HistorySource**: reads declaration files at both ends of a revision range
// - **Classifier**: turns two snapshots into Added/Modified/Removed/Unchanged keys
// - **Validator**: enforces CNAME and NS coexistence rules over the target snapshot
// - **RemoteIndex**: resolves identity keys to provider records, one key at a time
// - **Plan builder**: emits the minimal ordered list of create/update/delete ops
// - **Executor**: applies ops with per-op failure isolation
// - **SyncEngine**: wires the stages together and produces a report
//
// ## Design Principles
//
// 1. **Ownership**: only records present in the declared history are ever touched
// 2. **Idempotency**: re-running a range converges to an empty plan
// 3. **Fail early**: validation and lookups finish before the first mutation
// 4. **Plugin-Based**: stores and history sources come from a registry
// 5. **Library-First**: each stage is callable and testable on its own

pub mod classify;
pub mod config;
pub mod declaration;
pub mod engine;
pub mod error;
pub mod executor;
pub mod index;
pub mod plan;
pub mod record;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod traits;
pub mod validate;

// Re-export core types for convenience
pub use classify::{Classification, ClassificationCounts, ClassificationKind, classify};
pub use config::{EngineConfig, HistoryConfig, ProviderConfig, SyncConfig};
pub use declaration::{DeclarationFile, is_declaration_path, parse_all, parse_declaration};
pub use engine::{PlannedSync, SyncEngine, SyncReport};
pub use error::{ConstraintViolation, Error, MalformedDeclaration, Result};
pub use executor::{Executor, FailedOp, PlanResult};
pub use index::RemoteIndex;
pub use plan::{ChangeOp, Plan, build_plan};
pub use record::{DEFAULT_TTL, DeclaredRecord, IdentityKey, RecordType, RemoteRecord};
pub use registry::Registry;
pub use snapshot::Snapshot;
pub use store::MemoryRemoteStore;
pub use traits::{HistorySource, RemoteStore};
pub use validate::validate;
