//! # Lattice Authorization Policy Engine
//!
//! Versioned policy storage, staged-batch apply with optimistic concurrency,
//! access decision evaluation, and the access-request workflow shared by all
//! business modules of the platform.
//!
//! # Architecture
//!
//! ```text
//! Request → Evaluator ── reads ──→ PolicyStore (immutable revision ledger)
//!              │                        ↑
//!              │ deny                   │ commit-if-current
//!              ↓                        │
//!     DenialDiagnostics        ApplyCoordinator ←── StagingWorkspace
//!              │                        │
//!              ↓                        ↓
//!      AccessRequest store         AuditEntry log
//! ```
//!
//! Reads (`rules_at`, `decide`) operate on immutable snapshots and run fully
//! in parallel; `commit_if_current` is the only mutating operation and is
//! serialized against other commits without blocking readers of already
//! committed revisions.

pub mod apply;
pub mod audit;
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod policy;
pub mod requests;
pub mod staging;
pub mod types;

pub use apply::{ApplyCoordinator, ApplyOutcome, ApplyRequest};
pub use audit::AuditEntry;
pub use diagnostics::{DenialDiagnostics, ForbiddenPayload, MissingPolicy, PolicySuggestion};
pub use error::{AuthzError, Result};
pub use evaluator::{AllowContext, Decision, Evaluator, Inspection};
pub use metrics::{EngineMetrics, MetricsCollector};
pub use policy::{InMemoryPolicyStore, PolicyStore, RuleSet, Snapshot};
pub use requests::{
    AccessRequest, AccessRequestFilter, AccessRequestStatus, AccessRequestStore,
    InMemoryAccessRequestStore,
};
pub use staging::StagingWorkspace;
pub use types::{Change, Effect, PolicyRule, RevisionId, RuleKind, StageKind};

/// Crate version, exposed by the server health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
