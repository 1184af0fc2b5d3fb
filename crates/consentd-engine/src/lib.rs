//! Consentd Engine — consent record lifecycle and retention enforcement.
//!
//! `ConsentService` creates, reads, and updates consent records, appending an
//! audit entry for every auditable event. `RetentionValidator` sweeps expired
//! records (delete, then anonymize) and reports retention-policy violations.

pub mod lifecycle;
pub mod retention;

pub use lifecycle::{derive_legal_basis, ConsentRequest, ConsentService};
pub use retention::{CleanupReport, IntegrityReport, RetentionValidator};
