//! Core business logic - framework-agnostic engine operations.
//!
//! Each module owns one component of the engine; all multi-step transitions
//! run inside a single database transaction, and every time-dependent
//! operation takes `now` as an argument so behavior is testable with fixed
//! dates.

/// Arrears and streak projections
pub mod analytics;
/// Audit and notification boundaries (external collaborators)
pub mod audit;
/// Contribution settlement
pub mod contribution;
/// Late-fee and grace-period assessment
pub mod fees;
/// Group lifecycle transitions
pub mod group;
/// Membership lifecycle and turn assignment
pub mod membership;
/// Payout slots and the payout approval workflow
pub mod payout;
/// Contribution schedule generation and sweeps
pub mod schedule;
/// Wallet ledger and two-phase withdrawals
pub mod wallet;
