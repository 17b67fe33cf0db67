//! rebate-planner: greedy card portfolio allocator and CSV importers for spend profiles and ledgers

pub mod allocator;
pub mod ledger_csv;
pub mod spend_profile;

pub use allocator::{Allocation, Allocator, CardAssignment, Constraints, allocate};
pub use ledger_csv::parse_ledger_csv;
pub use spend_profile::{CategorySpend, SpendProfile, parse_spend_arg, parse_spend_csv};
