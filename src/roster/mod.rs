//! Membership records for the roster service: scouts, leaders and groups.
//! Keep the public surface thin and split implementation across sub-modules.

mod store;
mod types;
pub mod validate;

pub use store::{RosterError, RosterStore, StoreError};
pub use types::{GroupId, GroupRecord, LeaderRecord, MemberId, Requirement, ScoutRecord};
