use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a scout or leader record. Scout and leader id spaces are
/// independent; a role always travels alongside the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub i64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a group record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub i64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A partially completed rank requirement held by a scout. Requirements are
/// scoped to a rank, so the same requirement name can recur across ranks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub rank: String,
}

/// A scout membership record. `password_hash` is the opaque pre-hashed
/// credential presented at login; plaintext never reaches this service.
/// Badges and requirements live on the record, so deleting the scout
/// removes them with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutRecord {
    pub id: MemberId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: u8,
    pub rank: Option<String>,
    pub group_id: GroupId,
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

/// A leader membership record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderRecord {
    pub id: MemberId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub group_id: GroupId,
}

/// A group record. Group names are unique so records can reference groups
/// by name over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub name: String,
}
