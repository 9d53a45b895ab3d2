//!
//! rollcall roster store
//! ---------------------
//! File-backed membership records kept as one JSON snapshot (`roster.json`
//! under the data root). State lives in memory behind a `parking_lot::RwLock`;
//! every mutation is applied to a staged copy, written through a temp file and
//! rename, and only then swapped into memory, so a failed write leaves the
//! in-memory state matching the snapshot on disk.
//!
//! The store also implements `identity::CredentialStore`, the narrow typed
//! interface the authenticator uses for login lookups and the live group
//! re-check on group-scoped requests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identity::CredentialStore;
use crate::roster::types::{GroupId, GroupRecord, LeaderRecord, MemberId, Requirement, ScoutRecord};

const SNAPSHOT_FILE: &str = "roster.json";

/// Backend failure while reading or writing the snapshot. "No match" is never
/// a `StoreError`; lookups report that as `Ok(None)` or `RosterError::NotFound`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("roster io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("roster snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Record-level outcome of a roster operation.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("no matching record")]
    NotFound,
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("group name is already taken")]
    DuplicateGroupName,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct RosterData {
    next_scout_id: i64,
    next_leader_id: i64,
    next_group_id: i64,
    scouts: BTreeMap<i64, ScoutRecord>,
    leaders: BTreeMap<i64, LeaderRecord>,
    groups: BTreeMap<i64, GroupRecord>,
}

fn email_in_use(data: &RosterData, email: &str, skip_scout: Option<i64>, skip_leader: Option<i64>) -> bool {
    data.scouts.values().any(|s| s.email == email && Some(s.id.0) != skip_scout)
        || data.leaders.values().any(|l| l.email == email && Some(l.id.0) != skip_leader)
}

fn group_id_by_name(data: &RosterData, name: &str) -> Option<GroupId> {
    data.groups.values().find(|g| g.name == name).map(|g| g.id)
}

/// Membership records for scouts, leaders and groups.
///
/// Email uniqueness is enforced across scouts and leaders together. Scout and
/// leader ids are assigned from independent counters, starting at 1.
pub struct RosterStore {
    path: PathBuf,
    inner: RwLock<RosterData>,
}

impl RosterStore {
    /// Open the roster under the given data root, creating the root and an
    /// empty roster on first use.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let path = root.join(SNAPSHOT_FILE);
        let data = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str(&text)?
        } else {
            RosterData::default()
        };
        debug!(target: "rollcall::roster", "opened roster at '{}'", path.display());
        Ok(Self { path, inner: RwLock::new(data) })
    }

    fn persist(&self, data: &RosterData) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(data)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Write the staged state to disk, then make it current. If the write
    /// fails the old state stays in place and the staged change is dropped.
    fn commit(&self, current: &mut RosterData, staged: RosterData) -> Result<(), StoreError> {
        self.persist(&staged)?;
        *current = staged;
        Ok(())
    }

    // --- scouts ---

    pub fn add_scout(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        age: u8,
        rank: Option<&str>,
        group_name: &str,
    ) -> Result<MemberId, RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        if email_in_use(&staged, email, None, None) {
            return Err(RosterError::DuplicateEmail);
        }
        let group_id = group_id_by_name(&staged, group_name).ok_or(RosterError::NotFound)?;
        staged.next_scout_id += 1;
        let id = MemberId(staged.next_scout_id);
        staged.scouts.insert(
            id.0,
            ScoutRecord {
                id,
                name: name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                age,
                rank: rank.map(str::to_string),
                group_id,
                badges: Vec::new(),
                requirements: Vec::new(),
            },
        );
        self.commit(&mut data, staged)?;
        debug!(target: "rollcall::roster", "added scout {}", id);
        Ok(id)
    }

    pub fn scout(&self, id: MemberId) -> Result<ScoutRecord, RosterError> {
        self.inner.read().scouts.get(&id.0).cloned().ok_or(RosterError::NotFound)
    }

    pub fn update_scout_name(&self, id: MemberId, name: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        let scout = staged.scouts.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        scout.name = name.to_string();
        self.commit(&mut data, staged)?;
        Ok(())
    }

    pub fn update_scout_email(&self, id: MemberId, email: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        if email_in_use(&staged, email, Some(id.0), None) {
            return Err(RosterError::DuplicateEmail);
        }
        let scout = staged.scouts.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        scout.email = email.to_string();
        self.commit(&mut data, staged)?;
        Ok(())
    }

    pub fn update_scout_password_hash(&self, id: MemberId, password_hash: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        let scout = staged.scouts.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        scout.password_hash = password_hash.to_string();
        self.commit(&mut data, staged)?;
        Ok(())
    }

    pub fn update_scout_age(&self, id: MemberId, age: u8) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        let scout = staged.scouts.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        scout.age = age;
        self.commit(&mut data, staged)?;
        Ok(())
    }

    pub fn update_scout_rank(&self, id: MemberId, rank: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        let scout = staged.scouts.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        scout.rank = Some(rank.to_string());
        self.commit(&mut data, staged)?;
        Ok(())
    }

    /// Reassign a scout to the group with the given name.
    pub fn update_scout_group(&self, id: MemberId, group_name: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        let group_id = group_id_by_name(&staged, group_name).ok_or(RosterError::NotFound)?;
        let scout = staged.scouts.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        scout.group_id = group_id;
        self.commit(&mut data, staged)?;
        Ok(())
    }

    /// Delete a scout. Badges and requirements live on the record, so they
    /// go with it.
    pub fn delete_scout(&self, id: MemberId) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        if staged.scouts.remove(&id.0).is_none() {
            return Err(RosterError::NotFound);
        }
        self.commit(&mut data, staged)?;
        debug!(target: "rollcall::roster", "deleted scout {}", id);
        Ok(())
    }

    // --- scout badges and requirements ---

    /// Names of the merit badges the scout holds.
    pub fn scout_badges(&self, id: MemberId) -> Result<Vec<String>, RosterError> {
        Ok(self.scout(id)?.badges)
    }

    /// Award a merit badge. Awarding a badge the scout already holds is a
    /// no-op.
    pub fn add_scout_badge(&self, id: MemberId, badge: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        let scout = staged.scouts.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        if scout.badges.iter().any(|b| b == badge) {
            return Ok(());
        }
        scout.badges.push(badge.to_string());
        self.commit(&mut data, staged)?;
        Ok(())
    }

    pub fn remove_scout_badge(&self, id: MemberId, badge: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        let scout = staged.scouts.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        let before = scout.badges.len();
        scout.badges.retain(|b| b != badge);
        if scout.badges.len() == before {
            return Err(RosterError::NotFound);
        }
        self.commit(&mut data, staged)?;
        Ok(())
    }

    /// The scout's partially completed requirements, each scoped to a rank.
    pub fn scout_requirements(&self, id: MemberId) -> Result<Vec<Requirement>, RosterError> {
        Ok(self.scout(id)?.requirements)
    }

    /// Record a partial requirement. The (name, rank) pair is the identity;
    /// recording it twice is a no-op.
    pub fn add_scout_requirement(&self, id: MemberId, name: &str, rank: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        let scout = staged.scouts.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        if scout.requirements.iter().any(|r| r.name == name && r.rank == rank) {
            return Ok(());
        }
        scout.requirements.push(Requirement { name: name.to_string(), rank: rank.to_string() });
        self.commit(&mut data, staged)?;
        Ok(())
    }

    pub fn remove_scout_requirement(&self, id: MemberId, name: &str, rank: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        let scout = staged.scouts.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        let before = scout.requirements.len();
        scout.requirements.retain(|r| !(r.name == name && r.rank == rank));
        if scout.requirements.len() == before {
            return Err(RosterError::NotFound);
        }
        self.commit(&mut data, staged)?;
        Ok(())
    }

    // --- leaders ---

    pub fn add_leader(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        group_name: &str,
    ) -> Result<MemberId, RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        if email_in_use(&staged, email, None, None) {
            return Err(RosterError::DuplicateEmail);
        }
        let group_id = group_id_by_name(&staged, group_name).ok_or(RosterError::NotFound)?;
        staged.next_leader_id += 1;
        let id = MemberId(staged.next_leader_id);
        staged.leaders.insert(
            id.0,
            LeaderRecord {
                id,
                name: name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                group_id,
            },
        );
        self.commit(&mut data, staged)?;
        debug!(target: "rollcall::roster", "added leader {}", id);
        Ok(id)
    }

    pub fn leader(&self, id: MemberId) -> Result<LeaderRecord, RosterError> {
        self.inner.read().leaders.get(&id.0).cloned().ok_or(RosterError::NotFound)
    }

    pub fn update_leader_name(&self, id: MemberId, name: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        let leader = staged.leaders.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        leader.name = name.to_string();
        self.commit(&mut data, staged)?;
        Ok(())
    }

    pub fn update_leader_email(&self, id: MemberId, email: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        if email_in_use(&staged, email, None, Some(id.0)) {
            return Err(RosterError::DuplicateEmail);
        }
        let leader = staged.leaders.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        leader.email = email.to_string();
        self.commit(&mut data, staged)?;
        Ok(())
    }

    pub fn update_leader_password_hash(&self, id: MemberId, password_hash: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        let leader = staged.leaders.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        leader.password_hash = password_hash.to_string();
        self.commit(&mut data, staged)?;
        Ok(())
    }

    /// Reassign a leader to the group with the given name.
    pub fn update_leader_group(&self, id: MemberId, group_name: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        let group_id = group_id_by_name(&staged, group_name).ok_or(RosterError::NotFound)?;
        let leader = staged.leaders.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        leader.group_id = group_id;
        self.commit(&mut data, staged)?;
        Ok(())
    }

    pub fn delete_leader(&self, id: MemberId) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        if staged.leaders.remove(&id.0).is_none() {
            return Err(RosterError::NotFound);
        }
        self.commit(&mut data, staged)?;
        debug!(target: "rollcall::roster", "deleted leader {}", id);
        Ok(())
    }

    // --- groups ---

    pub fn add_group(&self, name: &str) -> Result<GroupId, RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        if group_id_by_name(&staged, name).is_some() {
            return Err(RosterError::DuplicateGroupName);
        }
        staged.next_group_id += 1;
        let id = GroupId(staged.next_group_id);
        staged.groups.insert(id.0, GroupRecord { id, name: name.to_string() });
        self.commit(&mut data, staged)?;
        debug!(target: "rollcall::roster", "added group {}", id);
        Ok(id)
    }

    pub fn group(&self, id: GroupId) -> Result<GroupRecord, RosterError> {
        self.inner.read().groups.get(&id.0).cloned().ok_or(RosterError::NotFound)
    }

    pub fn update_group_name(&self, id: GroupId, name: &str) -> Result<(), RosterError> {
        let mut data = self.inner.write();
        let mut staged = data.clone();
        if staged.groups.values().any(|g| g.name == name && g.id != id) {
            return Err(RosterError::DuplicateGroupName);
        }
        let group = staged.groups.get_mut(&id.0).ok_or(RosterError::NotFound)?;
        group.name = name.to_string();
        self.commit(&mut data, staged)?;
        Ok(())
    }

    /// Ids of every scout currently assigned to the group.
    pub fn group_scouts(&self, id: GroupId) -> Result<Vec<MemberId>, RosterError> {
        let data = self.inner.read();
        if !data.groups.contains_key(&id.0) {
            return Err(RosterError::NotFound);
        }
        Ok(data.scouts.values().filter(|s| s.group_id == id).map(|s| s.id).collect())
    }

    /// Ids of every leader currently assigned to the group.
    pub fn group_leaders(&self, id: GroupId) -> Result<Vec<MemberId>, RosterError> {
        let data = self.inner.read();
        if !data.groups.contains_key(&id.0) {
            return Err(RosterError::NotFound);
        }
        Ok(data.leaders.values().filter(|l| l.group_id == id).map(|l| l.id).collect())
    }
}

impl CredentialStore for RosterStore {
    fn scout_by_credentials(&self, email: &str, password_hash: &str) -> Result<Option<MemberId>, StoreError> {
        let data = self.inner.read();
        Ok(data
            .scouts
            .values()
            .find(|s| s.email == email && s.password_hash == password_hash)
            .map(|s| s.id))
    }

    fn leader_by_credentials(&self, email: &str, password_hash: &str) -> Result<Option<MemberId>, StoreError> {
        let data = self.inner.read();
        Ok(data
            .leaders
            .values()
            .find(|l| l.email == email && l.password_hash == password_hash)
            .map(|l| l.id))
    }

    fn scout_group(&self, id: MemberId) -> Result<Option<GroupId>, StoreError> {
        Ok(self.inner.read().scouts.get(&id.0).map(|s| s.group_id))
    }

    fn leader_group(&self, id: MemberId) -> Result<Option<GroupId>, StoreError> {
        Ok(self.inner.read().leaders.get(&id.0).map(|l| l.group_id))
    }
}
