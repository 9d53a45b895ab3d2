use std::sync::Arc;

use tracing::debug;

use crate::identity::role::Role;
use crate::identity::token::TokenCodec;
use crate::roster::{GroupId, MemberId, StoreError};

/// Typed lookups the authenticator needs from the record store. One concrete
/// method per lookup; "no match" is `Ok(None)`, backend trouble is `Err`.
pub trait CredentialStore: Send + Sync {
    fn scout_by_credentials(&self, email: &str, password_hash: &str) -> Result<Option<MemberId>, StoreError>;
    fn leader_by_credentials(&self, email: &str, password_hash: &str) -> Result<Option<MemberId>, StoreError>;
    fn scout_group(&self, id: MemberId) -> Result<Option<GroupId>, StoreError>;
    fn leader_group(&self, id: MemberId) -> Result<Option<GroupId>, StoreError>;
}

/// Authentication outcome. Every rejection is the same
/// `AuthenticationFailed` value, whichever check tripped it; callers cannot
/// tell a wrong password from an unknown email, an expired token or a group
/// mismatch. Backend failures propagate separately so tooling can tell
/// "denied" from "store down".
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("could not authenticate")]
    AuthenticationFailed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates login and request authentication over the token codec and
/// the credential store. Holds no mutable state; safe to share across
/// concurrent requests.
pub struct Authenticator {
    codec: TokenCodec,
    store: Arc<dyn CredentialStore>,
}

impl Authenticator {
    pub fn new(codec: TokenCodec, store: Arc<dyn CredentialStore>) -> Self {
        Self { codec, store }
    }

    /// Exchange a credential pair for a fresh token. Exactly one store lookup
    /// in the records of `role`; no match means rejection.
    pub fn login(&self, email: &str, password_hash: &str, role: Role) -> Result<String, AuthError> {
        let found = match role {
            Role::Scout => self.store.scout_by_credentials(email, password_hash)?,
            Role::Leader => self.store.leader_by_credentials(email, password_hash)?,
        };
        let Some(id) = found else {
            debug!(target: "rollcall::auth", "login rejected for role {}", role);
            return Err(AuthError::AuthenticationFailed);
        };
        match self.codec.issue(id, role) {
            Ok(token) => Ok(token),
            Err(e) => {
                debug!(target: "rollcall::auth", "token issue failed: {}", e);
                Err(AuthError::AuthenticationFailed)
            }
        }
    }

    /// Verify a presented token for the expected role and return the subject
    /// id. An absent or empty token is a plain rejection.
    pub fn authenticate_as(&self, role: Role, token: Option<&str>) -> Result<MemberId, AuthError> {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthError::AuthenticationFailed),
        };
        match self.codec.verify(token, role) {
            Ok(id) => Ok(id),
            Err(e) => {
                debug!(target: "rollcall::auth", "token rejected: {}", e);
                Err(AuthError::AuthenticationFailed)
            }
        }
    }

    /// Authenticate a leader token, then re-read the leader's current group
    /// from the store and require it to match `group`. The membership check is
    /// always live; a leader deleted or reassigned after issuance is rejected
    /// here even though the token itself still verifies.
    pub fn authenticate_group_leader(&self, token: Option<&str>, group: GroupId) -> Result<MemberId, AuthError> {
        let id = self.authenticate_as(Role::Leader, token)?;
        match self.store.leader_group(id)? {
            Some(current) if current == group => Ok(id),
            Some(current) => {
                debug!(target: "rollcall::auth", "leader {} not in group {} (currently {})", id, group, current);
                Err(AuthError::AuthenticationFailed)
            }
            None => {
                debug!(target: "rollcall::auth", "leader {} no longer on record", id);
                Err(AuthError::AuthenticationFailed)
            }
        }
    }
}
