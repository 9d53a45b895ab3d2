use std::fmt;

/// The two principal kinds the service distinguishes. The role travels inside
/// the signed token payload; its wire value (0 or 1) is confined to the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Scout,
    Leader,
}

impl Role {
    /// Value carried in the token's `typ` claim.
    pub const fn claim_value(self) -> u8 {
        match self {
            Role::Scout => 0,
            Role::Leader => 1,
        }
    }

    pub fn from_claim(value: u8) -> Option<Role> {
        match value {
            0 => Some(Role::Scout),
            1 => Some(Role::Leader),
            _ => None,
        }
    }

    /// Parse the role names accepted on the login route.
    pub fn parse(s: &str) -> Option<Role> {
        match s.to_ascii_lowercase().as_str() {
            "scout" => Some(Role::Scout),
            "leader" => Some(Role::Leader),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Scout => "scout",
            Role::Leader => "leader",
        })
    }
}
