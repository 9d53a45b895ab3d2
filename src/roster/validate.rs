//! Field limits enforced on registration and record updates. Length and range
//! checks only; no format rules beyond these.

pub const NAME_MAX: usize = 50;
pub const EMAIL_MAX: usize = 50;
pub const PASSWORD_HASH_LEN: usize = 64;
pub const GROUP_NAME_MAX: usize = 30;
pub const BADGE_NAME_MAX: usize = 50;
pub const AGE_MIN: u8 = 10;
pub const AGE_MAX: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must be 1 to 50 characters")]
    BadName,
    #[error("email must be 1 to 50 characters")]
    BadEmail,
    #[error("password hash must be exactly 64 characters")]
    BadPasswordHash,
    #[error("group name must be 1 to 30 characters")]
    BadGroupName,
    #[error("merit badge name must be 1 to 50 characters")]
    BadBadgeName,
    #[error("requirement and rank names must be 1 to 50 characters")]
    BadRequirement,
    #[error("age must be between 10 and 18")]
    AgeOutOfRange,
}

pub fn name(s: &str) -> Result<(), ValidationError> {
    if s.is_empty() || s.chars().count() > NAME_MAX {
        return Err(ValidationError::BadName);
    }
    Ok(())
}

pub fn email(s: &str) -> Result<(), ValidationError> {
    if s.is_empty() || s.chars().count() > EMAIL_MAX {
        return Err(ValidationError::BadEmail);
    }
    Ok(())
}

pub fn password_hash(s: &str) -> Result<(), ValidationError> {
    if s.chars().count() != PASSWORD_HASH_LEN {
        return Err(ValidationError::BadPasswordHash);
    }
    Ok(())
}

pub fn group_name(s: &str) -> Result<(), ValidationError> {
    if s.is_empty() || s.chars().count() > GROUP_NAME_MAX {
        return Err(ValidationError::BadGroupName);
    }
    Ok(())
}

pub fn badge_name(s: &str) -> Result<(), ValidationError> {
    if s.is_empty() || s.chars().count() > BADGE_NAME_MAX {
        return Err(ValidationError::BadBadgeName);
    }
    Ok(())
}

pub fn requirement(name: &str, rank: &str) -> Result<(), ValidationError> {
    for s in [name, rank] {
        if s.is_empty() || s.chars().count() > BADGE_NAME_MAX {
            return Err(ValidationError::BadRequirement);
        }
    }
    Ok(())
}

pub fn age(v: u8) -> Result<(), ValidationError> {
    if !(AGE_MIN..=AGE_MAX).contains(&v) {
        return Err(ValidationError::AgeOutOfRange);
    }
    Ok(())
}
