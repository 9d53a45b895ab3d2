//! Token-based identity: the role model, the token codec and the
//! authenticator that fronts every protected route.
//! Keep the public surface thin and split implementation across sub-modules.

mod authenticator;
mod role;
mod token;

pub use authenticator::{AuthError, Authenticator, CredentialStore};
pub use role::Role;
pub use token::{Claims, TokenCodec, TokenError, DEFAULT_TOKEN_LIFESPAN_DAYS, ISSUER};
