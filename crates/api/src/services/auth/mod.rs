//! Authentication building blocks.
//!
//! - [`password`]: Argon2id hashing for password accounts
//! - [`jwt`]: bearer token issuing and the [`IdentityResolver`] contract
//! - [`federated`]: Facebook and Google OAuth sign-in

mod error;
pub mod federated;
pub mod jwt;
pub mod password;

pub use error::AuthError;
pub use federated::{FederatedClient, Provider};
pub use jwt::{Claims, Identity, IdentityResolver, IssuedToken, JwtIssuer, JwtResolver};
