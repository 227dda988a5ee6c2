//! OAuth2 authorization-code lifecycle: session state, loopback callback
//! capture, token grants, persistence, and the facade tying them together.

pub mod authorize;
pub mod browser;
pub(crate) mod callback;
pub mod facade;
pub mod session;
pub mod store;
pub mod token;

pub use facade::{AuthFacade, AuthStatus};
pub use store::TokenStore;
pub use token::{HttpTokenEndpoint, TokenEndpoint, TokenRecord};
