//! Auth-domain identifiers, scope lists, state tokens, attempts, and credential records.

pub mod attempt;
pub mod credential;
pub mod id;
pub mod pkce;
pub mod scope;
pub mod state;

pub use attempt::*;
pub use credential::*;
pub use id::*;
pub use pkce::*;
pub use scope::*;
pub use state::*;
