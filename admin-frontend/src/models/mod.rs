pub mod credentials;
pub mod role;
pub mod session;

pub use credentials::Credentials;
pub use role::Role;
pub use session::{LoginOutcome, StoredSession};
