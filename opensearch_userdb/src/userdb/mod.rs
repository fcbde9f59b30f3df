mod config;
mod email_lock;
mod errors;
mod store;
mod types;

pub use config::UserStoreConfig;
pub use errors::UserError;
pub use store::UserStore;
pub use types::{OAuthAccount, User, UserDatabase};
