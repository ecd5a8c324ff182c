pub mod cache;
pub mod collection;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod token;
pub mod transaction;

pub use cache::CacheKey;
pub use collection::{Collection, PartitionKey};
pub use error::{Error, Result};
pub use model::{BaseDocument, Model};
pub use session::Session;
pub use store::DocumentStore;
pub use token::{SessionToken, VersionTag};
pub use transaction::{Outcome, Transaction};
