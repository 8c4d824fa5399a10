pub mod error;
pub mod key;
pub mod types;

pub use error::{MirrorError, Result};
pub use key::EntityKey;
pub use types::{EntityKind, lookup_path};
