pub mod archive;
pub mod error;
pub mod memory;
pub mod sqlite;

pub use archive::ChatArchive;
pub use error::StoreError;
pub use sqlite::SessionStore;
