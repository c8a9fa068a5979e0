// Storage exports
pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use store::{
    ConversationArchivist, FriendRequestStore, InteractionStore, NotificationSink, Storage,
    StorageError, UnitOfWork,
};
