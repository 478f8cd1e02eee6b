mod memory_user_store;
pub mod secret_code;
mod sqlite_user_store;
pub mod user_models;
mod user_store;

pub use memory_user_store::InMemoryUserStore;
pub use secret_code::{SecretCodeGenerator, TimestampRandomByteGenerator};
pub use sqlite_user_store::SqliteUserStore;
pub use user_models::{NewPlaylist, NewSong, NewUser, Playlist, Song, User};
pub use user_store::{UserStore, UserStoreError, UserStoreResult};
