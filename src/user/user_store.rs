use super::user_models::{NewPlaylist, NewSong, NewUser, Playlist, Song, User};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("User not found")]
    UserNotFound,

    #[error("Playlist not found")]
    PlaylistNotFound,

    #[error("Song not found in the playlist")]
    SongNotFound,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for UserStoreError {
    fn from(err: rusqlite::Error) -> Self {
        UserStoreError::Storage(err.into())
    }
}

pub type UserStoreResult<T> = Result<T, UserStoreError>;

/// Repository of users and their nested playlists and songs.
///
/// Every method is one atomic step: implementations hold their lock from
/// the secret code lookup to the last write. Lookups by secret code fail
/// with [`UserStoreError::UserNotFound`].
pub trait UserStore: Send + Sync {
    /// Short name of the backend, shown on the stats endpoint.
    fn backend_name(&self) -> &'static str;

    /// Creates a user with a fresh id and secret code.
    /// Fails with `EmailAlreadyRegistered` if the email is taken.
    fn register_user(&self, new_user: NewUser) -> UserStoreResult<User>;

    /// Checks that the secret code belongs to a user.
    fn login(&self, secret_code: &str) -> UserStoreResult<()>;

    /// Returns the full user, playlists and songs included.
    fn get_user_profile(&self, secret_code: &str) -> UserStoreResult<User>;

    /// Appends a playlist to the user's list and returns it with its new id.
    fn create_playlist(
        &self,
        secret_code: &str,
        new_playlist: NewPlaylist,
    ) -> UserStoreResult<Playlist>;

    /// Appends a song to a playlist and returns the updated playlist.
    fn add_song_to_playlist(
        &self,
        secret_code: &str,
        playlist_id: &str,
        new_song: NewSong,
    ) -> UserStoreResult<Playlist>;

    /// Returns the songs of a playlist, in order.
    fn get_playlist_songs(&self, secret_code: &str, playlist_id: &str)
        -> UserStoreResult<Vec<Song>>;

    /// Removes a song from a playlist and returns it.
    fn delete_song_from_playlist(
        &self,
        secret_code: &str,
        playlist_id: &str,
        song_id: &str,
    ) -> UserStoreResult<Song>;

    /// Removes a playlist, with its songs, and returns it.
    fn delete_playlist(&self, secret_code: &str, playlist_id: &str) -> UserStoreResult<Playlist>;

    /// Returns a single song of a playlist.
    fn get_song(&self, secret_code: &str, playlist_id: &str, song_id: &str)
        -> UserStoreResult<Song>;
}
