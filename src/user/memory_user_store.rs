use super::secret_code::{
    SecretCodeGenerator, TimestampRandomByteGenerator, MAX_SECRET_CODE_ATTEMPTS,
};
use super::user_models::{NewPlaylist, NewSong, NewUser, Playlist, Song, User};
use super::user_store::{UserStore, UserStoreError, UserStoreResult};
use anyhow::anyhow;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// A user plus the counters its nested ids are drawn from.
struct UserRecord {
    user: User,
    last_playlist_id: u64,
    last_song_ids: HashMap<String, u64>,
}

impl UserRecord {
    fn push_playlist(&mut self, new_playlist: NewPlaylist) -> Playlist {
        self.last_playlist_id += 1;
        let playlist_id = self.last_playlist_id.to_string();

        let mut last_song_id = 0;
        let songs = new_playlist
            .songs
            .into_iter()
            .map(|new_song| {
                last_song_id += 1;
                new_song.with_id(last_song_id)
            })
            .collect();
        self.last_song_ids.insert(playlist_id.clone(), last_song_id);

        let playlist = Playlist {
            id: playlist_id,
            name: new_playlist.name,
            songs,
        };
        self.user.playlists.push(playlist.clone());
        playlist
    }

    fn push_song(&mut self, playlist_id: &str, new_song: NewSong) -> UserStoreResult<Playlist> {
        let playlist = self
            .user
            .find_playlist_mut(playlist_id)
            .ok_or(UserStoreError::PlaylistNotFound)?;
        let last_song_id = self
            .last_song_ids
            .entry(playlist_id.to_string())
            .or_insert(0);
        *last_song_id += 1;
        playlist.songs.push(new_song.with_id(*last_song_id));
        Ok(playlist.clone())
    }
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<u64, UserRecord>,
    last_user_id: u64,
}

impl MemoryState {
    fn find_by_secret_code(&self, secret_code: &str) -> UserStoreResult<&UserRecord> {
        self.users
            .values()
            .find(|record| record.user.secret_code == secret_code)
            .ok_or(UserStoreError::UserNotFound)
    }

    fn find_by_secret_code_mut(&mut self, secret_code: &str) -> UserStoreResult<&mut UserRecord> {
        self.users
            .values_mut()
            .find(|record| record.user.secret_code == secret_code)
            .ok_or(UserStoreError::UserNotFound)
    }

    fn find_playlist(&self, secret_code: &str, playlist_id: &str) -> UserStoreResult<&Playlist> {
        self.find_by_secret_code(secret_code)?
            .user
            .find_playlist(playlist_id)
            .ok_or(UserStoreError::PlaylistNotFound)
    }
}

/// Keeps every user in a single map behind one mutex.
pub struct InMemoryUserStore {
    state: Mutex<MemoryState>,
    secret_codes: Box<dyn SecretCodeGenerator>,
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new(Box::new(TimestampRandomByteGenerator))
    }
}

impl InMemoryUserStore {
    pub fn new(secret_codes: Box<dyn SecretCodeGenerator>) -> Self {
        InMemoryUserStore {
            state: Mutex::new(MemoryState::default()),
            secret_codes,
        }
    }

    fn lock(&self) -> UserStoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| UserStoreError::Storage(anyhow!("In-memory user store lock poisoned")))
    }

    fn unused_secret_code(&self, state: &MemoryState) -> UserStoreResult<String> {
        for _ in 0..MAX_SECRET_CODE_ATTEMPTS {
            let code = self.secret_codes.generate()?;
            if state.find_by_secret_code(&code).is_err() {
                return Ok(code);
            }
            debug!("Secret code {} already issued, generating another one", code);
        }
        Err(UserStoreError::Storage(anyhow!(
            "Could not generate an unused secret code after {} attempts",
            MAX_SECRET_CODE_ATTEMPTS
        )))
    }
}

impl UserStore for InMemoryUserStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn register_user(&self, new_user: NewUser) -> UserStoreResult<User> {
        let mut state = self.lock()?;
        if state
            .users
            .values()
            .any(|record| record.user.email == new_user.email)
        {
            return Err(UserStoreError::EmailAlreadyRegistered);
        }

        let secret_code = self.unused_secret_code(&state)?;
        state.last_user_id += 1;
        let user = User {
            id: state.last_user_id.to_string(),
            secret_code,
            name: new_user.name,
            email: new_user.email,
            playlists: vec![],
        };
        let user_id = state.last_user_id;
        state.users.insert(
            user_id,
            UserRecord {
                user: user.clone(),
                last_playlist_id: 0,
                last_song_ids: HashMap::new(),
            },
        );
        Ok(user)
    }

    fn login(&self, secret_code: &str) -> UserStoreResult<()> {
        self.lock()?.find_by_secret_code(secret_code).map(|_| ())
    }

    fn get_user_profile(&self, secret_code: &str) -> UserStoreResult<User> {
        Ok(self.lock()?.find_by_secret_code(secret_code)?.user.clone())
    }

    fn create_playlist(
        &self,
        secret_code: &str,
        new_playlist: NewPlaylist,
    ) -> UserStoreResult<Playlist> {
        let mut state = self.lock()?;
        let record = state.find_by_secret_code_mut(secret_code)?;
        Ok(record.push_playlist(new_playlist))
    }

    fn add_song_to_playlist(
        &self,
        secret_code: &str,
        playlist_id: &str,
        new_song: NewSong,
    ) -> UserStoreResult<Playlist> {
        let mut state = self.lock()?;
        state
            .find_by_secret_code_mut(secret_code)?
            .push_song(playlist_id, new_song)
    }

    fn get_playlist_songs(
        &self,
        secret_code: &str,
        playlist_id: &str,
    ) -> UserStoreResult<Vec<Song>> {
        Ok(self
            .lock()?
            .find_playlist(secret_code, playlist_id)?
            .songs
            .clone())
    }

    fn delete_song_from_playlist(
        &self,
        secret_code: &str,
        playlist_id: &str,
        song_id: &str,
    ) -> UserStoreResult<Song> {
        let mut state = self.lock()?;
        state
            .find_by_secret_code_mut(secret_code)?
            .user
            .find_playlist_mut(playlist_id)
            .ok_or(UserStoreError::PlaylistNotFound)?
            .remove_song(song_id)
            .ok_or(UserStoreError::SongNotFound)
    }

    fn delete_playlist(&self, secret_code: &str, playlist_id: &str) -> UserStoreResult<Playlist> {
        let mut state = self.lock()?;
        let record = state.find_by_secret_code_mut(secret_code)?;
        let playlist = record
            .user
            .remove_playlist(playlist_id)
            .ok_or(UserStoreError::PlaylistNotFound)?;
        record.last_song_ids.remove(playlist_id);
        Ok(playlist)
    }

    fn get_song(
        &self,
        secret_code: &str,
        playlist_id: &str,
        song_id: &str,
    ) -> UserStoreResult<Song> {
        self.lock()?
            .find_playlist(secret_code, playlist_id)?
            .find_song(song_id)
            .cloned()
            .ok_or(UserStoreError::SongNotFound)
    }
}
