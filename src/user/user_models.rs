//! User, playlist and song models.
//!
//! Ids travel as JSON strings. Clients echo them back verbatim in
//! `playlist_id` / `song_id` fields.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub id: String,
    pub name: String,
    pub composers: String,
    pub music_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub songs: Vec<Song>,
}

impl Playlist {
    pub fn find_song(&self, song_id: &str) -> Option<&Song> {
        self.songs.iter().find(|song| song.id == song_id)
    }

    /// Splices the song out, keeping the order of the others.
    pub fn remove_song(&mut self, song_id: &str) -> Option<Song> {
        let position = self.songs.iter().position(|song| song.id == song_id)?;
        Some(self.songs.remove(position))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub secret_code: String,
    pub name: String,
    pub email: String,
    pub playlists: Vec<Playlist>,
}

impl User {
    pub fn find_playlist(&self, playlist_id: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == playlist_id)
    }

    pub fn find_playlist_mut(&mut self, playlist_id: &str) -> Option<&mut Playlist> {
        self.playlists.iter_mut().find(|p| p.id == playlist_id)
    }

    /// Splices the playlist out, keeping the order of the others.
    pub fn remove_playlist(&mut self, playlist_id: &str) -> Option<Playlist> {
        let position = self.playlists.iter().position(|p| p.id == playlist_id)?;
        Some(self.playlists.remove(position))
    }
}

/// Registration payload. Any id or secret code sent by the client is ignored.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct NewUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSong {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub composers: String,
    #[serde(default)]
    pub music_url: String,
}

impl NewSong {
    pub fn with_id(self, id: impl ToString) -> Song {
        Song {
            id: id.to_string(),
            name: self.name,
            composers: self.composers,
            music_url: self.music_url,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct NewPlaylist {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub songs: Vec<NewSong>,
}
