use super::secret_code::{format_secret_code, unix_timestamp, MAX_SECRET_CODE_ATTEMPTS};
use super::user_models::{NewPlaylist, NewSong, NewUser, Playlist, Song, User};
use super::user_store::{UserStore, UserStoreError, UserStoreResult};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
};
use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// V 0
const USERS_TABLE_V_0: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            auto_increment = true
        ),
        sqlite_column!(
            "secret_code",
            &SqlType::Text,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
    ],
    indices: &[],
};
const PLAYLISTS_TABLE_V_0: Table = Table {
    name: "playlists",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            auto_increment = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "users",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Restrict,
            })
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_playlists_user_id", "user_id")],
};
const SONGS_TABLE_V_0: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            auto_increment = true
        ),
        sqlite_column!(
            "playlist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "playlists",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("composers", &SqlType::Text, non_null = true),
        sqlite_column!("music_url", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_songs_playlist_id", "playlist_id")],
};
/// Each secret code takes the next `value`; older rows are pruned.
const SECRET_CODE_SEQUENCE_TABLE_V_0: Table = Table {
    name: "secret_code_sequence",
    columns: &[sqlite_column!(
        "value",
        &SqlType::Integer,
        is_primary_key = true,
        auto_increment = true
    )],
    indices: &[],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USERS_TABLE_V_0,
        PLAYLISTS_TABLE_V_0,
        SONGS_TABLE_V_0,
        SECRET_CODE_SEQUENCE_TABLE_V_0,
    ],
}];

/// Stores users, playlists and songs in three SQLite tables.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            info!("Creating user database at {:?}", db_path.as_ref());
            let conn = Connection::open(db_path)?;
            VERSIONED_SCHEMAS
                .last()
                .context("No schema defined")?
                .create(&conn)?;
            conn
        };
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Database version {} is too old, does not contain base db version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        VERSIONED_SCHEMAS
            .get(db_version as usize)
            .with_context(|| format!("Database version {} is too new", db_version))?
            .validate(&conn)?;

        Ok(SqliteUserStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> UserStoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| UserStoreError::Storage(anyhow!("SQLite connection lock poisoned")))
    }

    fn next_secret_code(tx: &Transaction) -> UserStoreResult<String> {
        tx.execute("INSERT INTO secret_code_sequence DEFAULT VALUES", [])?;
        let value = tx.last_insert_rowid();
        tx.execute(
            "DELETE FROM secret_code_sequence WHERE value < ?1",
            params![value],
        )?;
        Ok(format_secret_code(unix_timestamp()?, value))
    }
}

fn find_user_id(conn: &Connection, secret_code: &str) -> UserStoreResult<i64> {
    conn.query_row(
        "SELECT id FROM users WHERE secret_code = ?1",
        params![secret_code],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(UserStoreError::UserNotFound)
}

/// Ids arriving from clients are strings and only the exact spelling the
/// store handed out names a row, so `"01"` and `"+1"` do not match id 1.
fn parse_id(id: &str) -> Option<i64> {
    let value: i64 = id.parse().ok()?;
    (value.to_string() == id).then_some(value)
}

fn find_playlist_row(conn: &Connection, user_id: i64, playlist_id: &str) -> UserStoreResult<i64> {
    let playlist_id = parse_id(playlist_id).ok_or(UserStoreError::PlaylistNotFound)?;
    conn.query_row(
        "SELECT id FROM playlists WHERE id = ?1 AND user_id = ?2",
        params![playlist_id, user_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(UserStoreError::PlaylistNotFound)
}

fn insert_song(conn: &Connection, playlist_id: i64, new_song: NewSong) -> UserStoreResult<Song> {
    conn.execute(
        "INSERT INTO songs (playlist_id, name, composers, music_url) VALUES (?1, ?2, ?3, ?4)",
        params![
            playlist_id,
            new_song.name,
            new_song.composers,
            new_song.music_url
        ],
    )?;
    Ok(new_song.with_id(conn.last_insert_rowid()))
}

fn load_songs(conn: &Connection, playlist_id: i64) -> UserStoreResult<Vec<Song>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, composers, music_url FROM songs WHERE playlist_id = ?1 ORDER BY id",
    )?;
    let songs = stmt
        .query_map(params![playlist_id], song_from_row)?
        .collect::<Result<Vec<Song>, _>>()?;
    Ok(songs)
}

fn load_playlist(conn: &Connection, playlist_id: i64) -> UserStoreResult<Playlist> {
    let name: String = conn.query_row(
        "SELECT name FROM playlists WHERE id = ?1",
        params![playlist_id],
        |row| row.get(0),
    )?;
    Ok(Playlist {
        id: playlist_id.to_string(),
        name,
        songs: load_songs(conn, playlist_id)?,
    })
}

/// Returns the song together with its row id.
fn find_song(conn: &Connection, playlist_id: i64, song_id: &str) -> UserStoreResult<(i64, Song)> {
    let song_id = parse_id(song_id).ok_or(UserStoreError::SongNotFound)?;
    let song = conn
        .query_row(
            "SELECT id, name, composers, music_url FROM songs WHERE id = ?1 AND playlist_id = ?2",
            params![song_id, playlist_id],
            song_from_row,
        )
        .optional()?
        .ok_or(UserStoreError::SongNotFound)?;
    Ok((song_id, song))
}

fn song_from_row(row: &rusqlite::Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get::<_, i64>(0)?.to_string(),
        name: row.get(1)?,
        composers: row.get(2)?,
        music_url: row.get(3)?,
    })
}

/// Rebuilds the nested playlists of a user from one LEFT JOIN, grouping
/// rows by playlist id. Playlists without songs yield a row of NULLs on
/// the song side.
fn load_user_playlists(conn: &Connection, user_id: i64) -> UserStoreResult<Vec<Playlist>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, s.id, s.name, s.composers, s.music_url \
         FROM playlists AS p \
         LEFT JOIN songs AS s ON p.id = s.playlist_id \
         WHERE p.user_id = ?1 \
         ORDER BY p.id, s.id",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        let playlist_id: i64 = row.get(0)?;
        let playlist_name: String = row.get(1)?;
        let song = match row.get::<_, Option<i64>>(2)? {
            Some(song_id) => Some(Song {
                id: song_id.to_string(),
                name: row.get(3)?,
                composers: row.get(4)?,
                music_url: row.get(5)?,
            }),
            None => None,
        };
        Ok((playlist_id, playlist_name, song))
    })?;

    let mut playlists: Vec<Playlist> = vec![];
    let mut positions: HashMap<i64, usize> = HashMap::new();
    for row in rows {
        let (playlist_id, playlist_name, song) = row?;
        let position = *positions.entry(playlist_id).or_insert_with(|| {
            playlists.push(Playlist {
                id: playlist_id.to_string(),
                name: playlist_name,
                songs: vec![],
            });
            playlists.len() - 1
        });
        if let Some(song) = song {
            playlists[position].songs.push(song);
        }
    }
    Ok(playlists)
}

impl UserStore for SqliteUserStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn register_user(&self, new_user: NewUser) -> UserStoreResult<User> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let email_taken = tx
            .query_row(
                "SELECT 1 FROM users WHERE email = ?1",
                params![new_user.email],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if email_taken {
            return Err(UserStoreError::EmailAlreadyRegistered);
        }

        let mut secret_code = None;
        for _ in 0..MAX_SECRET_CODE_ATTEMPTS {
            let candidate = Self::next_secret_code(&tx)?;
            match find_user_id(&tx, &candidate) {
                Err(UserStoreError::UserNotFound) => {
                    secret_code = Some(candidate);
                    break;
                }
                Ok(_) => debug!("Secret code {} already issued, drawing the next one", candidate),
                Err(err) => return Err(err),
            }
        }
        let secret_code = secret_code.ok_or_else(|| {
            anyhow!(
                "Could not generate an unused secret code after {} attempts",
                MAX_SECRET_CODE_ATTEMPTS
            )
        })?;

        tx.execute(
            "INSERT INTO users (secret_code, name, email) VALUES (?1, ?2, ?3)",
            params![secret_code, new_user.name, new_user.email],
        )?;
        let user_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(User {
            id: user_id.to_string(),
            secret_code,
            name: new_user.name,
            email: new_user.email,
            playlists: vec![],
        })
    }

    fn login(&self, secret_code: &str) -> UserStoreResult<()> {
        let conn = self.lock()?;
        find_user_id(&conn, secret_code).map(|_| ())
    }

    fn get_user_profile(&self, secret_code: &str) -> UserStoreResult<User> {
        let conn = self.lock()?;
        let (user_id, name, email) = conn
            .query_row(
                "SELECT id, name, email FROM users WHERE secret_code = ?1",
                params![secret_code],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?
            .ok_or(UserStoreError::UserNotFound)?;

        Ok(User {
            id: user_id.to_string(),
            secret_code: secret_code.to_string(),
            name,
            email,
            playlists: load_user_playlists(&conn, user_id)?,
        })
    }

    fn create_playlist(
        &self,
        secret_code: &str,
        new_playlist: NewPlaylist,
    ) -> UserStoreResult<Playlist> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let user_id = find_user_id(&tx, secret_code)?;

        tx.execute(
            "INSERT INTO playlists (user_id, name) VALUES (?1, ?2)",
            params![user_id, new_playlist.name],
        )?;
        let playlist_id = tx.last_insert_rowid();
        let songs = new_playlist
            .songs
            .into_iter()
            .map(|new_song| insert_song(&tx, playlist_id, new_song))
            .collect::<UserStoreResult<Vec<Song>>>()?;
        tx.commit()?;

        Ok(Playlist {
            id: playlist_id.to_string(),
            name: new_playlist.name,
            songs,
        })
    }

    fn add_song_to_playlist(
        &self,
        secret_code: &str,
        playlist_id: &str,
        new_song: NewSong,
    ) -> UserStoreResult<Playlist> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let user_id = find_user_id(&tx, secret_code)?;
        let playlist_id = find_playlist_row(&tx, user_id, playlist_id)?;

        insert_song(&tx, playlist_id, new_song)?;
        let playlist = load_playlist(&tx, playlist_id)?;
        tx.commit()?;
        Ok(playlist)
    }

    fn get_playlist_songs(
        &self,
        secret_code: &str,
        playlist_id: &str,
    ) -> UserStoreResult<Vec<Song>> {
        let conn = self.lock()?;
        let user_id = find_user_id(&conn, secret_code)?;
        let playlist_id = find_playlist_row(&conn, user_id, playlist_id)?;
        load_songs(&conn, playlist_id)
    }

    fn delete_song_from_playlist(
        &self,
        secret_code: &str,
        playlist_id: &str,
        song_id: &str,
    ) -> UserStoreResult<Song> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let user_id = find_user_id(&tx, secret_code)?;
        let playlist_id = find_playlist_row(&tx, user_id, playlist_id)?;
        let (song_row_id, song) = find_song(&tx, playlist_id, song_id)?;

        tx.execute("DELETE FROM songs WHERE id = ?1", params![song_row_id])?;
        tx.commit()?;
        Ok(song)
    }

    fn delete_playlist(&self, secret_code: &str, playlist_id: &str) -> UserStoreResult<Playlist> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let user_id = find_user_id(&tx, secret_code)?;
        let playlist_id = find_playlist_row(&tx, user_id, playlist_id)?;
        let playlist = load_playlist(&tx, playlist_id)?;

        // Songs go with it through ON DELETE CASCADE.
        tx.execute("DELETE FROM playlists WHERE id = ?1", params![playlist_id])?;
        tx.commit()?;
        Ok(playlist)
    }

    fn get_song(
        &self,
        secret_code: &str,
        playlist_id: &str,
        song_id: &str,
    ) -> UserStoreResult<Song> {
        let conn = self.lock()?;
        let user_id = find_user_id(&conn, secret_code)?;
        let playlist_id = find_playlist_row(&conn, user_id, playlist_id)?;
        find_song(&conn, playlist_id, song_id).map(|(_, song)| song)
    }
}
