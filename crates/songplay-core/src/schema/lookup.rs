//! Catalog lookups used to resolve play events against loaded dimensions.

use rusqlite::Connection;

use crate::error::Result;

/// The catalog keys a play event resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMatch {
    pub song_id: String,
    pub artist_id: String,
}

/// Exact-match song resolution.
pub trait SongLookup {
    /// Find the single song whose title, duration and artist name all equal
    /// the given values.
    ///
    /// Duration is compared with exact floating-point equality. Returns
    /// `None` when nothing matches or when the match is ambiguous.
    fn lookup_song(&self, title: &str, artist_name: &str, duration: f64)
        -> Result<Option<SongMatch>>;
}

const SONG_SELECT: &str = "
    SELECT songs.song_id, artists.artist_id
    FROM songs JOIN artists ON songs.artist_id = artists.artist_id
    WHERE songs.title = ?1 AND artists.name = ?2 AND songs.duration = ?3
    LIMIT 2";

impl SongLookup for Connection {
    fn lookup_song(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<SongMatch>> {
        let mut stmt = self.prepare_cached(SONG_SELECT)?;
        let matches = stmt
            .query_map(rusqlite::params![title, artist_name, duration], |row| {
                Ok(SongMatch {
                    song_id: row.get(0)?,
                    artist_id: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if matches.len() > 1 {
            log::debug!(
                "Ambiguous catalog match for {:?} by {:?} ({}s)",
                title,
                artist_name,
                duration
            );
            return Ok(None);
        }
        Ok(matches.into_iter().next())
    }
}

/// The next free surrogate id in `songplays`.
pub fn next_songplay_id(conn: &Connection) -> Result<i64> {
    let max: Option<i64> =
        conn.query_row("SELECT MAX(songplay_id) FROM songplays", [], |row| row.get(0))?;
    Ok(max.unwrap_or(0) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Database;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute_batch(
                "INSERT INTO artists (artist_id, name) VALUES ('AR1', 'A'), ('AR2', 'B');
                 INSERT INTO songs (song_id, title, artist_id, duration)
                 VALUES ('SO1', 'Test', 'AR1', 210.5), ('SO2', 'Test', 'AR2', 210.5);",
            )
            .unwrap();
        db
    }

    #[test]
    fn test_exact_match() {
        let db = seeded();
        let found = db.conn().lookup_song("Test", "A", 210.5).unwrap();
        assert_eq!(
            found,
            Some(SongMatch {
                song_id: "SO1".to_string(),
                artist_id: "AR1".to_string(),
            })
        );
    }

    #[test]
    fn test_duration_must_be_exact() {
        let db = seeded();
        assert!(db.conn().lookup_song("Test", "A", 210.6).unwrap().is_none());
        assert!(db
            .conn()
            .lookup_song("Test", "A", 210.500_000_000_1)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_artist_disambiguates_same_title() {
        let db = seeded();
        let found = db.conn().lookup_song("Test", "B", 210.5).unwrap().unwrap();
        assert_eq!(found.song_id, "SO2");
    }

    #[test]
    fn test_ambiguous_match_is_a_miss() {
        let db = seeded();
        db.conn()
            .execute(
                "INSERT INTO songs (song_id, title, artist_id, duration)
                 VALUES ('SO3', 'Test', 'AR1', 210.5)",
                [],
            )
            .unwrap();
        assert!(db.conn().lookup_song("Test", "A", 210.5).unwrap().is_none());
    }

    #[test]
    fn test_next_songplay_id() {
        let db = seeded();
        assert_eq!(next_songplay_id(db.conn()).unwrap(), 1);
        db.conn()
            .execute_batch(
                "INSERT INTO time VALUES (1000, 0, 1, 1, 1, 1970, 4);
                 INSERT INTO users VALUES ('7', 'Ann', 'Lee', 'F', 'free');
                 INSERT INTO songplays (songplay_id, start_time, user_id, level, session_id)
                 VALUES (41, 1000, '7', 'free', 3);",
            )
            .unwrap();
        assert_eq!(next_songplay_id(db.conn()).unwrap(), 42);
    }
}
