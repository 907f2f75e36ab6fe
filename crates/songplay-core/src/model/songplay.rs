use serde::{Deserialize, Serialize};

/// One observed play of a song: the fact row.
///
/// `song_id` and `artist_id` are `None` when the play could not be matched
/// against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongPlay {
    pub songplay_id: i64,
    /// Milliseconds since the Unix epoch; references `time.start_time`.
    pub start_time: i64,
    pub user_id: String,
    pub level: String,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

impl SongPlay {
    /// Returns `true` when the play resolved to a catalog song.
    pub fn is_matched(&self) -> bool {
        self.song_id.is_some() && self.artist_id.is_some()
    }
}
