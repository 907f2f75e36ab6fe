//! Fact resolver: turns qualifying log rows into `songplays` rows.

use songplay_core::model::SongPlay;
use songplay_core::schema::SongLookup;

use crate::error::{EtlError, EtlResult};
use crate::records::EventRecord;

/// The page value that marks a song being played.
pub const NEXT_SONG: &str = "NextSong";

/// A validated `NextSong` log row.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayEvent {
    /// Line of the source record within its file.
    pub line: usize,
    pub start_time: i64,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub level: String,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

impl PlayEvent {
    fn from_record(record: &EventRecord) -> EtlResult<Self> {
        let missing = |field: &str| {
            EtlError::malformed(record.line, format!("{NEXT_SONG} event is missing `{field}`"))
        };

        Ok(Self {
            line: record.line,
            start_time: record.ts,
            user_id: record.user_id.clone().ok_or_else(|| missing("userId"))?,
            first_name: record.first_name.clone().ok_or_else(|| missing("firstName"))?,
            last_name: record.last_name.clone().ok_or_else(|| missing("lastName"))?,
            gender: record.gender.clone(),
            level: record.level.clone().ok_or_else(|| missing("level"))?,
            song: record.song.clone(),
            artist: record.artist.clone(),
            length: record.length,
            session_id: record.session_id.ok_or_else(|| missing("sessionId"))?,
            location: record.location.clone(),
            user_agent: record.user_agent.clone(),
        })
    }
}

/// Keep only `NextSong` rows, validating each into a [`PlayEvent`].
///
/// Rows for any other page (home, login, logout, settings…) are dropped
/// before validation.
pub fn select_plays(events: &[EventRecord]) -> EtlResult<Vec<PlayEvent>> {
    events
        .iter()
        .filter(|e| e.page == NEXT_SONG)
        .map(PlayEvent::from_record)
        .collect()
}

/// Build one fact per play, in order, with surrogate ids counting up from
/// `first_id`.
///
/// A play that does not resolve to exactly one catalog song keeps null
/// `song_id` and `artist_id`; it is still recorded.
pub fn resolve_facts<L>(lookup: &L, plays: &[PlayEvent], first_id: i64) -> EtlResult<Vec<SongPlay>>
where
    L: SongLookup + ?Sized,
{
    let mut facts = Vec::with_capacity(plays.len());
    let mut matched = 0usize;

    for (offset, play) in (0_i64..).zip(plays) {
        let found = match (&play.song, &play.artist, play.length) {
            (Some(title), Some(artist), Some(length)) => lookup.lookup_song(title, artist, length)?,
            _ => None,
        };
        if found.is_some() {
            matched += 1;
        }
        let (song_id, artist_id) = found.map_or((None, None), |m| (Some(m.song_id), Some(m.artist_id)));

        facts.push(SongPlay {
            songplay_id: first_id + offset,
            start_time: play.start_time,
            user_id: play.user_id.clone(),
            level: play.level.clone(),
            song_id,
            artist_id,
            session_id: play.session_id,
            location: play.location.clone(),
            user_agent: play.user_agent.clone(),
        });
    }

    log::debug!("Resolved {} of {} plays against the catalog", matched, plays.len());
    Ok(facts)
}
