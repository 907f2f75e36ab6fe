use serde::{Deserialize, Serialize};

/// A catalog song. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: Option<i32>,

    /// Track length in seconds, as published by the catalog.
    pub duration: Option<f64>,
}

impl Song {
    #[must_use]
    pub fn new(
        song_id: impl Into<String>,
        title: impl Into<String>,
        artist_id: impl Into<String>,
    ) -> Self {
        Self {
            song_id: song_id.into(),
            title: title.into(),
            artist_id: artist_id.into(),
            year: None,
            duration: None,
        }
    }

    #[must_use]
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}
