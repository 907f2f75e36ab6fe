use serde::{Deserialize, Serialize};

/// A catalog artist. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Artist {
    #[must_use]
    pub fn new(artist_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            artist_id: artist_id.into(),
            name: name.into(),
            location: None,
            latitude: None,
            longitude: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}
