//! Record normalizer: typed rows for the two line-delimited JSON sources.
//!
//! Both sources are loosely typed. Numbers may arrive as JSON numbers, as
//! strings, as `null`, or as the `NaN` sentinel, and user ids may be strings
//! or integers. All of that is settled here, at the parse boundary: absent
//! values become `None`, and a record missing a required field rejects the
//! whole file as [`EtlError::MalformedRecord`].

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use std::path::Path;

use songplay_core::model::{Artist, Song};

use crate::error::{EtlError, EtlResult};

/// One entry from the song catalog tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    pub artist_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub artist_location: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub artist_latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub artist_longitude: Option<f64>,
}

impl CatalogRecord {
    fn validate(&self) -> Result<(), String> {
        require("song_id", &self.song_id)?;
        require("title", &self.title)?;
        require("artist_id", &self.artist_id)?;
        require("artist_name", &self.artist_name)
    }

    /// Split the record into its song and artist rows.
    #[must_use]
    pub fn into_rows(self) -> (Song, Artist) {
        let song = Song {
            song_id: self.song_id,
            title: self.title,
            artist_id: self.artist_id.clone(),
            year: self.year,
            duration: self.duration,
        };
        let artist = Artist {
            artist_id: self.artist_id,
            name: self.artist_name,
            location: self.artist_location,
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        };
        (song, artist)
    }
}

/// One entry from an event log file.
///
/// Only `ts` and `page` are required here; rows that become facts are
/// checked further by [`crate::facts::select_plays`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// 1-based line of the record within its file.
    #[serde(skip)]
    pub line: usize,
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    pub page: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub song: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub artist: Option<String>,
    /// Track length in seconds.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub length: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub session_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user_agent: Option<String>,
}

/// Parse the contents of a catalog file.
pub fn parse_catalog(text: &str) -> EtlResult<Vec<CatalogRecord>> {
    let records = parse_lines(text, CatalogRecord::validate)?;
    Ok(records.into_iter().map(|(_, record)| record).collect())
}

/// Parse the contents of an event log file.
pub fn parse_events(text: &str) -> EtlResult<Vec<EventRecord>> {
    let records = parse_lines(text, |_: &EventRecord| Ok(()))?;
    Ok(records
        .into_iter()
        .map(|(line, record)| EventRecord { line, ..record })
        .collect())
}

pub fn read_catalog_file(path: &Path) -> EtlResult<Vec<CatalogRecord>> {
    parse_catalog(&read_text(path)?)
}

pub fn read_event_file(path: &Path) -> EtlResult<Vec<EventRecord>> {
    parse_events(&read_text(path)?)
}

/// Undecodable bytes are a malformed file, not an I/O failure.
fn read_text(path: &Path) -> EtlResult<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => EtlError::malformed(0, "file is not valid UTF-8"),
        _ => EtlError::Io(e),
    })
}

/// Records paired with their 1-based line numbers.
fn parse_lines<T, F>(text: &str, validate: F) -> EtlResult<Vec<(usize, T)>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> Result<(), String>,
{
    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let record: T =
            serde_json::from_str(line).map_err(|e| EtlError::malformed(line_no, e.to_string()))?;
        validate(&record).map_err(|message| EtlError::malformed(line_no, message))?;
        records.push((line_no, record));
    }

    if records.is_empty() {
        return Err(EtlError::malformed(0, "file contains no records"));
    }
    Ok(records)
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("required field `{field}` is empty"))
    } else {
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Numeric view of the value; blank text and `NaN` are absent.
    fn into_f64<E: de::Error>(self) -> Result<Option<f64>, E> {
        let value = match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
            Self::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse::<f64>()
                    .map_err(|_| E::custom(format!("expected a number, found {s:?}")))?
            }
        };
        Ok(Some(value).filter(|v| !v.is_nan()))
    }

    fn into_i64<E: de::Error>(self) -> Result<Option<i64>, E> {
        match self {
            Self::Int(v) => Ok(Some(v)),
            other => match other.into_f64::<E>()? {
                None => Ok(None),
                #[allow(clippy::cast_possible_truncation)]
                Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => Ok(Some(v as i64)),
                Some(v) => Err(E::custom(format!("expected an integer, found {v}"))),
            },
        }
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(scalar) => scalar.into_f64(),
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(scalar) => scalar.into_i64(),
    }
}

fn lenient_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    lenient_i64(deserializer)?
        .map(|v| {
            i32::try_from(v)
                .map_err(|_| <D::Error as de::Error>::custom(format!("{v} out of range")))
        })
        .transpose()
}

/// User ids are strings in some exports and integers in others.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        None => None,
        Some(Scalar::Int(v)) => Some(v.to_string()),
        Some(Scalar::Float(v)) if v.fract() == 0.0 => Some(format!("{v:.0}")),
        Some(Scalar::Float(v)) => Some(v.to_string()),
        Some(Scalar::Text(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
    })
}

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}
