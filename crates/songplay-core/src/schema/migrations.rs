/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Dimensions: catalog
CREATE TABLE IF NOT EXISTS artists (
    artist_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    location TEXT,
    latitude REAL,
    longitude REAL
) STRICT;

CREATE TABLE IF NOT EXISTS songs (
    song_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    artist_id TEXT NOT NULL REFERENCES artists(artist_id),
    year INTEGER,
    duration REAL
) STRICT;

-- Fact resolution joins on these three columns
CREATE INDEX IF NOT EXISTS idx_songs_title_duration ON songs(title, duration);
CREATE INDEX IF NOT EXISTS idx_artists_name ON artists(name);

-- Dimensions: event stream
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    gender TEXT,
    level TEXT NOT NULL
) STRICT;

CREATE TABLE IF NOT EXISTS time (
    start_time INTEGER PRIMARY KEY,
    hour INTEGER NOT NULL,
    day INTEGER NOT NULL,
    week INTEGER NOT NULL,
    month INTEGER NOT NULL,
    year INTEGER NOT NULL,
    weekday INTEGER NOT NULL
) STRICT;

-- Fact
CREATE TABLE IF NOT EXISTS songplays (
    songplay_id INTEGER PRIMARY KEY,
    start_time INTEGER NOT NULL REFERENCES time(start_time),
    user_id TEXT NOT NULL REFERENCES users(user_id),
    level TEXT NOT NULL,
    song_id TEXT REFERENCES songs(song_id),
    artist_id TEXT REFERENCES artists(artist_id),
    session_id INTEGER NOT NULL,
    location TEXT,
    user_agent TEXT
) STRICT;

CREATE INDEX IF NOT EXISTS idx_songplays_start_time ON songplays(start_time);
CREATE INDEX IF NOT EXISTS idx_songplays_user_id ON songplays(user_id);
"#;

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "star_schema",
    sql: MIGRATION_001,
}];
