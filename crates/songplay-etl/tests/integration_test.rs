//! End-to-end tests: JSON trees on disk → SQLite star schema.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use songplay_core::schema::tables::{ARTISTS, SONGPLAYS, SONGS, TIME, USERS};
use songplay_core::schema::Database;
use songplay_etl::{BatchRunner, CopyOptions, SourceKind};

struct Fixture {
    _dir: TempDir,
    song_root: PathBuf,
    log_root: PathBuf,
    db_path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let song_root = dir.path().join("song_data");
        let log_root = dir.path().join("log_data");
        fs::create_dir_all(song_root.join("A/B/C")).unwrap();
        fs::create_dir_all(log_root.join("2018/11")).unwrap();
        let db_path = dir.path().join("songplay.db");
        Self {
            _dir: dir,
            song_root,
            log_root,
            db_path,
        }
    }

    fn song(&self, song_id: &str, title: &str, artist_id: &str, artist: &str, duration: f64) {
        let body = format!(
            r#"{{"num_songs": 1, "artist_id": "{artist_id}", "artist_latitude": null, "artist_longitude": null, "artist_location": "", "artist_name": "{artist}", "song_id": "{song_id}", "title": "{title}", "duration": {duration}, "year": 0}}"#
        );
        write(&self.song_root.join("A/B/C"), &format!("{song_id}.json"), &body);
    }

    fn log(&self, name: &str, lines: &[String]) {
        write(&self.log_root.join("2018/11"), name, &lines.join("\n"));
    }

    fn open(&self) -> Database {
        Database::open(&self.db_path).unwrap()
    }
}

fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

fn event(ts: i64, page: &str, user_id: &str, level: &str, song: &str, artist: &str, length: f64) -> String {
    format!(
        r#"{{"artist":"{artist}","auth":"Logged In","firstName":"Lily","gender":"F","itemInSession":0,"lastName":"Koch","length":{length},"level":"{level}","location":"Chicago-Naperville-Elgin, IL-IN-WI","method":"PUT","page":"{page}","registration":1541048010796.0,"sessionId":818,"song":"{song}","status":200,"ts":{ts},"userAgent":"Mozilla/5.0","userId":"{user_id}"}}"#
    )
}

fn runner() -> BatchRunner {
    BatchRunner::new(CopyOptions::default())
}

#[test]
fn test_catalog_reload_is_idempotent() {
    let fx = Fixture::new();
    fx.song("SO1", "Test", "AR1", "A", 210.5);
    fx.song("SO2", "Other", "AR1", "A", 180.0);
    let mut db = fx.open();

    let first = runner().run(&mut db, &fx.song_root, SourceKind::Catalog).unwrap();
    let second = runner().run(&mut db, &fx.song_root, SourceKind::Catalog).unwrap();

    assert!(first.is_success());
    assert!(second.is_success());
    assert_eq!(first.totals.songs, 2);
    assert_eq!(second.totals.songs, 0);
    assert_eq!(db.count_rows(&SONGS).unwrap(), 2);
    assert_eq!(db.count_rows(&ARTISTS).unwrap(), 1);
}

#[test]
fn test_user_level_upsert_last_seen_wins() {
    let fx = Fixture::new();
    fx.log(
        "events.json",
        &[
            event(1_000, "NextSong", "7", "free", "x", "y", 1.0),
            event(2_000, "NextSong", "7", "paid", "x", "y", 1.0),
        ],
    );
    let mut db = fx.open();
    runner().run(&mut db, &fx.log_root, SourceKind::Events).unwrap();

    let user = db.get_user("7").unwrap().unwrap();
    assert_eq!(user.level, "paid");
    assert_eq!(user.first_name, "Lily");
    assert_eq!(user.last_name, "Koch");
    assert_eq!(db.count_rows(&USERS).unwrap(), 1);
}

#[test]
fn test_user_level_upsert_across_files() {
    let fx = Fixture::new();
    fx.log("a.json", &[event(1_000, "NextSong", "7", "paid", "x", "y", 1.0)]);
    fx.log("b.json", &[event(2_000, "NextSong", "7", "free", "x", "y", 1.0)]);
    let mut db = fx.open();
    runner().run(&mut db, &fx.log_root, SourceKind::Events).unwrap();

    assert_eq!(db.get_user("7").unwrap().unwrap().level, "free");
}

#[test]
fn test_shared_start_time_yields_one_time_row() {
    let fx = Fixture::new();
    fx.log(
        "events.json",
        &[
            event(1_541_903_636_796, "NextSong", "7", "free", "x", "y", 1.0),
            event(1_541_903_636_796, "NextSong", "8", "free", "x", "y", 1.0),
        ],
    );
    let mut db = fx.open();
    runner().run(&mut db, &fx.log_root, SourceKind::Events).unwrap();

    assert_eq!(db.count_rows(&TIME).unwrap(), 1);
    assert_eq!(db.count_rows(&SONGPLAYS).unwrap(), 2);
}

#[test]
fn test_resolution_requires_exact_duration() {
    let fx = Fixture::new();
    fx.song("SO1", "Test", "AR1", "A", 210.5);
    fx.log(
        "events.json",
        &[
            event(1_000, "NextSong", "7", "free", "Test", "A", 210.5),
            event(2_000, "NextSong", "7", "free", "Test", "A", 210.6),
        ],
    );
    let mut db = fx.open();
    let (catalog, events) = runner()
        .run_all(&mut db, &fx.song_root, &fx.log_root)
        .unwrap();
    assert!(catalog.is_success());
    assert!(events.is_success());
    assert_eq!(events.totals.matched, 1);

    let plays = db.list_songplays().unwrap();
    assert_eq!(plays.len(), 2);
    assert_eq!(plays[0].song_id.as_deref(), Some("SO1"));
    assert_eq!(plays[0].artist_id.as_deref(), Some("AR1"));
    assert!(plays[1].song_id.is_none());
    assert!(plays[1].artist_id.is_none());
}

#[test]
fn test_only_next_song_rows_become_facts() {
    let fx = Fixture::new();
    fx.log(
        "events.json",
        &[
            event(1_000, "Home", "7", "free", "x", "y", 1.0),
            event(2_000, "Login", "7", "free", "x", "y", 1.0),
            event(3_000, "NextSong", "7", "free", "x", "y", 1.0),
            event(4_000, "Logout", "7", "free", "x", "y", 1.0),
        ],
    );
    let mut db = fx.open();
    runner().run(&mut db, &fx.log_root, SourceKind::Events).unwrap();

    let plays = db.list_songplays().unwrap();
    assert_eq!(plays.len(), 1);
    assert_eq!(plays[0].start_time, 3_000);
    assert_eq!(db.count_rows(&TIME).unwrap(), 1);
}

#[test]
fn test_malformed_file_is_skipped() {
    let fx = Fixture::new();
    fx.log("a.json", &["{broken".to_string()]);
    fx.log("b.json", &[event(1_000, "NextSong", "7", "free", "x", "y", 1.0)]);
    let mut db = fx.open();

    let report = runner().run(&mut db, &fx.log_root, SourceKind::Events).unwrap();
    assert_eq!(report.files_found, 2);
    assert_eq!(report.files_loaded, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(db.count_rows(&SONGPLAYS).unwrap(), 1);
}

#[test]
fn test_reprocessing_events_duplicates_facts() {
    // Surrogate ids are positional, so a second pass appends new facts
    // while the dimension tables stay unchanged.
    let fx = Fixture::new();
    fx.log("events.json", &[event(1_000, "NextSong", "7", "free", "x", "y", 1.0)]);
    let mut db = fx.open();

    runner().run(&mut db, &fx.log_root, SourceKind::Events).unwrap();
    runner().run(&mut db, &fx.log_root, SourceKind::Events).unwrap();

    assert_eq!(db.count_rows(&SONGPLAYS).unwrap(), 2);
    assert_eq!(db.count_rows(&TIME).unwrap(), 1);
    assert_eq!(db.count_rows(&USERS).unwrap(), 1);
}

#[test]
fn test_data_persists_across_reopen() {
    let fx = Fixture::new();
    fx.song("SO1", "Test", "AR1", "A", 210.5);
    {
        let mut db = fx.open();
        runner().run(&mut db, &fx.song_root, SourceKind::Catalog).unwrap();
    }
    let db = fx.open();
    assert_eq!(db.count_rows(&SONGS).unwrap(), 1);
}

#[test]
fn test_empty_trees() {
    let fx = Fixture::new();
    let mut db = fx.open();
    let (catalog, events) = runner()
        .run_all(&mut db, &fx.song_root, &fx.log_root)
        .unwrap();
    assert_eq!(catalog.files_found, 0);
    assert_eq!(events.files_found, 0);
    assert!(catalog.is_success() && events.is_success());
}
