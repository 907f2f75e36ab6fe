//! Bulk loader.
//!
//! Rows are first serialized into a delimited text buffer (no header, one
//! row per line, columns in [`TableSchema`] order) and then copied into the
//! target table with the table's conflict clause. The buffer format follows
//! the usual COPY text conventions: backslash, newline, carriage return and
//! the delimiter are backslash-escaped, and with `null_as_empty` an empty
//! field is read back as NULL.

use rusqlite::types::Value;
use rusqlite::Connection;

use songplay_core::model::{Artist, Song, SongPlay, TimeMark, User};
use songplay_core::schema::tables::{ARTISTS, SONGPLAYS, SONGS, TIME, USERS};
use songplay_core::schema::{Column, ColumnType, TableSchema};

use crate::error::{EtlError, EtlResult};

/// Buffer format for a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOptions {
    pub delimiter: char,
    /// Read empty fields back as NULL rather than as empty text.
    pub null_as_empty: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            null_as_empty: true,
        }
    }
}

impl CopyOptions {
    /// Reject delimiters that collide with the escape syntax.
    pub fn validate(&self) -> Result<(), String> {
        if matches!(self.delimiter, '\\' | '\n' | '\r' | 'n' | 'r') {
            return Err(format!("unusable delimiter {:?}", self.delimiter));
        }
        Ok(())
    }
}

/// A typed row that can be bulk loaded into its table.
pub trait CopyRow {
    const SCHEMA: TableSchema;

    /// Field values in `SCHEMA` column order; `None` is an absent value.
    fn fields(&self) -> Vec<Option<String>>;
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

fn opt<T: ToString>(value: Option<T>) -> Option<String> {
    value.map(|v| v.to_string())
}

impl CopyRow for Song {
    const SCHEMA: TableSchema = SONGS;

    fn fields(&self) -> Vec<Option<String>> {
        vec![
            text(&self.song_id),
            text(&self.title),
            text(&self.artist_id),
            opt(self.year),
            opt(self.duration),
        ]
    }
}

impl CopyRow for Artist {
    const SCHEMA: TableSchema = ARTISTS;

    fn fields(&self) -> Vec<Option<String>> {
        vec![
            text(&self.artist_id),
            text(&self.name),
            self.location.clone(),
            opt(self.latitude),
            opt(self.longitude),
        ]
    }
}

impl CopyRow for User {
    const SCHEMA: TableSchema = USERS;

    fn fields(&self) -> Vec<Option<String>> {
        vec![
            text(&self.user_id),
            text(&self.first_name),
            text(&self.last_name),
            self.gender.clone(),
            text(&self.level),
        ]
    }
}

impl CopyRow for TimeMark {
    const SCHEMA: TableSchema = TIME;

    fn fields(&self) -> Vec<Option<String>> {
        vec![
            Some(self.start_time.to_string()),
            Some(self.hour.to_string()),
            Some(self.day.to_string()),
            Some(self.week.to_string()),
            Some(self.month.to_string()),
            Some(self.year.to_string()),
            Some(self.weekday.to_string()),
        ]
    }
}

impl CopyRow for SongPlay {
    const SCHEMA: TableSchema = SONGPLAYS;

    fn fields(&self) -> Vec<Option<String>> {
        vec![
            Some(self.songplay_id.to_string()),
            Some(self.start_time.to_string()),
            text(&self.user_id),
            text(&self.level),
            self.song_id.clone(),
            self.artist_id.clone(),
            Some(self.session_id.to_string()),
            self.location.clone(),
            self.user_agent.clone(),
        ]
    }
}

/// Serialize rows into a delimited buffer.
pub fn write_rows<R: CopyRow>(rows: &[R], options: &CopyOptions) -> String {
    let delimiter = options.delimiter.to_string();
    let mut buffer = String::new();
    for row in rows {
        let line = row
            .fields()
            .iter()
            .map(|field| {
                field
                    .as_deref()
                    .map(|v| escape(v, options.delimiter))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(&delimiter);
        buffer.push_str(&line);
        buffer.push('\n');
    }
    buffer
}

fn escape(value: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some(other) => current.push(other),
                None => current.push('\\'),
            }
        } else if c == delimiter {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);
    fields
}

fn coerce(field: String, column: &Column, null_as_empty: bool) -> Result<Value, String> {
    if field.is_empty() && null_as_empty {
        return Ok(Value::Null);
    }
    match column.ty {
        ColumnType::Text => Ok(Value::Text(field)),
        ColumnType::Integer => field
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| format!("column {}: invalid integer {field:?}", column.name)),
        ColumnType::Real => field
            .parse::<f64>()
            .map(Value::Real)
            .map_err(|_| format!("column {}: invalid number {field:?}", column.name)),
    }
}

/// Copy a delimited buffer into `table`.
///
/// Each line is split, coerced by declared column type and inserted with
/// the table's conflict clause. Returns the number of rows the store
/// reported as changed, so rows skipped by an ignore policy are not counted.
pub fn copy_from(
    conn: &Connection,
    table: &TableSchema,
    buffer: &str,
    options: &CopyOptions,
) -> EtlResult<usize> {
    let mut stmt = conn
        .prepare_cached(&table.insert_sql())
        .map_err(|e| EtlError::storage(table.name, 0, e))?;

    let mut written = 0;
    for (index, line) in buffer.lines().enumerate() {
        let row = index + 1;
        let fields = split_fields(line, options.delimiter);
        if fields.len() != table.columns.len() {
            return Err(EtlError::ConstraintViolation {
                table: table.name,
                row,
                message: format!(
                    "expected {} fields, found {}",
                    table.columns.len(),
                    fields.len()
                ),
            });
        }

        let values = fields
            .into_iter()
            .zip(table.columns)
            .map(|(field, column)| coerce(field, column, options.null_as_empty))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|message| EtlError::ConstraintViolation {
                table: table.name,
                row,
                message,
            })?;

        written += stmt
            .execute(rusqlite::params_from_iter(values))
            .map_err(|e| EtlError::storage(table.name, row, e))?;
    }

    Ok(written)
}

/// Serialize and copy a batch of rows into their table.
pub fn copy_rows<R: CopyRow>(conn: &Connection, rows: &[R], options: &CopyOptions) -> EtlResult<usize> {
    if rows.is_empty() {
        return Ok(0);
    }
    let buffer = write_rows(rows, options);
    let written = copy_from(conn, &R::SCHEMA, &buffer, options)?;
    log::debug!(
        "Copied {} of {} rows into {}",
        written,
        rows.len(),
        R::SCHEMA.name
    );
    Ok(written)
}
