//! Typed descriptions of the star-schema tables.
//!
//! Each [`TableSchema`] names a table, its columns in load order, its natural
//! key and the policy applied when a loaded row collides with that key. The
//! bulk loader renders its INSERT statement from this description, so the
//! conflict policy lives with the table rather than in per-table SQL strings.

/// Storage type of a column, used to coerce delimited text on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
}

impl ColumnType {
    /// The SQLite type name used in the schema.
    #[must_use]
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl Column {
    #[must_use]
    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
        }
    }

    #[must_use]
    pub const fn optional(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
        }
    }
}

/// What happens when an inserted row collides with an existing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Keep the existing row; the first write wins.
    Ignore,
    /// Overwrite only the listed columns of the existing row.
    Update(&'static [&'static str]),
    /// Plain insert; a collision is an error.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub key: &'static str,
    pub conflict: ConflictPolicy,
}

impl TableSchema {
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Render the parameterized INSERT statement for this table, including
    /// its conflict clause.
    #[must_use]
    pub fn insert_sql(&self) -> String {
        let columns = self.column_names().collect::<Vec<_>>().join(", ");
        let placeholders = (1..=self.columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let conflict = match self.conflict {
            ConflictPolicy::Ignore => format!(" ON CONFLICT ({}) DO NOTHING", self.key),
            ConflictPolicy::Update(targets) => {
                let assignments = targets
                    .iter()
                    .map(|c| format!("{c} = excluded.{c}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(" ON CONFLICT ({}) DO UPDATE SET {assignments}", self.key)
            }
            ConflictPolicy::Append => String::new(),
        };

        format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders}){conflict}",
            self.name
        )
    }

    #[must_use]
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.name)
    }
}

pub const SONGS: TableSchema = TableSchema {
    name: "songs",
    columns: &[
        Column::required("song_id", ColumnType::Text),
        Column::required("title", ColumnType::Text),
        Column::required("artist_id", ColumnType::Text),
        Column::optional("year", ColumnType::Integer),
        Column::optional("duration", ColumnType::Real),
    ],
    key: "song_id",
    conflict: ConflictPolicy::Ignore,
};

pub const ARTISTS: TableSchema = TableSchema {
    name: "artists",
    columns: &[
        Column::required("artist_id", ColumnType::Text),
        Column::required("name", ColumnType::Text),
        Column::optional("location", ColumnType::Text),
        Column::optional("latitude", ColumnType::Real),
        Column::optional("longitude", ColumnType::Real),
    ],
    key: "artist_id",
    conflict: ConflictPolicy::Ignore,
};

pub const USERS: TableSchema = TableSchema {
    name: "users",
    columns: &[
        Column::required("user_id", ColumnType::Text),
        Column::required("first_name", ColumnType::Text),
        Column::required("last_name", ColumnType::Text),
        Column::optional("gender", ColumnType::Text),
        Column::required("level", ColumnType::Text),
    ],
    key: "user_id",
    conflict: ConflictPolicy::Update(&["level"]),
};

pub const TIME: TableSchema = TableSchema {
    name: "time",
    columns: &[
        Column::required("start_time", ColumnType::Integer),
        Column::required("hour", ColumnType::Integer),
        Column::required("day", ColumnType::Integer),
        Column::required("week", ColumnType::Integer),
        Column::required("month", ColumnType::Integer),
        Column::required("year", ColumnType::Integer),
        Column::required("weekday", ColumnType::Integer),
    ],
    key: "start_time",
    conflict: ConflictPolicy::Ignore,
};

pub const SONGPLAYS: TableSchema = TableSchema {
    name: "songplays",
    columns: &[
        Column::required("songplay_id", ColumnType::Integer),
        Column::required("start_time", ColumnType::Integer),
        Column::required("user_id", ColumnType::Text),
        Column::required("level", ColumnType::Text),
        Column::optional("song_id", ColumnType::Text),
        Column::optional("artist_id", ColumnType::Text),
        Column::required("session_id", ColumnType::Integer),
        Column::optional("location", ColumnType::Text),
        Column::optional("user_agent", ColumnType::Text),
    ],
    key: "songplay_id",
    conflict: ConflictPolicy::Append,
};

/// All tables, dimensions first.
pub const ALL_TABLES: &[TableSchema] = &[ARTISTS, SONGS, USERS, TIME, SONGPLAYS];
