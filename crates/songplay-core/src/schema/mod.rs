pub mod db;
pub mod lookup;
pub mod migrations;
pub mod tables;

pub use db::Database;
pub use lookup::{SongLookup, SongMatch};
pub use tables::{Column, ColumnType, ConflictPolicy, TableSchema};
