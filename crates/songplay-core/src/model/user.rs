use serde::{Deserialize, Serialize};

/// A listener, projected from the event stream.
///
/// Only `level` may change after the first insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,

    /// Subscription level, e.g. `free` or `paid`.
    pub level: String,
}
