//! Dimension builder: the `time` and `users` rows implied by a batch of plays.

use std::collections::{HashMap, HashSet};

use songplay_core::model::{TimeMark, User};

use crate::error::{EtlError, EtlResult};
use crate::facts::PlayEvent;

/// One [`TimeMark`] per distinct start time, in first-seen order.
pub fn build_time_dimension(plays: &[PlayEvent]) -> EtlResult<Vec<TimeMark>> {
    let mut seen = HashSet::new();
    let mut marks = Vec::new();

    for play in plays {
        if !seen.insert(play.start_time) {
            continue;
        }
        let mark = TimeMark::from_millis(play.start_time).ok_or_else(|| {
            EtlError::malformed(play.line, format!("timestamp {} out of range", play.start_time))
        })?;
        marks.push(mark);
    }

    Ok(marks)
}

/// One [`User`] per distinct user id.
///
/// The row from the user's last play wins, so the batch records each user's
/// most recent level. Users are ordered by first appearance.
pub fn build_user_dimension(plays: &[PlayEvent]) -> Vec<User> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut users: Vec<User> = Vec::new();

    for play in plays {
        let user = User {
            user_id: play.user_id.clone(),
            first_name: play.first_name.clone(),
            last_name: play.last_name.clone(),
            gender: play.gender.clone(),
            level: play.level.clone(),
        };
        match positions.get(play.user_id.as_str()) {
            Some(&at) => users[at] = user,
            None => {
                positions.insert(&play.user_id, users.len());
                users.push(user);
            }
        }
    }

    users
}
