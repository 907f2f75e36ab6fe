pub mod artist;
pub mod song;
pub mod songplay;
pub mod time;
pub mod user;

pub use artist::Artist;
pub use song::Song;
pub use songplay::SongPlay;
pub use time::TimeMark;
pub use user::User;
