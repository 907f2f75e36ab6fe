pub mod config;
pub mod load;
pub mod status;

pub use load::run_load;
pub use status::show_status;
