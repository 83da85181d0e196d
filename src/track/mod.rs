// Vehicle track accumulated over the session

pub mod history;

pub use history::{TrackHistory, TrackSnapshot};
