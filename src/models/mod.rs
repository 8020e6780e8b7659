pub mod attraction;
pub mod curation;
pub mod user;

pub use attraction::*;
pub use curation::*;
pub use user::*;
