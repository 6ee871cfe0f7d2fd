pub mod curl;
pub mod dump;
pub mod mirror;
pub mod query;
pub mod scroll;
pub mod tunnel;
