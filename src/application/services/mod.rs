pub mod analysis;
pub mod dedup;
pub mod dispatcher;
pub mod lifecycle;
