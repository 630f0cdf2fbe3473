pub mod directory;
pub mod group_sync;
