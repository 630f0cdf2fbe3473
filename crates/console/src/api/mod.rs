pub mod group_sync;
