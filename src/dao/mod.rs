/// Entity definitions shared by every store.
pub mod models;
/// Persistence of users, groups, records and leaderboard rows.
pub mod run_store;
/// Storage abstraction layer error types.
pub mod storage;
