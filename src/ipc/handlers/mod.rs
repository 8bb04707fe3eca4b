pub mod answers;
pub mod assistant;
pub mod bookmarks;
pub mod core;
pub mod dashboard;
pub mod kv;
pub mod questions;
pub mod tasks;
pub mod test_plans;
