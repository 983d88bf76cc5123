/// Domain records for TaskDock
///
/// Plain data types shared by every store implementation. Persistence lives in
/// [`crate::store`]; these types carry no database handles.
///
/// # Models
///
/// - `user`: registered accounts
/// - `task`: per-user tasks, their enums, filters and change sets

pub mod task;
pub mod user;
