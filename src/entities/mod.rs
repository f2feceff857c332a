pub mod goal;
pub mod schema_version;
pub mod task;
