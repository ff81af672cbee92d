pub mod events;
pub mod logs;
pub mod progress;
pub mod schema;
