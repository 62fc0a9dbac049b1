//! Administration backend for a language academy: tutors, courses, students,
//! enrollments, sessions and payments over a SQLite workspace, the console's
//! view synchronization, and the JSON sidecar that serves it.

pub mod backup;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod facade;
pub mod ipc;
pub mod model;
pub mod store;
pub mod view;
