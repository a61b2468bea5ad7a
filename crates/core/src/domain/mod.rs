pub mod error;
pub mod job;
pub mod projection;
pub mod repository;
pub mod settings;
pub mod transition;

mod serde_tests;
