pub mod home;
pub mod job;
pub mod manga;
