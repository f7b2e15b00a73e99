pub mod driver;
pub mod mounts;
pub mod secrets;
pub mod status;
pub mod supervisor;
