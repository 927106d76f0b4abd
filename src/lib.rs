pub mod compaction;
pub mod digest;
pub mod errors;
pub mod init;
pub mod logging;
pub mod message;
pub mod phase;
pub mod session;
pub mod tutor_config;
