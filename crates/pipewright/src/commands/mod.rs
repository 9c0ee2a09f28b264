pub mod build;
pub mod connect;
pub mod serve;
pub mod watch;
