pub mod backup;
pub mod catalog;
pub mod paths;
pub mod retention;
pub mod watch;
