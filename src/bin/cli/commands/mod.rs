pub mod add;
pub mod due;
pub mod graph;
pub mod init;
pub mod link;
pub mod progress;
pub mod quality;
pub mod review;
pub mod schedule;
pub mod session;
pub mod sessions;
pub mod stats;
pub mod suggest;
