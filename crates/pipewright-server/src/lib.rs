//! Development server with live reload for pipewright builds.
//!
//! Serves the output directory, pushes reload notifications to connected
//! browsers over a WebSocket and reruns the build when sources change.

pub mod livereload;
pub mod server;
pub mod watcher;

pub use livereload::{LiveReloadHub, LiveReloadMessage};
pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{rebuild_on_change, FileWatcher, WatchEvent};
