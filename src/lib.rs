// ABOUTME: Library root for terrane - provisions and tears down cloud environments.
// ABOUTME: Callers plug in a control plane, a template compiler and a console.

pub mod config;
pub mod console;
pub mod control_plane;
pub mod deploy;
pub mod destroy;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod params;
pub mod store;
pub mod template;
pub mod types;
