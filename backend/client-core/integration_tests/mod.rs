mod bridge;
mod config;
mod error;
mod handshake;
mod helpers;
mod lockfile;
mod prefs;
mod session;
mod supervisor;
mod window_state;
