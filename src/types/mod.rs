pub mod config;
pub mod input;
pub mod playback_state;
pub mod project;
pub mod selection;
pub mod session;
pub mod snippet;
pub mod timeline;
pub mod track;
pub mod view;
