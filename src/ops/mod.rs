pub mod api;
pub mod commands;
pub mod history;
pub mod interaction;
pub mod layers;
pub mod recording;
pub mod snippet_ops;
pub mod tools;
