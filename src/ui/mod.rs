pub mod app;
pub mod timeline_widget;
