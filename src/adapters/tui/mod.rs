pub(crate) mod app;
pub(crate) mod event;
pub(crate) mod ui;
