pub(crate) mod aws;
pub(crate) mod tui;
