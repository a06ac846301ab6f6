pub mod charts;
pub mod controls;
pub mod filter_panel;
pub mod summary;
pub mod text_input;
