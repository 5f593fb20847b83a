pub mod day_strip;
pub mod footer;
pub mod help_overlay;
pub mod modal;
pub mod pagination_bar;
pub mod stats_bar;
pub mod tab_bar;
pub mod table;
pub mod text_input;
