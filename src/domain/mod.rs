pub mod commands;
pub mod palette;
pub mod state;
