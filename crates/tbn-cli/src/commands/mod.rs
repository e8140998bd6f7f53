pub mod analyze;
pub mod completions;
pub mod doctor;
pub mod filter;
pub mod ibot;
pub mod util;
