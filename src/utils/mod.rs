pub mod command_helpers;
pub mod guild;
pub mod responses;
