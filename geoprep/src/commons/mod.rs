pub mod basic_functions;
pub mod output;
pub mod style;
