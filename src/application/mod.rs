pub mod commands;
pub mod introspection;
pub mod use_cases;
