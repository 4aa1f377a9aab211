pub mod echo;
pub mod registry;
