pub mod actor;
pub mod audit;
pub mod document;
pub mod registration;
