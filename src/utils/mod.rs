// Utility functions
pub mod error;
