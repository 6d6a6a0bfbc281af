pub mod ids;
pub mod persistence;
