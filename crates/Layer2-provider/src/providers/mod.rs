//! Remote client implementations

pub mod suno;
