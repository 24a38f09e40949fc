//! File output for recorded history.

pub mod export;
