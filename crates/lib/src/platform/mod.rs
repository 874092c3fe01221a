//! Platform detection used to pick a host adapter.

pub mod os;
