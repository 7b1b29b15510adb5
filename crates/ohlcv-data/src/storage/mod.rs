//! 시계열 저장소.

pub mod csv;
