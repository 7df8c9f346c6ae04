//! Small shared helpers with no engine state.

pub mod buffer;
