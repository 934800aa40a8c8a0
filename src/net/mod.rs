//! Wire protocol types

pub mod protocol;
