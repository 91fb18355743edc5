//! Host adapters implementing the port traits.

pub mod time;
