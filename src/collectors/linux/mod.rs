//! Readers for the `/proc` files backing the Linux collectors.

pub mod cpu;
pub mod load;
pub mod memory;
