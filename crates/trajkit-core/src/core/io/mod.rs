//! Reading and writing of trajectory files understood by the reference host.

pub mod xyz;
