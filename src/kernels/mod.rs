//! Low-level, stateless byte kernels shared by the codec layer.

pub mod leb128;
