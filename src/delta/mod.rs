//! Block-hash delta toolkit: encoding a target object as copy/insert
//! instructions against a base (`encode`), applying such an instruction
//! stream to rebuild the target (`decode`), and the shared varint helpers.

pub mod decode;
pub mod encode;
pub mod errors;
pub mod utils;

pub use decode::delta_apply;
pub use encode::{BLOCK_SIZE, DeltaIndex, encode_delta};
