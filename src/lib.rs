//! A Rust library for unpacking, decrypting, decompressing, and repacking
//! archive and script formats produced by the EAGLS visual-novel engine.
pub mod batch;
pub mod cipher;
pub mod dat;
pub mod ext;
pub mod gr;
pub mod lzss;
pub mod pak;
pub mod rng;
pub mod types;
pub mod utils;

lazy_static::lazy_static! {
    static ref COUNTER: utils::counter::Counter = utils::counter::Counter::new();
}

/// Returns a reference to the global batch-operation counter instance.
pub fn get_counter() -> &'static utils::counter::Counter {
    &COUNTER
}
