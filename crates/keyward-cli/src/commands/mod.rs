pub mod keyset;
pub mod demo;
