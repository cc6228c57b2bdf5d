pub mod factory;
pub mod rfb;
