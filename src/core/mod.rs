// Pure building blocks: error model, identity derivation, folder payload codec.
pub mod error;
pub mod identity;
pub mod payload;
