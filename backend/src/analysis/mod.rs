pub mod knowledge;
pub mod normalizer;
