pub mod dataset;
pub mod legacy;
