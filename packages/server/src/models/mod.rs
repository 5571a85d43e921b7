pub mod dataset;
pub mod legacy;
pub mod shared;
