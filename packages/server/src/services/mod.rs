pub mod legacy_source;
