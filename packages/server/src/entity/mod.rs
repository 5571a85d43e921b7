pub mod access_rights;
pub mod access_rights_term;
pub mod actor;
pub mod dataset;
pub mod dataset_term;
pub mod legacy_record;
pub mod license;
pub mod organization;
pub mod person;
pub mod provenance;
pub mod provenance_variable;
pub mod spatial_coverage;
pub mod temporal_coverage;
pub mod term;
