// Planning and inspection
pub mod aoi;
pub mod dip;
pub mod production;
pub mod statistics;

// Reference data and attachments
pub mod model_files;
pub mod reference;

// Accounts
pub mod auth;
