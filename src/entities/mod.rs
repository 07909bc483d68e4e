//! SeaORM entities for the planning, inspection and reference tables.

pub mod aoi_record;
pub mod company;
pub mod dip_group;
pub mod dip_history;
pub mod manager;
pub mod model_file;
pub mod model_folder;
pub mod product_model;
pub mod production_schedule;
pub mod user;

pub use aoi_record::DefectKind;
pub use dip_group::DipStatus;
pub use dip_history::HistoryType;
pub use production_schedule::TbType;
pub use user::UserRole;
