use serde::Serialize;
use std::fmt;

/// Identity of one committed lot across DIP groups and AOI records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LotKey {
    pub model: String,
    pub year: i32,
    pub month: i32,
    pub lot: String,
}

impl LotKey {
    pub fn new(model: impl Into<String>, year: i32, month: i32, lot: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            year,
            month,
            lot: lot.into(),
        }
    }
}

impl From<&crate::entities::aoi_record::Model> for LotKey {
    fn from(record: &crate::entities::aoi_record::Model) -> Self {
        Self::new(
            record.model.clone(),
            record.order_year,
            record.order_month,
            record.lot.clone(),
        )
    }
}

impl From<&crate::entities::dip_group::Model> for LotKey {
    fn from(group: &crate::entities::dip_group::Model) -> Self {
        Self::new(group.model.clone(), group.year, group.month, group.lot.clone())
    }
}

impl fmt::Display for LotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{} lot {}", self.model, self.year, self.month, self.lot)
    }
}
