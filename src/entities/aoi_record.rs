use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Defect categories recorded by AOI operators, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DefectKind {
    Missing,
    Wrong,
    Reverse,
    Skewed,
    Flipped,
    Damaged,
    Manhattan,
    Detached,
    Cold,
    Unsoldered,
    Short,
    Lifted,
    Material,
    Dip,
}

impl DefectKind {
    pub const ALL: [DefectKind; 14] = [
        DefectKind::Missing,
        DefectKind::Wrong,
        DefectKind::Reverse,
        DefectKind::Skewed,
        DefectKind::Flipped,
        DefectKind::Damaged,
        DefectKind::Manhattan,
        DefectKind::Detached,
        DefectKind::Cold,
        DefectKind::Unsoldered,
        DefectKind::Short,
        DefectKind::Lifted,
        DefectKind::Material,
        DefectKind::Dip,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DefectKind::Missing => "missing",
            DefectKind::Wrong => "wrong",
            DefectKind::Reverse => "reverse",
            DefectKind::Skewed => "skewed",
            DefectKind::Flipped => "flipped",
            DefectKind::Damaged => "damaged",
            DefectKind::Manhattan => "manhattan",
            DefectKind::Detached => "detached",
            DefectKind::Cold => "cold",
            DefectKind::Unsoldered => "unsoldered",
            DefectKind::Short => "short",
            DefectKind::Lifted => "lifted",
            DefectKind::Material => "material",
            DefectKind::Dip => "dip",
        }
    }

    /// Key of the parallel reference-tag column, e.g. `missing_ref`.
    pub fn ref_name(self) -> String {
        format!("{}_ref", self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "aoi_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub model: String,
    pub order_year: i32,
    pub order_month: i32,
    pub lot: String,
    pub date: String,
    pub inspection_point: i32,
    pub inspection_qty: i32,
    pub missing: i32,
    pub wrong: i32,
    pub reverse: i32,
    pub skewed: i32,
    pub flipped: i32,
    pub damaged: i32,
    pub manhattan: i32,
    pub detached: i32,
    pub cold: i32,
    pub unsoldered: i32,
    pub short: i32,
    pub lifted: i32,
    pub material: i32,
    pub dip: i32,
    pub missing_ref: String,
    pub wrong_ref: String,
    pub reverse_ref: String,
    pub skewed_ref: String,
    pub flipped_ref: String,
    pub damaged_ref: String,
    pub manhattan_ref: String,
    pub detached_ref: String,
    pub cold_ref: String,
    pub unsoldered_ref: String,
    pub short_ref: String,
    pub lifted_ref: String,
    pub material_ref: String,
    pub dip_ref: String,
    pub total_defect: i32,
    pub good_qty: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if insert {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

impl Model {
    /// Zeroed record for one lot on one inspection date.
    pub fn blank(model: String, order_year: i32, order_month: i32, lot: String, date: String) -> Self {
        Self {
            id: 0,
            model,
            order_year,
            order_month,
            lot,
            date,
            inspection_point: 0,
            inspection_qty: 0,
            missing: 0,
            wrong: 0,
            reverse: 0,
            skewed: 0,
            flipped: 0,
            damaged: 0,
            manhattan: 0,
            detached: 0,
            cold: 0,
            unsoldered: 0,
            short: 0,
            lifted: 0,
            material: 0,
            dip: 0,
            missing_ref: String::new(),
            wrong_ref: String::new(),
            reverse_ref: String::new(),
            skewed_ref: String::new(),
            flipped_ref: String::new(),
            damaged_ref: String::new(),
            manhattan_ref: String::new(),
            detached_ref: String::new(),
            cold_ref: String::new(),
            unsoldered_ref: String::new(),
            short_ref: String::new(),
            lifted_ref: String::new(),
            material_ref: String::new(),
            dip_ref: String::new(),
            total_defect: 0,
            good_qty: 0,
            created_at: Utc::now(),
        }
    }

    pub fn defect_count(&self, kind: DefectKind) -> i32 {
        match kind {
            DefectKind::Missing => self.missing,
            DefectKind::Wrong => self.wrong,
            DefectKind::Reverse => self.reverse,
            DefectKind::Skewed => self.skewed,
            DefectKind::Flipped => self.flipped,
            DefectKind::Damaged => self.damaged,
            DefectKind::Manhattan => self.manhattan,
            DefectKind::Detached => self.detached,
            DefectKind::Cold => self.cold,
            DefectKind::Unsoldered => self.unsoldered,
            DefectKind::Short => self.short,
            DefectKind::Lifted => self.lifted,
            DefectKind::Material => self.material,
            DefectKind::Dip => self.dip,
        }
    }

    pub fn defect_count_mut(&mut self, kind: DefectKind) -> &mut i32 {
        match kind {
            DefectKind::Missing => &mut self.missing,
            DefectKind::Wrong => &mut self.wrong,
            DefectKind::Reverse => &mut self.reverse,
            DefectKind::Skewed => &mut self.skewed,
            DefectKind::Flipped => &mut self.flipped,
            DefectKind::Damaged => &mut self.damaged,
            DefectKind::Manhattan => &mut self.manhattan,
            DefectKind::Detached => &mut self.detached,
            DefectKind::Cold => &mut self.cold,
            DefectKind::Unsoldered => &mut self.unsoldered,
            DefectKind::Short => &mut self.short,
            DefectKind::Lifted => &mut self.lifted,
            DefectKind::Material => &mut self.material,
            DefectKind::Dip => &mut self.dip,
        }
    }

    pub fn defect_ref(&self, kind: DefectKind) -> &str {
        match kind {
            DefectKind::Missing => &self.missing_ref,
            DefectKind::Wrong => &self.wrong_ref,
            DefectKind::Reverse => &self.reverse_ref,
            DefectKind::Skewed => &self.skewed_ref,
            DefectKind::Flipped => &self.flipped_ref,
            DefectKind::Damaged => &self.damaged_ref,
            DefectKind::Manhattan => &self.manhattan_ref,
            DefectKind::Detached => &self.detached_ref,
            DefectKind::Cold => &self.cold_ref,
            DefectKind::Unsoldered => &self.unsoldered_ref,
            DefectKind::Short => &self.short_ref,
            DefectKind::Lifted => &self.lifted_ref,
            DefectKind::Material => &self.material_ref,
            DefectKind::Dip => &self.dip_ref,
        }
    }

    pub fn defect_ref_mut(&mut self, kind: DefectKind) -> &mut String {
        match kind {
            DefectKind::Missing => &mut self.missing_ref,
            DefectKind::Wrong => &mut self.wrong_ref,
            DefectKind::Reverse => &mut self.reverse_ref,
            DefectKind::Skewed => &mut self.skewed_ref,
            DefectKind::Flipped => &mut self.flipped_ref,
            DefectKind::Damaged => &mut self.damaged_ref,
            DefectKind::Manhattan => &mut self.manhattan_ref,
            DefectKind::Detached => &mut self.detached_ref,
            DefectKind::Cold => &mut self.cold_ref,
            DefectKind::Unsoldered => &mut self.unsoldered_ref,
            DefectKind::Short => &mut self.short_ref,
            DefectKind::Lifted => &mut self.lifted_ref,
            DefectKind::Material => &mut self.material_ref,
            DefectKind::Dip => &mut self.dip_ref,
        }
    }

    /// Sum of every defect count, or `None` when it does not fit an `i32`.
    pub fn checked_total_defect(&self) -> Option<i32> {
        DefectKind::ALL
            .iter()
            .try_fold(0i32, |total, kind| total.checked_add(self.defect_count(*kind)))
    }

    /// Re-derives `total_defect` and `good_qty` from the counts. Saturates
    /// rather than overflowing; callers reject such counts beforehand.
    pub fn recompute_totals(&mut self) {
        self.total_defect = self.checked_total_defect().unwrap_or(i32::MAX);
        self.good_qty = if self.inspection_qty > 0 {
            self.inspection_qty.saturating_sub(self.total_defect)
        } else {
            0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_follow_defect_counts() {
        let mut record = Model::blank("AX-100".into(), 2025, 11, "500".into(), "2025-11-03".into());
        record.inspection_qty = 200;
        *record.defect_count_mut(DefectKind::Missing) = 3;
        *record.defect_count_mut(DefectKind::Dip) = 2;
        record.recompute_totals();
        assert_eq!(record.total_defect, 5);
        assert_eq!(record.good_qty, 195);

        record.inspection_qty = 0;
        record.recompute_totals();
        assert_eq!(record.good_qty, 0);
    }

    #[test]
    fn oversized_counts_saturate_instead_of_overflowing() {
        let mut record = Model::blank("AX-100".into(), 2025, 11, "500".into(), "2025-11-03".into());
        record.inspection_qty = 10;
        *record.defect_count_mut(DefectKind::Missing) = 2_000_000_000;
        *record.defect_count_mut(DefectKind::Wrong) = 2_000_000_000;
        assert_eq!(record.checked_total_defect(), None);

        record.recompute_totals();
        assert_eq!(record.total_defect, i32::MAX);
        assert_eq!(record.good_qty, 10 - i32::MAX);
    }

    #[test]
    fn ref_names_follow_column_names() {
        assert_eq!(DefectKind::Unsoldered.ref_name(), "unsoldered_ref");
        assert_eq!(DefectKind::ALL.len(), 14);
        assert_eq!(DefectKind::ALL[0], DefectKind::Missing);
        assert_eq!(DefectKind::ALL[13], DefectKind::Dip);
    }
}
