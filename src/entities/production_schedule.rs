use crate::models::LotQuantity;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Production-line role of a schedule row in double-sided assembly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum TbType {
    #[sea_orm(string_value = "Top")]
    #[serde(rename = "Top")]
    Top,
    #[sea_orm(string_value = "Bot")]
    #[serde(rename = "Bot")]
    Bot,
    /// Top side produced on an overflow (outsourced) line.
    #[sea_orm(string_value = "T/O")]
    #[serde(rename = "T/O")]
    TopOverflow,
    /// Bottom side produced on an overflow (outsourced) line.
    #[sea_orm(string_value = "B/O")]
    #[serde(rename = "B/O")]
    BottomOverflow,
}

impl TbType {
    pub fn label(self) -> &'static str {
        match self {
            TbType::Top => "Top",
            TbType::Bot => "Bot",
            TbType::TopOverflow => "T/O",
            TbType::BottomOverflow => "B/O",
        }
    }

    /// Parses an operator label; a blank label means "not assigned".
    pub fn parse_label(raw: &str) -> Result<Option<Self>, String> {
        match raw.trim() {
            "" => Ok(None),
            "Top" => Ok(Some(TbType::Top)),
            "Bot" => Ok(Some(TbType::Bot)),
            "T/O" => Ok(Some(TbType::TopOverflow)),
            "B/O" => Ok(Some(TbType::BottomOverflow)),
            other => Err(format!(
                "unknown tb type '{}', expected one of Top, Bot, T/O, B/O",
                other
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "production_schedules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub prod_year: i32,
    pub prod_month: i32,
    pub prod_week: i32,
    pub line: String,
    pub company: Option<String>,
    pub model: String,
    pub order_year: Option<i32>,
    pub order_month: Option<i32>,
    pub tb: Option<TbType>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub manager: Option<String>,
    pub actual_prod: i32,
    pub actual_start_date: Option<String>,
    pub actual_end_date: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub batch_quantity: i32,
    pub total_quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn lot(&self) -> LotQuantity {
        LotQuantity::new(self.batch_quantity, self.total_quantity)
    }
}
