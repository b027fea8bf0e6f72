use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(FromRow, Debug, Clone)]
pub struct Slot {
    pub value: String,
    pub updated: OffsetDateTime,
}
