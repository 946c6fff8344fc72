//! DB storage for generated image metadata
#![allow(missing_docs)]

use std::collections::HashMap;

use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, QuerySelect};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "images")]
/// One generated image
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip)]
    /// db id
    pub id: i32,
    #[sea_orm(unique)]
    /// file name inside the image directory
    pub filename: String,
    /// prompt the image was generated from
    pub prompt: String,
    /// pixels, 0 when the header couldn't be read
    pub width: i32,
    /// pixels, 0 when the header couldn't be read
    pub height: i32,
    /// bytes on disk
    pub file_size: i64,
    /// creation time, `YYYY-mm-dd HH:MM:SS` local time
    pub created_time: String,
    /// creation time as fractional unix seconds
    pub created_timestamp: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// All rows, most recently created first
    pub async fn newest_first<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, DbErr> {
        Self::find()
            .order_by_desc(Column::CreatedTimestamp)
            .all(db)
            .await
    }

    /// Looks up a row by filename
    pub async fn find_by_filename<C: ConnectionTrait>(
        db: &C,
        filename: &str,
    ) -> Result<Option<Model>, DbErr> {
        Self::find()
            .filter(Column::Filename.eq(filename))
            .one(db)
            .await
    }

    /// filename -> prompt for every row
    pub async fn prompts_by_filename<C: ConnectionTrait>(
        db: &C,
    ) -> Result<HashMap<String, String>, DbErr> {
        let rows: Vec<(String, String)> = Self::find()
            .select_only()
            .column(Column::Filename)
            .column(Column::Prompt)
            .into_tuple()
            .all(db)
            .await?;
        Ok(rows.into_iter().collect())
    }

    /// Removes the row for `filename`, returning how many rows went
    pub async fn delete_by_filename<C: ConnectionTrait>(
        db: &C,
        filename: &str,
    ) -> Result<u64, DbErr> {
        Ok(Self::delete_many()
            .filter(Column::Filename.eq(filename))
            .exec(db)
            .await?
            .rows_affected)
    }
}
