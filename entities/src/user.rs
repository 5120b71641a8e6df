use sea_orm::entity::prelude::*;

/// A learner account, identified to the API by its bearer token.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub api_token: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::scenario_progress::Entity")]
    ScenarioProgress,
}

impl Related<super::scenario_progress::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScenarioProgress.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
