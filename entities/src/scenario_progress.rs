use sea_orm::entity::prelude::*;

/// Server-side progress for one `(user, scenario)` pair.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "scenario_progress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub scenario_id: String,
    pub status: String,
    pub progress: f64,
    /// JSON array of stage names, first-seen order
    pub completed_stages: Json,
    pub score: Option<f64>,
    pub time_spent: i64,
    pub feedback: Option<String>,
    pub start_date: DateTimeUtc,
    pub completion_date: Option<DateTimeUtc>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
