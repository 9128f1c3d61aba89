use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "domains")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
    pub extension: String,
    pub niche: Option<String>,
    pub traffic: i64,
    pub referring_domains: i64,
    pub status: String,
    pub previous_status: String,
    pub last_checked: Option<String>,
    pub last_available: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::check_log::Entity")]
    CheckLog,
    #[sea_orm(has_many = "super::notification::Entity")]
    Notification,
}

impl Related<super::check_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckLog.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notification.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
