use sea_orm::entity::prelude::*;

/// The `username` and `email` columns are declared `COLLATE NOCASE` with
/// UNIQUE constraints in the migration SQL, so case-insensitive uniqueness
/// and case-insensitive equality filters are enforced by the store itself
/// while the stored casing is preserved.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// UUIDv4, assigned at creation, immutable.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub username: String,

    pub email: String,

    /// Argon2id password digest (PHC string)
    pub password_hash: String,

    /// Capability tags, stored as a JSON array of strings
    pub features: Json,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
