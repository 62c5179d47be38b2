pub mod auth;

pub use auth::{
    optional_auth, require_auth, require_company, require_role, CompanyFilter, CurrentUser,
    MaybeUser, RoleFilter,
};
