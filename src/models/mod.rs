pub mod company;
pub mod tenant;
pub mod user;

pub use company::Company;
pub use tenant::Tenant;
pub use user::User;
