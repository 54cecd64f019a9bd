pub mod auth;

pub use auth::{identify_requester, staff_only, Claims};
