pub mod auth;

pub use auth::{
    create_access_token, create_refresh_token, hash_password, verify_access_token,
    verify_password, verify_refresh_token,
};
