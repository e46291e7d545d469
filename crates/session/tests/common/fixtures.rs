#![allow(dead_code)]

use warden_session::SignInRequest;

pub const DEMO_EMAIL: &str = "demo@warden.dev";
pub const DEMO_PASSWORD: &str = "Secret1";

pub fn sample_sign_in_request(keep_logged_in: bool) -> SignInRequest {
    SignInRequest {
        email: DEMO_EMAIL.to_string(),
        password: DEMO_PASSWORD.to_string(),
        keep_logged_in,
    }
}

pub fn wrong_password_request() -> SignInRequest {
    SignInRequest {
        email: DEMO_EMAIL.to_string(),
        password: "not-the-password".to_string(),
        keep_logged_in: false,
    }
}
