use serde::Deserialize;

/// Email and password as posted by the login and sign-up forms
#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}
