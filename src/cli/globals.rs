use secrecy::SecretString;
use url::Url;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub session_secret: SecretString,
    pub public_base_url: String,
    pub notify_url: Option<Url>,
    pub session_ttl_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub email_token_ttl_seconds: i64,
    pub list_include_inactive: bool,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(session_secret: SecretString) -> Self {
        Self {
            session_secret,
            public_base_url: "http://localhost:8080".to_string(),
            notify_url: None,
            session_ttl_seconds: 28_800,
            reset_token_ttl_seconds: 1_800,
            email_token_ttl_seconds: 1_800,
            list_include_inactive: false,
        }
    }
}
