use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    /// Paystack secret key ("sk_test_..." / "sk_live_..."). Also the HMAC
    /// key for webhook signatures.
    pub gateway_secret_key: String,
    /// Gateway API base, overridable for local stubs.
    pub gateway_base_url: String,
    /// Referrer commission as a percentage of the verified amount.
    pub referral_commission_percent: i64,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("COURSEPAY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "coursepay.db".to_string()),
            base_url,
            gateway_secret_key: env::var("GATEWAY_SECRET_KEY").unwrap_or_default(),
            gateway_base_url: env::var("GATEWAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".to_string()),
            referral_commission_percent: env::var("REFERRAL_COMMISSION_PERCENT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
