use std::env;
use std::str::FromStr;
use tracing::warn;

/// Which persistence backend the API wires its stores to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Supabase,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" => Ok(StoreBackend::Memory),
            "supabase" | "postgrest" => Ok(StoreBackend::Supabase),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub supabase_service_role_key: String,
    pub cloudflare_realtime_app_id: String,
    pub cloudflare_realtime_api_token: String,
    pub cloudflare_realtime_base_url: String,
    pub store_backend: StoreBackend,
    pub room_token_secret: String,
    pub notification_channel_capacity: usize,
    pub notification_cleanup_interval_secs: u64,
    pub port: u16,
    pub min_appointment_minutes: i32,
    pub max_appointment_minutes: i32,
    pub default_appointment_minutes: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            supabase_service_role_key: String::new(),
            cloudflare_realtime_app_id: String::new(),
            cloudflare_realtime_api_token: String::new(),
            cloudflare_realtime_base_url: "https://rtc.live.cloudflare.com/v1".to_string(),
            store_backend: StoreBackend::Memory,
            room_token_secret: String::new(),
            notification_channel_capacity: 100,
            notification_cleanup_interval_secs: 300,
            port: 3000,
            min_appointment_minutes: 10,
            max_appointment_minutes: 180,
            default_appointment_minutes: 30,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let supabase_jwt_secret = env::var("SUPABASE_JWT_SECRET")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_JWT_SECRET not set, using empty value");
                String::new()
            });

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            cloudflare_realtime_app_id: env::var("CLOUDFLARE_REALTIME_APP_ID")
                .unwrap_or_else(|_| {
                    warn!("CLOUDFLARE_REALTIME_APP_ID not set, using empty value");
                    String::new()
                }),
            cloudflare_realtime_api_token: env::var("CLOUDFLARE_REALTIME_API_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("CLOUDFLARE_REALTIME_API_TOKEN not set, using empty value");
                    String::new()
                }),
            cloudflare_realtime_base_url: env::var("CLOUDFLARE_REALTIME_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("CLOUDFLARE_REALTIME_BASE_URL not set, using default");
                    defaults.cloudflare_realtime_base_url.clone()
                }),
            store_backend: env::var("STORE_BACKEND")
                .ok()
                .and_then(|raw| {
                    raw.parse()
                        .map_err(|e| warn!("{}, falling back to in-memory store", e))
                        .ok()
                })
                .unwrap_or(defaults.store_backend),
            room_token_secret: env::var("ROOM_TOKEN_SECRET")
                .unwrap_or_else(|_| supabase_jwt_secret.clone()),
            supabase_jwt_secret,
            notification_channel_capacity: parse_or("NOTIFICATION_CHANNEL_CAPACITY", defaults.notification_channel_capacity),
            notification_cleanup_interval_secs: parse_or(
                "NOTIFICATION_CLEANUP_INTERVAL_SECS",
                defaults.notification_cleanup_interval_secs,
            )
            .max(1),
            port: parse_or("PORT", defaults.port),
            min_appointment_minutes: parse_or("MIN_APPOINTMENT_MINUTES", defaults.min_appointment_minutes),
            max_appointment_minutes: parse_or("MAX_APPOINTMENT_MINUTES", defaults.max_appointment_minutes),
            default_appointment_minutes: parse_or("DEFAULT_APPOINTMENT_MINUTES", defaults.default_appointment_minutes),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
            && (self.store_backend == StoreBackend::Memory || self.is_store_configured())
    }

    pub fn is_store_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_role_key.is_empty()
    }

    pub fn is_video_conferencing_configured(&self) -> bool {
        !self.cloudflare_realtime_app_id.is_empty()
            && !self.cloudflare_realtime_api_token.is_empty()
            && !self.cloudflare_realtime_base_url.is_empty()
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_known_names() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!(" Supabase ".parse::<StoreBackend>(), Ok(StoreBackend::Supabase));
        assert!("mysql".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn memory_backend_only_needs_jwt_secret() {
        let config = AppConfig {
            supabase_jwt_secret: "secret".to_string(),
            ..AppConfig::default()
        };
        assert!(config.is_configured());
        assert!(!config.is_video_conferencing_configured());

        let supabase = AppConfig {
            store_backend: StoreBackend::Supabase,
            ..config
        };
        assert!(!supabase.is_configured());
    }
}
