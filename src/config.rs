use std::env;
use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    /// The two cities every ride runs between
    pub locations: [String; 2],
    /// Offset used to decide which rides have already departed today
    pub service_utc_offset_minutes: i32,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    /// Attempts the database ledger makes before giving up on a contended ride
    pub reservation_max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let locations = env::var("LOCATIONS").unwrap_or_else(|_| "Kathmandu,Pokhara".to_string());
        let locations = parse_locations(&locations).expect("LOCATIONS must name two distinct cities");

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            locations,
            service_utc_offset_minutes: env::var("SERVICE_UTC_OFFSET_MINUTES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .expect("SERVICE_UTC_OFFSET_MINUTES must be a number"),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| "5242880".to_string())
                .parse()
                .expect("MAX_UPLOAD_BYTES must be a number"),
            reservation_max_attempts: env::var("RESERVATION_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("RESERVATION_MAX_ATTEMPTS must be a number"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn service_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.service_utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn is_known_location(&self, name: &str) -> bool {
        self.locations.iter().any(|l| l == name)
    }
}

fn parse_locations(raw: &str) -> Option<[String; 2]> {
    let names: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    match names.as_slice() {
        [a, b] if a != b => Some([a.clone(), b.clone()]),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: "test-secret".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        locations: ["Kathmandu".to_string(), "Pokhara".to_string()],
        service_utc_offset_minutes: 0,
        upload_dir: std::env::temp_dir(),
        public_base_url: "http://localhost:3000".to_string(),
        max_upload_bytes: 1024,
        reservation_max_attempts: 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locations() {
        assert_eq!(
            parse_locations(" Kathmandu , Pokhara "),
            Some(["Kathmandu".to_string(), "Pokhara".to_string()])
        );
        assert_eq!(parse_locations("Kathmandu"), None);
        assert_eq!(parse_locations("Kathmandu,Kathmandu"), None);
        assert_eq!(parse_locations("A,B,C"), None);
    }
}
