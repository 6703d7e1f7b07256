use betboard_api::clock::ReferenceZone;
use betboard_api::client::DEFAULT_BASE_URL;
use betboard_api::{ParticipantId, TournamentId};
use log::{LevelFilter, warn};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_REFRESH_SECS: u64 = 30;
const MIN_REFRESH_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: Option<LevelFilter>,
    pub api_url: String,
    /// Tournament to open on startup; falls back to saved prefs, then the
    /// first unfinished tournament in the list.
    pub tournament: Option<TournamentId>,
    /// The signed-in participant. Needed for hidden-bet reveal and betting.
    pub user_id: Option<ParticipantId>,
    pub reference_zone: ReferenceZone,
    pub refresh_interval: Duration,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            full_screen: false,
            log_level: None,
            api_url: DEFAULT_BASE_URL.to_string(),
            tournament: None,
            user_id: None,
            reference_zone: ReferenceZone::default(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
        }
    }
}

impl AppSettings {
    /// Read `BETBOARD_*` variables, after merging a `.env` file if present.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Self::default();

        if let Some(url) = get("BETBOARD_API_URL") {
            settings.api_url = url.trim_end_matches('/').to_string();
        }
        settings.tournament = get("BETBOARD_TOURNAMENT").and_then(|v| parse_or_warn("BETBOARD_TOURNAMENT", &v));
        settings.user_id = get("BETBOARD_USER_ID").and_then(|v| parse_or_warn("BETBOARD_USER_ID", &v));

        if let Some(raw) = get("BETBOARD_REFERENCE_OFFSET") {
            match ReferenceZone::parse(&raw) {
                Some(zone) => settings.reference_zone = zone,
                None => warn!("ignoring BETBOARD_REFERENCE_OFFSET={raw:?}: expected e.g. +03:00"),
            }
        }
        if let Some(secs) = get("BETBOARD_REFRESH_SECS").and_then(|v| parse_or_warn::<u64>("BETBOARD_REFRESH_SECS", &v)) {
            settings.refresh_interval = Duration::from_secs(secs.max(MIN_REFRESH_SECS));
        }
        settings.log_level = get("BETBOARD_LOG").and_then(|v| parse_or_warn("BETBOARD_LOG", &v));

        settings
    }
}

fn parse_or_warn<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring {key}={raw:?}: not a valid value");
            None
        }
    }
}

/// `$XDG_CONFIG_HOME/betboard/<file>`, else `$HOME/.config/betboard/<file>`.
pub fn config_path(file: &str) -> PathBuf {
    if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME")
        && !config_dir.trim().is_empty()
    {
        return PathBuf::from(config_dir).join("betboard").join(file);
    }
    if let Ok(home) = std::env::var("HOME")
        && !home.trim().is_empty()
    {
        return PathBuf::from(home).join(".config").join("betboard").join(file);
    }
    PathBuf::from(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> AppSettings {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let s = settings_from(&[]);
        assert_eq!(s.api_url, "http://localhost:8000/api");
        assert_eq!(s.tournament, None);
        assert_eq!(s.user_id, None);
        assert_eq!(s.reference_zone, ReferenceZone::default());
        assert_eq!(s.refresh_interval, Duration::from_secs(30));
        assert_eq!(s.log_level, None);
    }

    #[test]
    fn reads_every_variable() {
        let s = settings_from(&[
            ("BETBOARD_API_URL", "https://bets.example.org/api/"),
            ("BETBOARD_TOURNAMENT", "4"),
            ("BETBOARD_USER_ID", " 17 "),
            ("BETBOARD_REFERENCE_OFFSET", "+01:00"),
            ("BETBOARD_REFRESH_SECS", "60"),
            ("BETBOARD_LOG", "debug"),
        ]);
        assert_eq!(s.api_url, "https://bets.example.org/api");
        assert_eq!(s.tournament, Some(4));
        assert_eq!(s.user_id, Some(17));
        assert_eq!(s.reference_zone, ReferenceZone::from_offset_secs(3600).unwrap());
        assert_eq!(s.refresh_interval, Duration::from_secs(60));
        assert_eq!(s.log_level, Some(LevelFilter::Debug));
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let s = settings_from(&[
            ("BETBOARD_USER_ID", "ann"),
            ("BETBOARD_REFERENCE_OFFSET", "Europe/Moscow"),
            ("BETBOARD_LOG", "chatty"),
            ("BETBOARD_API_URL", "   "),
        ]);
        assert_eq!(s.user_id, None);
        assert_eq!(s.reference_zone, ReferenceZone::default());
        assert_eq!(s.log_level, None);
        assert_eq!(s.api_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn refresh_interval_has_a_floor() {
        let s = settings_from(&[("BETBOARD_REFRESH_SECS", "1")]);
        assert_eq!(s.refresh_interval, Duration::from_secs(5));
    }
}
