use crate::{EngineError, Fixture, FixtureId};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use std::fmt;

/// Offset the tournament operates in. Upstream schedules in UTC+03:00.
pub const DEFAULT_REFERENCE_OFFSET_SECS: i32 = 3 * 3600;

/// The single timezone every kickoff comparison is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone(FixedOffset);

impl Default for ReferenceZone {
    fn default() -> Self {
        Self::from_offset_secs(DEFAULT_REFERENCE_OFFSET_SECS).unwrap_or_else(Self::utc)
    }
}

impl ReferenceZone {
    pub fn utc() -> Self {
        Self(Utc.fix())
    }

    pub fn from_offset_secs(secs: i32) -> Option<Self> {
        FixedOffset::east_opt(secs).map(Self)
    }

    /// Parse `+03:00`, `-0530`, `+3`, `Z` or `UTC`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
            return Some(Self::utc());
        }

        let (sign, rest) = match raw.split_at_checked(1)? {
            ("+", rest) => (1, rest),
            ("-", rest) => (-1, rest),
            _ => return None,
        };
        let (hours, minutes) = match rest.split_once(':') {
            Some((h, m)) => (h, m),
            None if rest.len() == 4 => rest.split_at(2),
            None => (rest, "0"),
        };
        let hours: i32 = hours.parse().ok()?;
        let minutes: i32 = minutes.parse().ok()?;
        if !(0..60).contains(&minutes) {
            return None;
        }
        Self::from_offset_secs(sign * (hours * 3600 + minutes * 60))
    }

    pub fn offset(&self) -> FixedOffset {
        self.0
    }

    /// Express an instant in the reference timezone. Every comparison the
    /// clock makes goes through here.
    pub fn normalize<Tz: chrono::TimeZone>(&self, instant: &DateTime<Tz>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.0)
    }
}

impl fmt::Display for ReferenceZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UTC{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    Upcoming,
    Live,
    Finished,
}

impl GameState {
    /// Only upcoming fixtures take new bets or edits.
    pub fn accepts_bets(&self) -> bool {
        matches!(self, GameState::Upcoming)
    }

    pub fn label(&self) -> &'static str {
        match self {
            GameState::Upcoming => "upcoming",
            GameState::Live => "live",
            GameState::Finished => "finished",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single "now" sample in the reference timezone.
///
/// Take one per render pass and judge every fixture of that pass against it,
/// so no fixture flips from upcoming to live halfway through a draw.
#[derive(Debug, Clone, Copy)]
pub struct GameClock {
    now: DateTime<FixedOffset>,
    zone: ReferenceZone,
}

impl GameClock {
    pub fn sample(zone: ReferenceZone) -> Self {
        Self::at(Utc::now(), zone)
    }

    pub fn at<Tz: chrono::TimeZone>(now: DateTime<Tz>, zone: ReferenceZone) -> Self {
        Self { now: zone.normalize(&now), zone }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    pub fn zone(&self) -> ReferenceZone {
        self.zone
    }

    pub fn state(&self, start: DateTime<Utc>, finished: bool) -> GameState {
        if finished {
            return GameState::Finished;
        }
        if self.now < self.zone.normalize(&start) {
            GameState::Upcoming
        } else {
            GameState::Live
        }
    }

    pub fn state_of(&self, fixture: &Fixture) -> GameState {
        self.state(fixture.start_time, fixture.finished)
    }

    /// Time left before kickoff, `None` once the fixture is no longer upcoming.
    pub fn until_kickoff(&self, fixture: &Fixture) -> Option<TimeDelta> {
        if !self.state_of(fixture).accepts_bets() {
            return None;
        }
        Some(self.zone.normalize(&fixture.start_time) - self.now)
    }

    /// Reject bet writes on fixtures that have kicked off.
    pub fn ensure_open(&self, fixture: &Fixture) -> Result<(), EngineError> {
        let state = self.state_of(fixture);
        if state.accepts_bets() {
            Ok(())
        } else {
            Err(EngineError::BettingClosed { fixture_id: fixture.id, state })
        }
    }
}

/// Parse a kickoff timestamp. Timestamps carrying an offset are taken as is;
/// naive ones are wall-clock time in the reference zone, the way the service
/// stores them.
pub fn parse_start_instant(
    fixture_id: FixtureId,
    raw: &str,
    zone: ReferenceZone,
) -> Result<DateTime<Utc>, EngineError> {
    let trimmed = raw.trim();
    let parsed = DateTime::parse_from_rfc3339(trimmed)
        .or_else(|_| DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%:z"));
    if let Ok(dt) = parsed {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| EngineError::MalformedStartTime { fixture_id, raw: raw.to_owned() })?;

    zone.offset()
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| EngineError::AmbiguousStartTime { fixture_id, raw: raw.to_owned() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::fixture;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn state_before_at_and_after_kickoff() {
        let start = at(15, 0, 0);
        let zone = ReferenceZone::default();
        assert_eq!(GameClock::at(at(14, 59, 59), zone).state(start, false), GameState::Upcoming);
        assert_eq!(GameClock::at(at(15, 0, 1), zone).state(start, false), GameState::Live);
    }

    #[test]
    fn kickoff_instant_itself_is_live() {
        let start = at(15, 0, 0);
        let clock = GameClock::at(start, ReferenceZone::default());
        assert_eq!(clock.state(start, false), GameState::Live);
    }

    #[test]
    fn finished_flag_overrides_time() {
        let start = at(15, 0, 0);
        for now in [at(9, 0, 0), at(15, 0, 0), at(23, 0, 0)] {
            let clock = GameClock::at(now, ReferenceZone::utc());
            assert_eq!(clock.state(start, true), GameState::Finished);
        }
    }

    #[test]
    fn now_in_other_offset_is_normalized_before_comparing() {
        // 17:59:59 at UTC+03:00 is 14:59:59Z.
        let moscow = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = moscow.with_ymd_and_hms(2024, 3, 1, 17, 59, 59).unwrap();
        let clock = GameClock::at(now, ReferenceZone::utc());
        assert_eq!(clock.state(at(15, 0, 0), false), GameState::Upcoming);
        assert_eq!(clock.now().offset(), &Utc.fix());
    }

    #[test]
    fn only_upcoming_accepts_bets() {
        assert!(GameState::Upcoming.accepts_bets());
        assert!(!GameState::Live.accepts_bets());
        assert!(!GameState::Finished.accepts_bets());
    }

    #[test]
    fn ensure_open_rejects_started_fixture() {
        let f = fixture(4, at(15, 0, 0), None);
        let before = GameClock::at(at(14, 0, 0), ReferenceZone::default());
        let after = GameClock::at(at(16, 0, 0), ReferenceZone::default());
        assert!(before.ensure_open(&f).is_ok());
        assert_eq!(
            after.ensure_open(&f),
            Err(EngineError::BettingClosed { fixture_id: 4, state: GameState::Live })
        );
    }

    #[test]
    fn until_kickoff_counts_down_for_upcoming_only() {
        let f = fixture(4, at(15, 0, 0), None);
        let clock = GameClock::at(at(14, 30, 0), ReferenceZone::default());
        assert_eq!(clock.until_kickoff(&f), Some(TimeDelta::minutes(30)));
        let late = GameClock::at(at(15, 30, 0), ReferenceZone::default());
        assert_eq!(late.until_kickoff(&f), None);
    }

    #[test]
    fn parse_start_instant_normalizes_offsets() {
        let zone = ReferenceZone::default();
        let utc = parse_start_instant(1, "2024-03-01T15:00:00Z", zone).unwrap();
        let moscow = parse_start_instant(1, "2024-03-01T18:00:00+03:00", zone).unwrap();
        let spaced = parse_start_instant(1, "2024-03-01 18:00:00+03:00", zone).unwrap();
        assert_eq!(utc, at(15, 0, 0));
        assert_eq!(moscow, utc);
        assert_eq!(spaced, utc);
        // An explicit offset wins over the reference zone.
        assert_eq!(parse_start_instant(1, "2024-03-01T15:00:00Z", ReferenceZone::utc()).unwrap(), utc);
    }

    #[test]
    fn naive_timestamps_are_reference_zone_wall_clock() {
        let zone = ReferenceZone::parse("+03:00").unwrap();
        assert_eq!(parse_start_instant(5, "2024-03-01T18:00:00", zone).unwrap(), at(15, 0, 0));
        assert_eq!(parse_start_instant(5, "2024-03-01 18:00:00.000", zone).unwrap(), at(15, 0, 0));
        assert_eq!(
            parse_start_instant(5, "2024-03-01T18:00:00", ReferenceZone::utc()).unwrap(),
            at(18, 0, 0)
        );
    }

    #[test]
    fn parse_start_instant_rejects_garbage() {
        let err = parse_start_instant(9, "tomorrow", ReferenceZone::default()).unwrap_err();
        assert!(matches!(err, EngineError::MalformedStartTime { fixture_id: 9, .. }));
        let err = parse_start_instant(9, "2024-03-01", ReferenceZone::default()).unwrap_err();
        assert!(matches!(err, EngineError::MalformedStartTime { fixture_id: 9, .. }));
    }

    #[test]
    fn reference_zone_parsing() {
        assert_eq!(ReferenceZone::parse("+03:00"), ReferenceZone::from_offset_secs(10_800));
        assert_eq!(ReferenceZone::parse("-0530"), ReferenceZone::from_offset_secs(-19_800));
        assert_eq!(ReferenceZone::parse("+3"), ReferenceZone::from_offset_secs(10_800));
        assert_eq!(ReferenceZone::parse("UTC"), Some(ReferenceZone::utc()));
        assert_eq!(ReferenceZone::parse("Moscow"), None);
        assert_eq!(ReferenceZone::default().to_string(), "UTC+03:00");
    }
}
