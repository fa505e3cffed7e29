use chrono::{DateTime, Utc};
use std::fmt;

use crate::query::{FieldValue, Row};

// Margin rules live inside this band; the store rejects anything outside
// it, both at load time and when a rule is created.
pub const MARGIN_MIN_PCT: f64 = 0.5;
pub const MARGIN_MAX_PCT: f64 = 25.0;

pub fn margin_in_band(pct: f64) -> bool {
    (MARGIN_MIN_PCT..=MARGIN_MAX_PCT).contains(&pct)
}

pub(crate) fn fmt_pct(pct: f64) -> String {
    FieldValue::number(pct).render()
}

/// The five tabular views of the desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeskView {
    Fixtures,
    Alerts,
    Margins,
    Models,
    Audit,
}

impl DeskView {
    pub const ALL: [DeskView; 5] = [
        DeskView::Fixtures,
        DeskView::Alerts,
        DeskView::Margins,
        DeskView::Models,
        DeskView::Audit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DeskView::Fixtures => "Fixtures",
            DeskView::Alerts => "Odds Alerts",
            DeskView::Margins => "Margin Rules",
            DeskView::Models => "Pricing Models",
            DeskView::Audit => "Audit Log",
        }
    }

    pub fn from_name(name: &str) -> Option<DeskView> {
        match name.to_lowercase().as_str() {
            "fixtures" => Some(DeskView::Fixtures),
            "alerts" => Some(DeskView::Alerts),
            "margins" => Some(DeskView::Margins),
            "models" => Some(DeskView::Models),
            "audit" => Some(DeskView::Audit),
            _ => None,
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            DeskView::Fixtures => Fixture::COLUMNS,
            DeskView::Alerts => OddsAlert::COLUMNS,
            DeskView::Margins => MarginRule::COLUMNS,
            DeskView::Models => PricingModel::COLUMNS,
            DeskView::Audit => AuditEvent::COLUMNS,
        }
    }

    pub fn index(&self) -> usize {
        DeskView::ALL
            .iter()
            .position(|view| view == self)
            .unwrap_or(0)
    }
}

impl fmt::Display for DeskView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sport {
    Soccer,
    Basketball,
    Tennis,
    IceHockey,
}

impl Sport {
    pub const ALL: [Sport; 4] = [
        Sport::Soccer,
        Sport::Basketball,
        Sport::Tennis,
        Sport::IceHockey,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Sport::Soccer => "Soccer",
            Sport::Basketball => "Basketball",
            Sport::Tennis => "Tennis",
            Sport::IceHockey => "Ice Hockey",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    MatchResult,
    Moneyline,
    OverUnder,
    Handicap,
}

impl Market {
    pub const ALL: [Market; 4] = [
        Market::MatchResult,
        Market::Moneyline,
        Market::OverUnder,
        Market::Handicap,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Market::MatchResult => "1X2",
            Market::Moneyline => "Moneyline",
            Market::OverUnder => "Over/Under",
            Market::Handicap => "Handicap",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureStatus {
    Open,
    Suspended,
    Settled,
}

impl FixtureStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FixtureStatus::Open => "Open",
            FixtureStatus::Suspended => "Suspended",
            FixtureStatus::Settled => "Settled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Active,
    Acked,
}

impl AlertStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AlertStatus::Active => "Active",
            AlertStatus::Acked => "Acked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    Enabled,
    Disabled,
}

impl ModelStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ModelStatus::Enabled => "Enabled",
            ModelStatus::Disabled => "Disabled",
        }
    }
}

// Anything the desk can show as a table: a fixed column schema plus the
// projection of one record into a display row. Projections are rebuilt
// from the owning collection on every pipeline run.
pub trait Tabular {
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> u32;
    fn row(&self) -> Row;
}

#[derive(Debug, Clone)]
pub struct Fixture {
    pub id: u32,
    pub sport: Sport,
    pub competition: String,
    pub home: String,
    pub away: String,
    pub kickoff: DateTime<Utc>,
    pub status: FixtureStatus,
}

impl Fixture {
    pub fn name(&self) -> String {
        format!("{} v {}", self.home, self.away)
    }
}

impl Tabular for Fixture {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "sport",
        "competition",
        "home",
        "away",
        "kickoff",
        "status",
    ];

    fn id(&self) -> u32 {
        self.id
    }

    fn row(&self) -> Row {
        Row::new()
            .cell("id", FieldValue::number(self.id as f64))
            .cell("sport", FieldValue::tag(self.sport.label()))
            .cell("competition", FieldValue::text(self.competition.clone()))
            .cell("home", FieldValue::text(self.home.clone()))
            .cell("away", FieldValue::text(self.away.clone()))
            .cell(
                "kickoff",
                FieldValue::text(self.kickoff.format("%Y-%m-%d %H:%M").to_string()),
            )
            .cell("status", FieldValue::tag(self.status.label()))
    }
}

#[derive(Debug, Clone)]
pub struct OddsAlert {
    pub id: u32,
    pub fixture: String,
    pub market: Market,
    pub movement_pct: f64,
    pub severity: Severity,
    pub status: AlertStatus,
}

impl Tabular for OddsAlert {
    const COLUMNS: &'static [&'static str] =
        &["id", "fixture", "market", "movement", "severity", "status"];

    fn id(&self) -> u32 {
        self.id
    }

    fn row(&self) -> Row {
        Row::new()
            .cell("id", FieldValue::number(self.id as f64))
            .cell("fixture", FieldValue::text(self.fixture.clone()))
            .cell("market", FieldValue::tag(self.market.label()))
            .cell("movement", FieldValue::number(self.movement_pct))
            .cell("severity", FieldValue::tag(self.severity.label()))
            .cell("status", FieldValue::tag(self.status.label()))
    }
}

#[derive(Debug, Clone)]
pub struct MarginRule {
    pub id: u32,
    pub sport: Sport,
    pub market: Market,
    pub margin_pct: f64,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl MarginRule {
    pub fn scope(&self) -> (Sport, Market) {
        (self.sport, self.market)
    }
}

impl Tabular for MarginRule {
    const COLUMNS: &'static [&'static str] = &["id", "sport", "market", "margin", "by", "updated"];

    fn id(&self) -> u32 {
        self.id
    }

    fn row(&self) -> Row {
        Row::new()
            .cell("id", FieldValue::number(self.id as f64))
            .cell("sport", FieldValue::tag(self.sport.label()))
            .cell("market", FieldValue::tag(self.market.label()))
            .cell("margin", FieldValue::number(self.margin_pct))
            .cell("by", FieldValue::text(self.updated_by.clone()))
            .cell(
                "updated",
                FieldValue::text(self.updated_at.format("%Y-%m-%d %H:%M").to_string()),
            )
    }
}

#[derive(Debug, Clone)]
pub struct PricingModel {
    pub id: u32,
    pub name: String,
    pub sport: Sport,
    pub version: String,
    pub status: ModelStatus,
    pub calibrated_at: DateTime<Utc>,
}

impl Tabular for PricingModel {
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "sport", "version", "status", "calibrated"];

    fn id(&self) -> u32 {
        self.id
    }

    fn row(&self) -> Row {
        Row::new()
            .cell("id", FieldValue::number(self.id as f64))
            .cell("name", FieldValue::text(self.name.clone()))
            .cell("sport", FieldValue::tag(self.sport.label()))
            .cell("version", FieldValue::text(self.version.clone()))
            .cell("status", FieldValue::tag(self.status.label()))
            .cell(
                "calibrated",
                FieldValue::text(self.calibrated_at.format("%Y-%m-%d").to_string()),
            )
    }
}

// Append-only; produced by the store on every mutation, never edited.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub id: u32,
    pub at: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub detail: String,
}

impl Tabular for AuditEvent {
    const COLUMNS: &'static [&'static str] = &["id", "time", "actor", "action", "entity", "detail"];

    fn id(&self) -> u32 {
        self.id
    }

    fn row(&self) -> Row {
        Row::new()
            .cell("id", FieldValue::number(self.id as f64))
            .cell(
                "time",
                FieldValue::text(self.at.format("%Y-%m-%d %H:%M:%S").to_string()),
            )
            .cell("actor", FieldValue::text(self.actor.clone()))
            .cell("action", FieldValue::tag(self.action.clone()))
            .cell("entity", FieldValue::text(self.entity.clone()))
            .cell("detail", FieldValue::text(self.detail.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_fixture() -> Fixture {
        Fixture {
            id: 7,
            sport: Sport::Soccer,
            competition: "Premier League".to_string(),
            home: "Arsenal".to_string(),
            away: "Liverpool".to_string(),
            kickoff: Utc.with_ymd_and_hms(2026, 8, 29, 16, 30, 0).unwrap(),
            status: FixtureStatus::Open,
        }
    }

    #[test]
    fn projections_follow_their_column_schema() {
        let fixture = sample_fixture();
        let fields: Vec<&str> = fixture.row().fields().collect();
        assert_eq!(fields, Fixture::COLUMNS);

        let alert = OddsAlert {
            id: 1,
            fixture: fixture.name(),
            market: Market::MatchResult,
            movement_pct: -8.25,
            severity: Severity::Warning,
            status: AlertStatus::Active,
        };
        let fields: Vec<&str> = alert.row().fields().collect();
        assert_eq!(fields, OddsAlert::COLUMNS);

        let rule = MarginRule {
            id: 2,
            sport: Sport::Tennis,
            market: Market::Moneyline,
            margin_pct: 6.5,
            updated_by: "mira".to_string(),
            updated_at: Utc.with_ymd_and_hms(2026, 8, 20, 9, 0, 0).unwrap(),
        };
        let fields: Vec<&str> = rule.row().fields().collect();
        assert_eq!(fields, MarginRule::COLUMNS);

        let model = PricingModel {
            id: 3,
            name: "GoalRush".to_string(),
            sport: Sport::Soccer,
            version: "v3.2".to_string(),
            status: ModelStatus::Enabled,
            calibrated_at: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
        };
        let fields: Vec<&str> = model.row().fields().collect();
        assert_eq!(fields, PricingModel::COLUMNS);

        let event = AuditEvent {
            id: 4,
            at: Utc.with_ymd_and_hms(2026, 8, 21, 12, 0, 0).unwrap(),
            actor: "desk".to_string(),
            action: "ack".to_string(),
            entity: "alert #1".to_string(),
            detail: "Arsenal v Liverpool 1X2".to_string(),
        };
        let fields: Vec<&str> = event.row().fields().collect();
        assert_eq!(fields, AuditEvent::COLUMNS);
    }

    #[test]
    fn fixture_rows_render_display_values() {
        let row = sample_fixture().row();
        assert_eq!(row.get("id").map(FieldValue::render), Some("7".into()));
        assert_eq!(
            row.get("kickoff").map(FieldValue::render),
            Some("2026-08-29 16:30".into())
        );
        assert_eq!(
            row.get("status").map(FieldValue::render),
            Some("Open".into())
        );
    }

    #[test]
    fn view_lookup_by_name() {
        assert_eq!(DeskView::from_name("alerts"), Some(DeskView::Alerts));
        assert_eq!(DeskView::from_name("AUDIT"), Some(DeskView::Audit));
        assert_eq!(DeskView::from_name("positions"), None);
    }

    #[test]
    fn margin_band_bounds_are_inclusive() {
        assert!(margin_in_band(MARGIN_MIN_PCT));
        assert!(margin_in_band(MARGIN_MAX_PCT));
        assert!(!margin_in_band(0.49));
        assert!(!margin_in_band(25.01));
    }
}
