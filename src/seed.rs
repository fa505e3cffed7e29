use chrono::{DateTime, TimeZone, Utc};

use crate::records::{
    AlertStatus, AuditEvent, Fixture, FixtureStatus, MarginRule, Market, ModelStatus, OddsAlert,
    PricingModel, Severity, Sport,
};

// Seed timestamps are fixed and known-valid.
fn ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
}

fn fixture(
    id: u32,
    sport: Sport,
    competition: &str,
    home: &str,
    away: &str,
    kickoff: DateTime<Utc>,
    status: FixtureStatus,
) -> Fixture {
    Fixture {
        id,
        sport,
        competition: competition.to_string(),
        home: home.to_string(),
        away: away.to_string(),
        kickoff,
        status,
    }
}

pub fn fixtures() -> Vec<Fixture> {
    use FixtureStatus::*;
    use Sport::*;
    vec![
        fixture(1, Soccer, "Premier League", "Arsenal", "Liverpool", ts(2026, 8, 29, 16, 30), Open),
        fixture(2, Soccer, "Premier League", "Chelsea", "Everton", ts(2026, 8, 29, 14, 0), Open),
        fixture(3, Soccer, "La Liga", "Real Madrid", "Sevilla", ts(2026, 8, 30, 19, 0), Open),
        fixture(4, Soccer, "Serie A", "Inter", "Roma", ts(2026, 8, 30, 17, 45), Suspended),
        fixture(5, Basketball, "EuroLeague", "Panathinaikos", "Fenerbahce", ts(2026, 9, 2, 18, 15), Open),
        fixture(6, Basketball, "EuroLeague", "Real Madrid", "Barcelona", ts(2026, 9, 3, 19, 30), Open),
        fixture(7, Tennis, "US Open", "Alcaraz", "Sinner", ts(2026, 9, 5, 20, 0), Open),
        fixture(8, Tennis, "US Open", "Gauff", "Swiatek", ts(2026, 9, 4, 17, 0), Open),
        fixture(9, IceHockey, "NHL Preseason", "Rangers", "Bruins", ts(2026, 9, 21, 23, 0), Open),
        fixture(10, IceHockey, "NHL Preseason", "Maple Leafs", "Canadiens", ts(2026, 9, 22, 23, 30), Open),
        fixture(11, Soccer, "Premier League", "Newcastle", "Brentford", ts(2026, 8, 23, 13, 30), Settled),
        fixture(12, Soccer, "Championship", "Leeds", "Norwich", ts(2026, 8, 22, 19, 45), Suspended),
    ]
}

fn alert(
    id: u32,
    fixture: &str,
    market: Market,
    movement_pct: f64,
    severity: Severity,
    status: AlertStatus,
) -> OddsAlert {
    OddsAlert {
        id,
        fixture: fixture.to_string(),
        market,
        movement_pct,
        severity,
        status,
    }
}

pub fn alerts() -> Vec<OddsAlert> {
    use AlertStatus::*;
    use Market::*;
    use Severity::*;
    vec![
        alert(1, "Arsenal v Liverpool", MatchResult, -12.5, Critical, Active),
        alert(2, "Arsenal v Liverpool", OverUnder, 6.8, Warning, Active),
        alert(3, "Real Madrid v Sevilla", MatchResult, -4.2, Info, Acked),
        alert(4, "Alcaraz v Sinner", Moneyline, 15.0, Critical, Active),
        alert(5, "Inter v Roma", Handicap, -9.1, Warning, Active),
        alert(6, "Rangers v Bruins", Moneyline, 3.4, Info, Active),
        alert(7, "Chelsea v Everton", MatchResult, 5.2, Warning, Acked),
        alert(8, "Gauff v Swiatek", Moneyline, -7.75, Warning, Active),
    ]
}

fn rule(
    id: u32,
    sport: Sport,
    market: Market,
    margin_pct: f64,
    updated_by: &str,
    updated_at: DateTime<Utc>,
) -> MarginRule {
    MarginRule {
        id,
        sport,
        market,
        margin_pct,
        updated_by: updated_by.to_string(),
        updated_at,
    }
}

pub fn margin_rules() -> Vec<MarginRule> {
    use Market::*;
    use Sport::*;
    vec![
        rule(1, Soccer, MatchResult, 5.5, "mira", ts(2026, 8, 18, 9, 12)),
        rule(2, Soccer, OverUnder, 6.0, "mira", ts(2026, 8, 18, 9, 15)),
        rule(3, Basketball, Moneyline, 4.5, "jonas", ts(2026, 8, 19, 14, 40)),
        rule(4, Tennis, Moneyline, 7.0, "desk", ts(2026, 8, 20, 11, 5)),
        rule(5, IceHockey, Handicap, 6.25, "jonas", ts(2026, 8, 21, 16, 22)),
        rule(6, Soccer, Handicap, 5.75, "mira", ts(2026, 8, 21, 8, 50)),
    ]
}

fn model(
    id: u32,
    name: &str,
    sport: Sport,
    version: &str,
    status: ModelStatus,
    calibrated_at: DateTime<Utc>,
) -> PricingModel {
    PricingModel {
        id,
        name: name.to_string(),
        sport,
        version: version.to_string(),
        status,
        calibrated_at,
    }
}

pub fn pricing_models() -> Vec<PricingModel> {
    use ModelStatus::*;
    use Sport::*;
    vec![
        model(1, "GoalRush", Soccer, "v3.2", Enabled, ts(2026, 8, 15, 0, 0)),
        model(2, "CourtEdge", Basketball, "v2.0", Enabled, ts(2026, 8, 10, 0, 0)),
        model(3, "BaselinePro", Tennis, "v1.7", Disabled, ts(2026, 7, 28, 0, 0)),
        model(4, "IceLine", IceHockey, "v0.9", Enabled, ts(2026, 8, 19, 0, 0)),
        model(5, "GoalRush-Beta", Soccer, "v4.0-rc1", Disabled, ts(2026, 8, 21, 0, 0)),
    ]
}

fn event(
    id: u32,
    at: DateTime<Utc>,
    actor: &str,
    action: &str,
    entity: &str,
    detail: &str,
) -> AuditEvent {
    AuditEvent {
        id,
        at,
        actor: actor.to_string(),
        action: action.to_string(),
        entity: entity.to_string(),
        detail: detail.to_string(),
    }
}

pub fn audit_trail() -> Vec<AuditEvent> {
    vec![
        event(1, ts(2026, 8, 18, 9, 12), "mira", "create", "rule #1", "Soccer 1X2 at 5.5%"),
        event(2, ts(2026, 8, 19, 14, 40), "jonas", "create", "rule #3", "Basketball Moneyline at 4.5%"),
        event(3, ts(2026, 8, 20, 11, 5), "desk", "create", "rule #4", "Tennis Moneyline at 7%"),
        event(4, ts(2026, 8, 21, 16, 10), "jonas", "disable", "model #3", "BaselinePro v1.7"),
        event(5, ts(2026, 8, 22, 7, 2), "desk", "suspend", "fixture #12", "Leeds v Norwich"),
        event(6, ts(2026, 8, 22, 7, 45), "mira", "ack", "alert #3", "Real Madrid v Sevilla 1X2"),
    ]
}
