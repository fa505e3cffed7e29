use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::domain::DeskError;
use crate::query::Row;
use crate::records::{
    AlertStatus, AuditEvent, DeskView, Fixture, FixtureStatus, MARGIN_MAX_PCT, MARGIN_MIN_PCT,
    MarginRule, Market, ModelStatus, OddsAlert, PricingModel, Sport, Tabular, fmt_pct,
    margin_in_band,
};
use crate::seed;

/// All desk records, held in memory for the lifetime of the session.
///
/// Mutations go through the methods below. Each one that changes a record
/// appends exactly one audit event naming the acting operator; requests
/// against unknown ids are logged and reported back, never fatal. Every
/// method returns the status line the desk shows for it.
pub struct DeskStore {
    pub fixtures: Vec<Fixture>,
    pub alerts: Vec<OddsAlert>,
    pub margins: Vec<MarginRule>,
    pub models: Vec<PricingModel>,
    pub audit: Vec<AuditEvent>,
}

impl DeskStore {
    pub fn load() -> Result<DeskStore, DeskError> {
        let store = DeskStore {
            fixtures: seed::fixtures(),
            alerts: seed::alerts(),
            margins: seed::margin_rules(),
            models: seed::pricing_models(),
            audit: seed::audit_trail(),
        };
        store.validate()?;
        info!(
            "Loaded desk data: {} fixtures, {} alerts, {} margin rules, {} models, {} audit events",
            store.fixtures.len(),
            store.alerts.len(),
            store.margins.len(),
            store.models.len(),
            store.audit.len()
        );
        Ok(store)
    }

    fn validate(&self) -> Result<(), DeskError> {
        check_unique_ids("fixture", self.fixtures.iter().map(Tabular::id))?;
        check_unique_ids("alert", self.alerts.iter().map(Tabular::id))?;
        check_unique_ids("margin rule", self.margins.iter().map(Tabular::id))?;
        check_unique_ids("model", self.models.iter().map(Tabular::id))?;
        check_unique_ids("audit event", self.audit.iter().map(Tabular::id))?;

        let mut scopes = BTreeSet::new();
        for rule in &self.margins {
            if !margin_in_band(rule.margin_pct) {
                return Err(DeskError::LoadFailed(format!(
                    "margin rule {} is outside the {}..{}% band: {}%",
                    rule.id,
                    fmt_pct(MARGIN_MIN_PCT),
                    fmt_pct(MARGIN_MAX_PCT),
                    fmt_pct(rule.margin_pct)
                )));
            }
            if !scopes.insert((rule.sport.label(), rule.market.label())) {
                return Err(DeskError::LoadFailed(format!(
                    "margin rule {} duplicates the {} {} scope",
                    rule.id, rule.sport, rule.market
                )));
            }
        }
        Ok(())
    }

    /// Display rows for one view, in collection order. Rebuilt on every
    /// call so the table always reflects the current records.
    pub fn rows_for(&self, view: DeskView) -> Vec<Row> {
        match view {
            DeskView::Fixtures => self.fixtures.iter().map(Tabular::row).collect(),
            DeskView::Alerts => self.alerts.iter().map(Tabular::row).collect(),
            DeskView::Margins => self.margins.iter().map(Tabular::row).collect(),
            DeskView::Models => self.models.iter().map(Tabular::row).collect(),
            DeskView::Audit => self.audit.iter().map(Tabular::row).collect(),
        }
    }

    pub fn len_of(&self, view: DeskView) -> usize {
        match view {
            DeskView::Fixtures => self.fixtures.len(),
            DeskView::Alerts => self.alerts.len(),
            DeskView::Margins => self.margins.len(),
            DeskView::Models => self.models.len(),
            DeskView::Audit => self.audit.len(),
        }
    }

    /// Id of the record at a collection-order position.
    pub fn id_at(&self, view: DeskView, index: usize) -> Option<u32> {
        match view {
            DeskView::Fixtures => self.fixtures.get(index).map(Tabular::id),
            DeskView::Alerts => self.alerts.get(index).map(Tabular::id),
            DeskView::Margins => self.margins.get(index).map(Tabular::id),
            DeskView::Models => self.models.get(index).map(Tabular::id),
            DeskView::Audit => self.audit.get(index).map(Tabular::id),
        }
    }

    pub fn ack_alert(&mut self, id: u32, actor: &str) -> String {
        let Some(alert) = self.alerts.iter_mut().find(|alert| alert.id == id) else {
            warn!("ack requested for unknown alert {}", id);
            return format!("alert #{} not found", id);
        };
        if alert.status == AlertStatus::Acked {
            return format!("alert #{} is already acknowledged", id);
        }
        alert.status = AlertStatus::Acked;
        let detail = format!("{} {}", alert.fixture, alert.market);
        self.record(actor, "ack", format!("alert #{}", id), detail);
        format!("alert #{} acknowledged", id)
    }

    pub fn dismiss_alert(&mut self, id: u32, actor: &str) -> String {
        let Some(position) = self.alerts.iter().position(|alert| alert.id == id) else {
            warn!("dismiss requested for unknown alert {}", id);
            return format!("alert #{} not found", id);
        };
        let alert = self.alerts.remove(position);
        let detail = format!("{} {}", alert.fixture, alert.market);
        self.record(actor, "dismiss", format!("alert #{}", id), detail);
        format!("alert #{} dismissed", id)
    }

    pub fn suspend_fixture(&mut self, id: u32, actor: &str) -> String {
        let Some(fixture) = self.fixtures.iter_mut().find(|fixture| fixture.id == id) else {
            warn!("suspend requested for unknown fixture {}", id);
            return format!("fixture #{} not found", id);
        };
        match fixture.status {
            FixtureStatus::Settled => format!("fixture #{} is settled", id),
            FixtureStatus::Suspended => format!("fixture #{} is already suspended", id),
            FixtureStatus::Open => {
                fixture.status = FixtureStatus::Suspended;
                let detail = fixture.name();
                self.record(actor, "suspend", format!("fixture #{}", id), detail);
                format!("fixture #{} suspended", id)
            }
        }
    }

    pub fn reopen_fixture(&mut self, id: u32, actor: &str) -> String {
        let Some(fixture) = self.fixtures.iter_mut().find(|fixture| fixture.id == id) else {
            warn!("reopen requested for unknown fixture {}", id);
            return format!("fixture #{} not found", id);
        };
        match fixture.status {
            FixtureStatus::Settled => format!("fixture #{} is settled", id),
            FixtureStatus::Open => format!("fixture #{} is already open", id),
            FixtureStatus::Suspended => {
                fixture.status = FixtureStatus::Open;
                let detail = fixture.name();
                self.record(actor, "reopen", format!("fixture #{}", id), detail);
                format!("fixture #{} reopened", id)
            }
        }
    }

    /// Open fixtures get suspended, suspended ones reopened. Settled
    /// fixtures stay settled.
    pub fn toggle_fixture(&mut self, id: u32, actor: &str) -> String {
        match self
            .fixtures
            .iter()
            .find(|fixture| fixture.id == id)
            .map(|fixture| fixture.status)
        {
            Some(FixtureStatus::Open) => self.suspend_fixture(id, actor),
            Some(FixtureStatus::Suspended) => self.reopen_fixture(id, actor),
            Some(FixtureStatus::Settled) => format!("fixture #{} is settled", id),
            None => {
                warn!("toggle requested for unknown fixture {}", id);
                format!("fixture #{} not found", id)
            }
        }
    }

    pub fn toggle_model(&mut self, id: u32, actor: &str) -> String {
        let Some(model) = self.models.iter_mut().find(|model| model.id == id) else {
            warn!("toggle requested for unknown model {}", id);
            return format!("model #{} not found", id);
        };
        let action = match model.status {
            ModelStatus::Enabled => {
                model.status = ModelStatus::Disabled;
                "disable"
            }
            ModelStatus::Disabled => {
                model.status = ModelStatus::Enabled;
                "enable"
            }
        };
        let detail = format!("{} {}", model.name, model.version);
        self.record(actor, action, format!("model #{}", id), detail);
        format!("model #{} {}d", id, action)
    }

    /// New rules take the next free id. One rule per (sport, market)
    /// scope; the margin has to sit inside the allowed band.
    pub fn create_margin_rule(
        &mut self,
        sport: Sport,
        market: Market,
        margin_pct: f64,
        actor: &str,
    ) -> String {
        if !margin_in_band(margin_pct) {
            return format!(
                "margin must be between {}% and {}%",
                fmt_pct(MARGIN_MIN_PCT),
                fmt_pct(MARGIN_MAX_PCT)
            );
        }
        if self
            .margins
            .iter()
            .any(|rule| rule.scope() == (sport, market))
        {
            return format!("a rule for {} {} already exists", sport, market);
        }
        let id = self.margins.iter().map(Tabular::id).max().unwrap_or(0) + 1;
        self.margins.push(MarginRule {
            id,
            sport,
            market,
            margin_pct,
            updated_by: actor.to_string(),
            updated_at: Utc::now(),
        });
        let detail = format!("{} {} at {}%", sport, market, fmt_pct(margin_pct));
        self.record(actor, "create", format!("rule #{}", id), detail);
        format!("rule #{} created", id)
    }

    pub fn delete_margin_rule(&mut self, id: u32, actor: &str) -> String {
        let Some(position) = self.margins.iter().position(|rule| rule.id == id) else {
            warn!("delete requested for unknown margin rule {}", id);
            return format!("rule #{} not found", id);
        };
        let rule = self.margins.remove(position);
        let detail = format!(
            "{} {} at {}%",
            rule.sport,
            rule.market,
            fmt_pct(rule.margin_pct)
        );
        self.record(actor, "delete", format!("rule #{}", id), detail);
        format!("rule #{} deleted", id)
    }

    fn record(&mut self, actor: &str, action: &str, entity: String, detail: String) {
        let id = self.audit.iter().map(Tabular::id).max().unwrap_or(0) + 1;
        debug!("audit {}: {} {} {}", id, actor, action, entity);
        self.audit.push(AuditEvent {
            id,
            at: Utc::now(),
            actor: actor.to_string(),
            action: action.to_string(),
            entity,
            detail,
        });
    }
}

fn check_unique_ids(kind: &str, ids: impl Iterator<Item = u32>) -> Result<(), DeskError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(DeskError::LoadFailed(format!("duplicate {} id {}", kind, id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FieldValue;

    fn store() -> DeskStore {
        DeskStore::load().unwrap()
    }

    #[test]
    fn load_passes_validation() {
        let store = store();
        assert_eq!(store.fixtures.len(), 12);
        assert_eq!(store.alerts.len(), 8);
        assert_eq!(store.margins.len(), 6);
        assert_eq!(store.models.len(), 5);
        assert_eq!(store.audit.len(), 6);
    }

    #[test]
    fn every_change_appends_one_audit_event() {
        let mut store = store();
        let before = store.audit.len();

        store.ack_alert(1, "desk");
        assert_eq!(store.audit.len(), before + 1);
        assert_eq!(store.audit.last().unwrap().action, "ack");

        store.toggle_model(1, "desk");
        assert_eq!(store.audit.len(), before + 2);
        assert_eq!(store.audit.last().unwrap().action, "disable");

        store.create_margin_rule(Sport::Tennis, Market::OverUnder, 8.0, "desk");
        assert_eq!(store.audit.len(), before + 3);
        assert_eq!(store.audit.last().unwrap().action, "create");

        let ids: Vec<u32> = store.audit.iter().map(|event| event.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn unknown_ids_are_reported_not_fatal() {
        let mut store = store();
        let audit_before = store.audit.len();

        assert_eq!(store.ack_alert(99, "desk"), "alert #99 not found");
        assert_eq!(store.dismiss_alert(99, "desk"), "alert #99 not found");
        assert_eq!(store.toggle_fixture(99, "desk"), "fixture #99 not found");
        assert_eq!(store.toggle_model(99, "desk"), "model #99 not found");
        assert_eq!(store.delete_margin_rule(99, "desk"), "rule #99 not found");

        assert_eq!(store.audit.len(), audit_before);
        assert_eq!(store.alerts.len(), 8);
    }

    #[test]
    fn acknowledging_twice_changes_nothing_the_second_time() {
        let mut store = store();
        assert_eq!(store.ack_alert(1, "mira"), "alert #1 acknowledged");
        let audit_after_first = store.audit.len();
        assert_eq!(store.ack_alert(1, "mira"), "alert #1 is already acknowledged");
        assert_eq!(store.audit.len(), audit_after_first);
    }

    #[test]
    fn dismiss_removes_the_alert() {
        let mut store = store();
        assert_eq!(store.dismiss_alert(2, "desk"), "alert #2 dismissed");
        assert_eq!(store.alerts.len(), 7);
        assert!(!store.alerts.iter().any(|alert| alert.id == 2));
    }

    #[test]
    fn created_rules_take_the_next_free_id() {
        let mut store = store();
        let status = store.create_margin_rule(Sport::Basketball, Market::OverUnder, 5.0, "jonas");
        assert_eq!(status, "rule #7 created");
        let rule = store.margins.last().unwrap();
        assert_eq!(rule.id, 7);
        assert_eq!(rule.scope(), (Sport::Basketball, Market::OverUnder));
        assert_eq!(rule.updated_by, "jonas");
    }

    #[test]
    fn rule_creation_rejects_margins_outside_the_band() {
        let mut store = store();
        let audit_before = store.audit.len();
        let status = store.create_margin_rule(Sport::Tennis, Market::Handicap, 0.4, "desk");
        assert_eq!(status, "margin must be between 0.5% and 25%");
        let status = store.create_margin_rule(Sport::Tennis, Market::Handicap, 30.0, "desk");
        assert_eq!(status, "margin must be between 0.5% and 25%");
        assert_eq!(store.margins.len(), 6);
        assert_eq!(store.audit.len(), audit_before);
    }

    #[test]
    fn rule_creation_rejects_duplicate_scopes() {
        let mut store = store();
        let status = store.create_margin_rule(Sport::Soccer, Market::MatchResult, 4.0, "desk");
        assert_eq!(status, "a rule for Soccer 1X2 already exists");
        assert_eq!(store.margins.len(), 6);
    }

    #[test]
    fn deleting_a_rule_records_its_scope() {
        let mut store = store();
        assert_eq!(store.delete_margin_rule(5, "jonas"), "rule #5 deleted");
        assert_eq!(store.margins.len(), 5);
        let event = store.audit.last().unwrap();
        assert_eq!(event.action, "delete");
        assert_eq!(event.entity, "rule #5");
        assert_eq!(event.detail, "Ice Hockey Handicap at 6.25%");
    }

    #[test]
    fn toggling_a_fixture_suspends_then_reopens() {
        let mut store = store();
        assert_eq!(store.toggle_fixture(1, "desk"), "fixture #1 suspended");
        assert_eq!(store.fixtures[0].status, FixtureStatus::Suspended);
        assert_eq!(store.toggle_fixture(1, "desk"), "fixture #1 reopened");
        assert_eq!(store.fixtures[0].status, FixtureStatus::Open);
        let actions: Vec<&str> = store
            .audit
            .iter()
            .rev()
            .take(2)
            .map(|event| event.action.as_str())
            .collect();
        assert_eq!(actions, ["reopen", "suspend"]);
    }

    #[test]
    fn settled_fixtures_stay_settled() {
        let mut store = store();
        let audit_before = store.audit.len();
        assert_eq!(store.toggle_fixture(11, "desk"), "fixture #11 is settled");
        assert_eq!(store.fixtures[10].status, FixtureStatus::Settled);
        assert_eq!(store.audit.len(), audit_before);
    }

    #[test]
    fn toggling_a_model_flips_its_status() {
        let mut store = store();
        assert_eq!(store.toggle_model(3, "mira"), "model #3 enabled");
        assert_eq!(store.models[2].status, ModelStatus::Enabled);
        assert_eq!(store.audit.last().unwrap().detail, "BaselinePro v1.7");
    }

    #[test]
    fn rows_follow_collection_order() {
        let store = store();
        let rows = store.rows_for(DeskView::Alerts);
        let ids: Vec<String> = rows
            .iter()
            .map(|row| row.get("id").map(FieldValue::render).unwrap_or_default())
            .collect();
        assert_eq!(ids, ["1", "2", "3", "4", "5", "6", "7", "8"]);
        assert_eq!(store.id_at(DeskView::Alerts, 3), Some(4));
        assert_eq!(store.id_at(DeskView::Alerts, 8), None);
    }
}
