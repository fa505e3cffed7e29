use ratatui::crossterm::event::KeyEvent;
use tracing::debug;

use crate::domain::Message;
use crate::inputter::{InputResult, Inputter};
use crate::records::{MARGIN_MAX_PCT, MARGIN_MIN_PCT, Market, Sport, fmt_pct, margin_in_band};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    SelectScope,
    SetValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFocus {
    Sport,
    Market,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardOutcome {
    Pending,
    Cancelled,
    Finished {
        sport: Sport,
        market: Market,
        margin_pct: f64,
    },
}

/// Two step flow for creating a margin rule: pick a free (sport, market)
/// scope, then type the margin. The model feeds it messages while it is
/// on screen and applies the outcome to the store.
pub struct MarginWizard {
    step: WizardStep,
    focus: ScopeFocus,
    sport_idx: usize,
    market_idx: usize,
    taken: Vec<(Sport, Market)>,
    input: Inputter,
    message: Option<String>,
}

/// Render state handed to the ui.
#[derive(Clone)]
pub struct WizardSnapshot {
    pub step: WizardStep,
    pub focus: ScopeFocus,
    pub sport_idx: usize,
    pub market_idx: usize,
    pub sport: Sport,
    pub market: Market,
    pub scope_taken: bool,
    pub input: InputResult,
    pub message: Option<String>,
}

impl MarginWizard {
    pub fn new(taken: Vec<(Sport, Market)>) -> MarginWizard {
        MarginWizard {
            step: WizardStep::SelectScope,
            focus: ScopeFocus::Sport,
            sport_idx: 0,
            market_idx: 0,
            taken,
            input: Inputter::default(),
            message: None,
        }
    }

    pub fn wants_raw_keys(&self) -> bool {
        self.step == WizardStep::SetValue
    }

    /// Scope selection. Enter moves on once the combination is free,
    /// Esc abandons the wizard.
    pub fn handle(&mut self, message: &Message) -> WizardOutcome {
        match message {
            Message::Exit => return WizardOutcome::Cancelled,
            Message::Enter => return self.advance(),
            Message::MoveUp => self.step_selection(-1),
            Message::MoveDown => self.step_selection(1),
            Message::MoveLeft => {
                self.focus = ScopeFocus::Sport;
                self.message = None;
            }
            Message::MoveRight => {
                self.focus = ScopeFocus::Market;
                self.message = None;
            }
            _ => {}
        }
        WizardOutcome::Pending
    }

    /// Margin entry. Esc steps back to the scope without losing the
    /// selection; Enter validates and finishes.
    pub fn handle_key(&mut self, key: KeyEvent) -> WizardOutcome {
        let result = self.input.read(key);
        if result.canceled {
            self.step = WizardStep::SelectScope;
            self.message = None;
            return WizardOutcome::Pending;
        }
        if !result.finished {
            return WizardOutcome::Pending;
        }
        match result.input.trim().parse::<f64>() {
            Ok(pct) if margin_in_band(pct) => {
                debug!("Wizard finished: {} {} at {}%", self.sport(), self.market(), pct);
                WizardOutcome::Finished {
                    sport: self.sport(),
                    market: self.market(),
                    margin_pct: pct,
                }
            }
            Ok(_) => self.reject(
                &result.input,
                format!(
                    "margin must be between {}% and {}%",
                    fmt_pct(MARGIN_MIN_PCT),
                    fmt_pct(MARGIN_MAX_PCT)
                ),
            ),
            Err(_) => self.reject(&result.input, "enter a number, like 5.5".to_string()),
        }
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        WizardSnapshot {
            step: self.step,
            focus: self.focus,
            sport_idx: self.sport_idx,
            market_idx: self.market_idx,
            sport: self.sport(),
            market: self.market(),
            scope_taken: self.taken.contains(&(self.sport(), self.market())),
            input: self.input.get(),
            message: self.message.clone(),
        }
    }

    fn sport(&self) -> Sport {
        Sport::ALL[self.sport_idx]
    }

    fn market(&self) -> Market {
        Market::ALL[self.market_idx]
    }

    fn step_selection(&mut self, delta: isize) {
        let (idx, len) = match self.focus {
            ScopeFocus::Sport => (&mut self.sport_idx, Sport::ALL.len()),
            ScopeFocus::Market => (&mut self.market_idx, Market::ALL.len()),
        };
        *idx = idx.saturating_add_signed(delta).min(len - 1);
        self.message = None;
    }

    fn advance(&mut self) -> WizardOutcome {
        let scope = (self.sport(), self.market());
        if self.taken.contains(&scope) {
            self.message = Some(format!("a rule for {} {} already exists", scope.0, scope.1));
            return WizardOutcome::Pending;
        }
        self.step = WizardStep::SetValue;
        self.message = None;
        self.input.arm("margin %");
        WizardOutcome::Pending
    }

    fn reject(&mut self, typed: &str, why: String) -> WizardOutcome {
        self.message = Some(why);
        self.input.arm("margin %");
        self.input.set(typed);
        WizardOutcome::Pending
    }
}
