use std::time::Instant;

use chrono::{DateTime, Local, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::CoinGeckoClient;
use crate::convert;
use crate::db::Db;
use crate::error::{FetchError, ValidationError};
use crate::history::HistoryStore;
use crate::poll::Poller;
use crate::theme::{Theme, ThemePreference};
use crate::types::*;

type FetchOutcome = Result<Rate, FetchError>;

/// One converter session: cached rate, history, theme and refresh schedule.
pub struct App {
    pub rate: Option<Rate>,
    pub rate_status: RateStatus,
    pub last_updated: Option<DateTime<Local>>,
    pub fetch_in_flight: bool,
    pub history: HistoryStore,
    pub theme_pref: ThemePreference,
    pub theme: Theme,
    pub poller: Poller,
    pub input_mode: InputMode,
    pub input_buf: String,
    pub result: Option<ConversionRecord>,
    pub input_error: Option<ValidationError>,
    pub quit: bool,
    db: Db,
    client: CoinGeckoClient,
    fetch_tx: mpsc::UnboundedSender<FetchOutcome>,
    fetch_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    fetch_task: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(db: Db, client: CoinGeckoClient, poller: Poller) -> Self {
        let theme_pref = ThemePreference::load(&db);
        let history = HistoryStore::load(&db);
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        info!(
            theme = theme_pref.as_str(),
            history = history.len(),
            "session restored"
        );
        Self {
            rate: None,
            rate_status: RateStatus::Loading,
            last_updated: None,
            fetch_in_flight: false,
            history,
            theme_pref,
            theme: theme_pref.theme(),
            poller,
            input_mode: InputMode::Normal,
            input_buf: String::new(),
            result: None,
            input_error: None,
            quit: false,
            db,
            client,
            fetch_tx,
            fetch_rx,
            fetch_task: None,
        }
    }

    // -- Rate --

    /// Starts a fetch unless one is already pending. Returns whether a new
    /// request went out.
    pub fn spawn_fetch(&mut self) -> bool {
        if self.fetch_in_flight {
            debug!("fetch already in flight, skipping");
            return false;
        }
        self.fetch_in_flight = true;
        let client = self.client.clone();
        let tx = self.fetch_tx.clone();
        self.fetch_task = Some(tokio::spawn(async move {
            let outcome = client.fetch_rate().await;
            let _ = tx.send(outcome);
        }));
        true
    }

    /// Applies every fetch that completed since the last call. A task that
    /// ended without sending (panicked) releases the in-flight slot too.
    pub fn drain_fetches(&mut self) {
        // checked before draining: a finished task has already sent
        let finished = self.fetch_task.as_ref().is_some_and(|t| t.is_finished());

        while let Ok(outcome) = self.fetch_rx.try_recv() {
            self.apply_fetch(outcome, Local::now());
        }

        if finished {
            self.fetch_task = None;
            if self.fetch_in_flight {
                warn!("rate fetch task ended without an outcome");
                self.fetch_in_flight = false;
                self.rate_status = if self.rate.is_some() {
                    RateStatus::Stale
                } else {
                    RateStatus::Error
                };
            }
        }
    }

    pub fn apply_fetch(&mut self, outcome: FetchOutcome, at: DateTime<Local>) {
        self.fetch_in_flight = false;
        match outcome {
            Ok(rate) => {
                self.rate = Some(rate);
                self.rate_status = RateStatus::Live;
                self.last_updated = Some(at);
            }
            Err(e) => {
                warn!(error = %e, "rate fetch failed");
                self.rate_status = if self.rate.is_some() {
                    RateStatus::Stale
                } else {
                    RateStatus::Error
                };
            }
        }
    }

    // -- Polling --

    pub fn on_tick(&mut self, now: Instant) {
        if self.poller.tick(now) {
            self.spawn_fetch();
        }
        self.drain_fetches();
    }

    pub fn set_visible(&mut self, visible: bool, now: Instant) {
        let fetch_now = self.poller.set_visible(visible, now);
        info!(visible, state = ?self.poller.state(), "visibility changed");
        if fetch_now {
            self.spawn_fetch();
        }
    }

    // -- Conversion --

    /// Converts the current input against the cached rate. On failure the
    /// input is left as typed.
    pub fn convert(&mut self) -> Result<(), ValidationError> {
        match convert::convert(&self.input_buf, self.rate, Utc::now()) {
            Ok(record) => {
                debug!(btc = record.amount_btc, brl = record.amount_fiat, "converted");
                self.history.record(&self.db, record.clone());
                self.result = Some(record);
                self.input_error = None;
                Ok(())
            }
            Err(e) => {
                self.result = None;
                self.input_error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub fn clear_input(&mut self) {
        self.input_buf.clear();
        self.result = None;
        self.input_error = None;
    }

    // -- History --

    pub fn request_clear_history(&mut self) {
        if !self.history.is_empty() {
            self.input_mode = InputMode::ConfirmClearHistory;
        }
    }

    pub fn resolve_clear_history(&mut self, confirmed: bool) {
        if self.history.clear(&self.db, confirmed) {
            info!("history cleared");
        }
        self.input_mode = InputMode::Normal;
    }

    // -- Theme --

    pub fn toggle_theme(&mut self) {
        self.theme_pref = self.theme_pref.toggled();
        self.theme = self.theme_pref.theme();
        self.theme_pref.save(&self.db);
    }

    #[cfg(test)]
    fn db(&self) -> &Db {
        &self.db
    }
}
