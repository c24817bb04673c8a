use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::regime::RegimeClassifier;
use crate::core::risk_filters::{btc_headwind, volume_anomaly, RiskStatus};
use crate::core::sessions::{SessionExtremes, SessionManager};
use crate::engine::report;
use crate::engine::schedule::compute_next_pulse;
use crate::error::Result;
use crate::exchange::{last_closed, last_closed_n, prev_day, CandleFeed};
use crate::models::{BtcTrend, Candle, Regime, Signal, Timeframe};
use crate::notify::NotificationBatch;
use crate::storage::{BotState, KeyValueStore};
use crate::strategies::{SignalGenerator, SignalInputs};
use crate::trading::{book_key, check_confirmation, PartialExitTracker, SignalBook};

/// Everything derived for one symbol before the signal book is touched.
struct Observation {
    symbol: String,
    key: String,
    candle: Candle,
    regime: Regime,
    candidate: Option<Signal>,
    cycle_start: DateTime<Utc>,
    sessions: Vec<SessionExtremes>,
}

/// Runs the hourly pulse and the realtime monitor against shared config,
/// candle feed and state store.
pub struct SignalEngine {
    config: Arc<Config>,
    feed: Arc<dyn CandleFeed>,
    store: Arc<dyn KeyValueStore>,
    classifier: RegimeClassifier,
    generator: SignalGenerator,
    partials: PartialExitTracker,
    sessions: SessionManager,
    next_pulse: RwLock<Option<DateTime<Utc>>>,
    /// Serializes load-modify-save of the signal book between the two tasks.
    book_lock: Mutex<()>,
}

impl SignalEngine {
    pub fn new(config: Arc<Config>, feed: Arc<dyn CandleFeed>, store: Arc<dyn KeyValueStore>) -> Self {
        let strategy = &config.strategy;
        Self {
            classifier: RegimeClassifier::new(strategy),
            generator: SignalGenerator::new(strategy),
            partials: PartialExitTracker::new(strategy.partial_scheme),
            sessions: SessionManager::new(&config),
            config,
            feed,
            store,
            next_pulse: RwLock::new(None),
            book_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn bot_state(&self) -> Result<BotState> {
        BotState::load(self.store.as_ref(), &self.config.default_symbols)
    }

    pub fn signal_book(&self) -> Result<SignalBook> {
        SignalBook::load(self.store.as_ref())
    }

    /// Scheduled time of the next hourly pulse, computed on first use.
    pub async fn next_pulse(&self) -> DateTime<Utc> {
        if let Some(at) = *self.next_pulse.read().await {
            return at;
        }
        let at = compute_next_pulse(Utc::now(), self.config.timezone, self.config.pulse_minute);
        *self.next_pulse.write().await = Some(at);
        at
    }

    /// Pulse for the scheduled slot; an early wake-up is treated as the slot.
    pub async fn hourly_pulse(&self) -> Result<Option<NotificationBatch>> {
        let slot = self.next_pulse().await;
        self.hourly_pulse_at(Utc::now().max(slot)).await
    }

    /// Candle reports, confirmations and take-profit events for the last
    /// closed hourly bar of every monitored symbol. `now` only drives the
    /// next-pulse schedule.
    pub async fn hourly_pulse_at(&self, now: DateTime<Utc>) -> Result<Option<NotificationBatch>> {
        let next = compute_next_pulse(now, self.config.timezone, self.config.pulse_minute);
        *self.next_pulse.write().await = Some(next);

        let state = self.bot_state()?;
        if !state.enabled {
            debug!("Hourly pulse skipped: bot disabled");
            return Ok(None);
        }

        let observations = self.observe_all(&state.monitored_symbols, Timeframe::H1).await;
        let btc = self.btc_trend().await;

        let batch = self.apply_hourly(observations, btc)?;
        info!(
            "Hourly pulse: {} symbol(s), {} block(s), next at {}",
            state.monitored_symbols.len(),
            batch.parts.len(),
            next.with_timezone(&self.config.timezone).format("%H:%M")
        );
        Ok(batch.into_option())
    }

    /// Early confirmations on the last closed realtime bar.
    pub async fn realtime_monitor(&self) -> Result<Option<NotificationBatch>> {
        let state = self.bot_state()?;
        if !state.enabled {
            debug!("Realtime monitor skipped: bot disabled");
            return Ok(None);
        }

        let tf = self.config.realtime_tf;
        let observations = self.observe_all(&state.monitored_symbols, tf).await;
        let btc = self.btc_trend().await;

        let batch = self.apply_realtime(observations, btc, tf)?;
        if !batch.is_empty() {
            info!("Realtime {}: {} early confirmation(s)", tf, batch.parts.len());
        }
        Ok(batch.into_option())
    }

    async fn observe_all(&self, symbols: &[String], tf: Timeframe) -> Vec<Observation> {
        let mut out = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.observe(symbol, tf).await {
                Ok(obs) => out.push(obs),
                Err(e) => warn!("{} {} skipped: {}", symbol, tf, e),
            }
        }
        out
    }

    async fn observe(&self, symbol: &str, tf: Timeframe) -> Result<Observation> {
        let strategy = &self.config.strategy;
        let instrument = self.config.instrument(symbol)?;
        let feed = self.feed.as_ref();

        let candle = last_closed(feed, instrument, tf).await?;
        let levels = prev_day(feed, instrument).await?;
        let history = last_closed_n(feed, instrument, Timeframe::H1, strategy.history_window).await?;

        // Realtime bars are measured against the hourly average as well
        let relative_volume = volume_anomaly(&history.tail(strategy.vol_window), &candle, strategy.vol_anomaly);
        let trend = self.classifier.trend_ema(&history);
        let regime = self
            .classifier
            .classify(&candle, &levels, relative_volume.ratio, trend);

        // Sub-hourly bars are checked against the regime of the last closed hour
        let hourly_sweep = if tf == Timeframe::H1 {
            regime.sweep_direction()
        } else {
            history.last().and_then(|hour| {
                let rvol = volume_anomaly(&history.tail(strategy.vol_window), hour, strategy.vol_anomaly);
                self.classifier
                    .classify(hour, &levels, rvol.ratio, trend)
                    .sweep_direction()
            })
        };

        let candidate = self.generator.generate(&SignalInputs {
            symbol,
            timeframe: tf,
            candle: &candle,
            levels: &levels,
            history: &history,
            regime,
            relative_volume,
            hourly_sweep,
        });

        let sessions = if tf == Timeframe::H1 {
            self.sessions.latest_extremes(&history, candle.t_close)
        } else {
            Vec::new()
        };

        debug!(
            "{} {}: close={} regime={} rvol={:.2} pdl={} pdh={}",
            symbol, tf, candle.close, regime, relative_volume.ratio, levels.pdl, levels.pdh
        );

        Ok(Observation {
            symbol: symbol.to_string(),
            key: book_key(symbol, tf),
            candle,
            regime,
            candidate,
            cycle_start: levels.cycle_start(),
            sessions,
        })
    }

    /// BTC headwind for the risk line; `None` when risk filters are off.
    async fn btc_trend(&self) -> Option<BtcTrend> {
        if !self.config.strategy.risk_filters {
            return None;
        }
        let fetched = match self.config.instrument(&self.config.btc_symbol) {
            Ok(instrument) => {
                last_closed_n(
                    self.feed.as_ref(),
                    instrument,
                    Timeframe::H1,
                    self.config.strategy.btc_window,
                )
                .await
            }
            Err(e) => Err(e),
        };
        match fetched {
            Ok(window) => Some(btc_headwind(&window)),
            Err(e) => {
                warn!("BTC headwind unavailable, treating as flat: {}", e);
                Some(BtcTrend::Flat)
            }
        }
    }

    fn apply_hourly(&self, observations: Vec<Observation>, btc: Option<BtcTrend>) -> Result<NotificationBatch> {
        let _guard = self.book_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut book = SignalBook::load(self.store.as_ref())?;
        let mut batch = NotificationBatch::new();

        for obs in observations {
            batch.push(report::candle_report(
                &obs.symbol,
                &obs.candle,
                self.config.timezone,
                &obs.sessions,
            ));

            if let Some(stopped) = book.stop_out(&obs.key, &obs.candle) {
                batch.push(report::stop_line(&stopped));
            }

            let Some(signal) = book.reconcile(&obs.key, obs.regime, obs.candidate, obs.cycle_start)
            else {
                continue;
            };

            if !signal.confirmed {
                if let Some(confirmation) = check_confirmation(signal, obs.candle.close) {
                    info!("{} confirmed: {}", obs.key, confirmation);
                    let risk = btc.map(|b| RiskStatus::new(signal.direction, b));
                    batch.push(report::confirmation_block(signal, &confirmation, risk, None));
                    signal.confirmed = true;
                }
            }

            if !signal.is_unseen(&obs.candle) {
                continue;
            }
            for event in self.partials.update(signal, &obs.candle) {
                info!("{}", event);
                batch.push(event.to_string());
            }
            signal.last_checked = Some(obs.candle.t_open);
        }

        for key in book.remove_completed() {
            info!("Signal {} complete", key);
        }
        book.save(self.store.as_ref())?;
        Ok(batch)
    }

    fn apply_realtime(
        &self,
        observations: Vec<Observation>,
        btc: Option<BtcTrend>,
        tf: Timeframe,
    ) -> Result<NotificationBatch> {
        let _guard = self.book_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut book = SignalBook::load(self.store.as_ref())?;
        let mut batch = NotificationBatch::new();

        for obs in observations {
            let Some(signal) = book.reconcile(&obs.key, obs.regime, obs.candidate, obs.cycle_start)
            else {
                continue;
            };
            if signal.early_confirmed {
                continue;
            }
            if let Some(confirmation) = check_confirmation(signal, obs.candle.close) {
                info!("{} early confirmed: {}", obs.key, confirmation);
                let risk = btc.map(|b| RiskStatus::new(signal.direction, b));
                batch.push(report::confirmation_block(signal, &confirmation, risk, Some(tf)));
                signal.early_confirmed = true;
            }
        }

        book.save(self.store.as_ref())?;
        Ok(batch)
    }
}
