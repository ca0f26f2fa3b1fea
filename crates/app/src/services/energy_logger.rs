//! Energy logger — live buffers, multi-resolution sampling and retention.
//!
//! The logger owns the in-memory 24-hour live logs, the sampling schedule
//! and the archive write path. A 1 Hz driver task calls
//! [`EnergyLogger::sample_tick`]; every handler runs to completion, so rows
//! of a finer rate are always committed before the cascaded rates that
//! consume them within the same tick.
//!
//! When the archive failed to initialise the logger runs degraded: realtime
//! entries are still accepted into the live logs, sampling is disabled and
//! log queries return empty results.

use std::collections::HashMap;

use chrono::{Duration, TimeZone, Utc};
use tokio::sync::Mutex;

use energyhub_domain::balance::{BalanceSample, PowerBalance, ThingSample};
use energyhub_domain::counter::EnergyCounter;
use energyhub_domain::event::EnergyEvent;
use energyhub_domain::id::ThingId;
use energyhub_domain::live_log::LiveLog;
use energyhub_domain::sample_rate::{
    MAX_MINUTE_SAMPLES, SAMPLE_CONFIGS, SampleConfig, SampleRate, next_sample_timestamp,
    sample_start,
};
use energyhub_domain::thing::ThingReading;
use energyhub_domain::time::Timestamp;

use crate::ports::{Archive, EventPublisher};

#[derive(Default)]
struct LoggerState {
    balance_live: LiveLog<BalanceSample>,
    things_live: HashMap<ThingId, LiveLog<ThingSample>>,
    /// Per-thing trackers of `totalEnergyConsumed`, separate from the
    /// balance aggregator's caches.
    thing_consumed: HashMap<ThingId, EnergyCounter>,
    /// Per-thing trackers of `totalEnergyProduced`.
    thing_produced: HashMap<ThingId, EnergyCounter>,
    /// Cumulative totals of the balance as last reported by the aggregator,
    /// carried into 1-minute samples.
    totals: PowerBalance,
    /// Wall-clock instant at which the next sample of each rate is due.
    next_samples: HashMap<SampleRate, Timestamp>,
}

/// Application service owning the live logs, the sampler and log queries.
///
/// Boundary alignment happens in `Tz` (the controller's local timezone in
/// production, UTC in tests); all stored timestamps are UTC.
pub struct EnergyLogger<A, P, Tz = chrono::Local> {
    archive: Option<A>,
    publisher: P,
    tz: Tz,
    state: Mutex<LoggerState>,
}

impl<A, P, Tz> EnergyLogger<A, P, Tz>
where
    A: Archive + Send + Sync,
    P: EventPublisher + Send + Sync,
    Tz: TimeZone + Send + Sync,
    Tz::Offset: Send + Sync,
{
    /// Create a new logger. `archive` is `None` when storage initialisation
    /// failed and the system runs in degraded, in-memory-only mode.
    pub fn new(archive: Option<A>, publisher: P, tz: Tz) -> Self {
        Self {
            archive,
            publisher,
            tz,
            state: Mutex::new(LoggerState::default()),
        }
    }

    /// Whether the logger runs without a backing archive.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.archive.is_none()
    }

    /// Restore persisted state, schedule sampling and catch up on samples
    /// missed while the controller was down.
    pub async fn startup(&self, now: Timestamp) {
        let mut state = self.state.lock().await;

        state
            .next_samples
            .extend(self.align(SampleRate::OneMinute, now).map(|t| (SampleRate::OneMinute, t)));
        for config in &SAMPLE_CONFIGS {
            if let Some(next) = self.align(config.sample_rate, now) {
                state.next_samples.insert(config.sample_rate, next);
                tracing::debug!(rate = %config.sample_rate, next = %next, "next sample scheduled");
            }
        }

        let Some(archive) = &self.archive else {
            tracing::warn!("no archive available, sampling disabled");
            return;
        };

        // Load the complete list of logged things so sampling covers things
        // that stay silent for a while, seeding live logs and counters.
        match archive.logged_things().await {
            Ok(ids) => {
                for id in ids {
                    let latest = archive.latest_thing(id, SampleRate::OneMinute).await;
                    let latest = match latest {
                        Ok(latest) => latest,
                        Err(err) => {
                            tracing::warn!(thing = %id, %err, "failed to load latest thing sample");
                            None
                        }
                    };
                    let cache = match archive.thing_cache(id).await {
                        Ok(cache) => cache,
                        Err(err) => {
                            tracing::warn!(thing = %id, %err, "failed to load thing counter cache");
                            None
                        }
                    };

                    let internal_consumed = latest.map_or(0.0, |s| s.total_consumption);
                    let internal_produced = latest.map_or(0.0, |s| s.total_production);
                    let raw_consumed = cache.map_or(0.0, |c| c.total_energy_consumed);
                    let raw_produced = cache.map_or(0.0, |c| c.total_energy_produced);
                    state
                        .thing_consumed
                        .insert(id, EnergyCounter::restore(raw_consumed, internal_consumed));
                    state
                        .thing_produced
                        .insert(id, EnergyCounter::restore(raw_produced, internal_produced));

                    let mut live = LiveLog::new();
                    if let Some(sample) = latest {
                        live.prepend(sample, now);
                    }
                    state.things_live.insert(id, live);
                }
            }
            Err(err) => tracing::warn!(%err, "failed to load logged things"),
        }

        // Carry the balance totals across the restart.
        match archive.latest_balance(SampleRate::Any).await {
            Ok(Some(latest)) => {
                state.totals.total_consumption = latest.total_consumption;
                state.totals.total_production = latest.total_production;
                state.totals.total_acquisition = latest.total_acquisition;
                state.totals.total_return = latest.total_return;
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "failed to load latest balance sample"),
        }

        // Catch up on samples missed while the system was offline.
        let thing_ids: Vec<ThingId> = state.things_live.keys().copied().collect();
        for config in &SAMPLE_CONFIGS {
            if let Some(&due) = state.next_samples.get(&config.sample_rate) {
                self.rectify_series(archive, &thing_ids, config, due).await;
            }
        }
    }

    /// Record a freshly computed power balance into the live log.
    pub async fn log_power_balance(&self, balance: &PowerBalance, now: Timestamp) {
        let mut state = self.state.lock().await;
        state.totals = *balance;
        let sample = BalanceSample::from_balance(now, balance);
        state.balance_live.prepend(sample, now);
    }

    /// Record a thing's power reading, tracking its raw counters.
    pub async fn log_thing_power(&self, thing_id: ThingId, reading: ThingReading, now: Timestamp) {
        let mut state = self.state.lock().await;
        state
            .thing_consumed
            .entry(thing_id)
            .or_default()
            .update(reading.total_energy_consumed);
        state
            .thing_produced
            .entry(thing_id)
            .or_default()
            .update(reading.total_energy_produced);

        let sample = ThingSample {
            timestamp: now,
            thing_id,
            current_power: reading.current_power,
            total_consumption: state.thing_consumed[&thing_id].total(),
            total_production: state.thing_produced[&thing_id].total(),
        };
        tracing::debug!(
            thing = %thing_id,
            power = reading.current_power,
            consumption = sample.total_consumption,
            production = sample.total_production,
            "logging thing power"
        );
        state
            .things_live
            .entry(thing_id)
            .or_default()
            .prepend(sample, now);
        drop(state);

        if let Some(archive) = &self.archive {
            if let Err(err) = archive
                .upsert_thing_cache(
                    thing_id,
                    reading.total_energy_consumed,
                    reading.total_energy_produced,
                )
                .await
            {
                tracing::warn!(thing = %thing_id, %err, "failed to persist thing counter cache");
            }
        }
    }

    /// Drop all live and archived state of a removed thing.
    pub async fn remove_thing(&self, thing_id: ThingId) {
        let mut state = self.state.lock().await;
        state.things_live.remove(&thing_id);
        state.thing_consumed.remove(&thing_id);
        state.thing_produced.remove(&thing_id);
        drop(state);

        if let Some(archive) = &self.archive {
            if let Err(err) = archive.remove_thing_logs(thing_id).await {
                tracing::warn!(thing = %thing_id, %err, "failed to remove thing logs");
            }
        }
    }

    /// All things with archived rows; empty in degraded mode.
    pub async fn logged_things(&self) -> Vec<ThingId> {
        let Some(archive) = &self.archive else {
            return Vec::new();
        };
        match archive.logged_things().await {
            Ok(ids) => ids,
            Err(err) => {
                tracing::warn!(%err, "failed to list logged things");
                Vec::new()
            }
        }
    }

    /// The newest archived balance row at `rate` (`Any` = whichever exists).
    pub async fn latest_balance(&self, rate: SampleRate) -> Option<BalanceSample> {
        let archive = self.archive.as_ref()?;
        match archive.latest_balance(rate).await {
            Ok(latest) => latest,
            Err(err) => {
                tracing::warn!(rate = %rate, %err, "failed to load latest balance sample");
                None
            }
        }
    }

    /// Balance rows at `rate`, `from`/`to` inclusive and unbounded when
    /// unset. Failures are logged and yield an empty result.
    pub async fn power_balance_logs(
        &self,
        rate: SampleRate,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Vec<BalanceSample> {
        let Some(archive) = &self.archive else {
            return Vec::new();
        };
        match archive.balance_logs(rate, from, to).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(rate = %rate, %err, "failed to fetch power balance logs");
                Vec::new()
            }
        }
    }

    /// Per-thing rows at `rate` for `thing_ids` (empty = all known things),
    /// `from`/`to` inclusive. Failures are logged and yield an empty result.
    pub async fn thing_power_logs(
        &self,
        rate: SampleRate,
        thing_ids: &[ThingId],
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Vec<ThingSample> {
        let Some(archive) = &self.archive else {
            return Vec::new();
        };
        match archive.thing_logs(rate, thing_ids, from, to).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(rate = %rate, %err, "failed to fetch thing power logs");
                Vec::new()
            }
        }
    }

    /// Advance the sampler. Called once per second with the current
    /// wall-clock time; also usable with a simulated clock in tests.
    pub async fn sample_tick(&self, now: Timestamp) {
        let Some(archive) = &self.archive else {
            return;
        };
        let mut state = self.state.lock().await;
        let Some(&next_minute) = state.next_samples.get(&SampleRate::OneMinute) else {
            return;
        };
        let thing_ids: Vec<ThingId> = state.things_live.keys().copied().collect();

        if now >= next_minute {
            let end = next_minute;
            let start = end - Duration::minutes(1);
            self.patch_minute_gaps(archive, &thing_ids, start).await;
            self.sample_minute(archive, &state, start, end).await;
        }

        for config in &SAMPLE_CONFIGS {
            let Some(&due) = state.next_samples.get(&config.sample_rate) else {
                continue;
            };
            if now < due {
                continue;
            }
            // A newest sample more than one period old means the clock
            // jumped (or samples were missed); refill before aggregating.
            if let (Ok(Some(newest)), Some(expected)) = (
                archive.newest_balance_timestamp(config.sample_rate).await,
                self.window_start(due, config.sample_rate, 1),
            ) {
                if newest < expected {
                    tracing::info!(rate = %config.sample_rate, newest = %newest, "series behind schedule, rectifying");
                    self.rectify_series(archive, &thing_ids, config, due).await;
                }
            }
            self.sample_balance_cascade(archive, config, due).await;
            for &thing_id in &thing_ids {
                self.sample_thing_cascade(archive, config, thing_id, due).await;
            }
        }

        // Trim every series that sampled this tick to its retention window.
        if now >= next_minute {
            if let Some(horizon) =
                self.window_start(next_minute, SampleRate::OneMinute, MAX_MINUTE_SAMPLES)
            {
                self.trim(archive, SampleRate::OneMinute, &thing_ids, horizon)
                    .await;
            }
        }
        for config in &SAMPLE_CONFIGS {
            let Some(&due) = state.next_samples.get(&config.sample_rate) else {
                continue;
            };
            if now >= due {
                if let Some(horizon) =
                    self.window_start(due, config.sample_rate, config.max_samples)
                {
                    self.trim(archive, config.sample_rate, &thing_ids, horizon)
                        .await;
                }
            }
        }

        // Reschedule last: the steps above rely on the pre-tick schedule.
        if now >= next_minute {
            if let Some(next) = self.align(SampleRate::OneMinute, now) {
                state.next_samples.insert(SampleRate::OneMinute, next);
            }
        }
        for config in &SAMPLE_CONFIGS {
            let due = state.next_samples.get(&config.sample_rate).copied();
            if let Some(due) = due {
                if now >= due {
                    if let Some(next) = self.align(config.sample_rate, now) {
                        state.next_samples.insert(config.sample_rate, next);
                    }
                }
            }
        }
    }

    /// The next boundary of `rate` after `t`, aligned in the local timezone.
    fn align(&self, rate: SampleRate, t: Timestamp) -> Option<Timestamp> {
        next_sample_timestamp(rate, t.with_timezone(&self.tz)).map(|dt| dt.with_timezone(&Utc))
    }

    /// The start of a window of `n` periods of `rate` ending at `end`.
    fn window_start(&self, end: Timestamp, rate: SampleRate, n: u32) -> Option<Timestamp> {
        sample_start(end.with_timezone(&self.tz), rate, n).map(|dt| dt.with_timezone(&Utc))
    }

    /// Bulk-insert zero-power 1-minute rows covering a gap in front of
    /// `start`, carrying the latest cumulative totals. One batch per series,
    /// clamped to the 1-minute retention horizon.
    async fn patch_minute_gaps(&self, archive: &A, thing_ids: &[ThingId], start: Timestamp) {
        let horizon = start - Duration::minutes(i64::from(MAX_MINUTE_SAMPLES));

        match archive.latest_balance(SampleRate::OneMinute).await {
            Ok(Some(latest)) if latest.timestamp < start => {
                let mut ts = latest.timestamp.max(horizon) + Duration::minutes(1);
                let mut rows = Vec::new();
                while ts < start {
                    rows.push(BalanceSample::zeroed_at(ts, &latest));
                    ts += Duration::minutes(1);
                }
                if !rows.is_empty() {
                    tracing::info!(count = rows.len(), "patching power balance gap");
                    match archive.insert_balances(SampleRate::OneMinute, &rows).await {
                        Ok(()) => {
                            for row in rows {
                                let _ = self
                                    .publisher
                                    .publish(EnergyEvent::PowerBalanceLogEntryAdded {
                                        sample_rate: SampleRate::OneMinute,
                                        entry: row,
                                    })
                                    .await;
                            }
                        }
                        Err(err) => tracing::warn!(%err, "failed to patch power balance gap"),
                    }
                }
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, "failed to check power balance gap"),
        }

        for &thing_id in thing_ids {
            match archive.latest_thing(thing_id, SampleRate::OneMinute).await {
                Ok(Some(latest)) if latest.timestamp < start => {
                    let mut ts = latest.timestamp.max(horizon) + Duration::minutes(1);
                    let mut rows = Vec::new();
                    while ts < start {
                        rows.push(ThingSample::zeroed_at(ts, &latest));
                        ts += Duration::minutes(1);
                    }
                    if !rows.is_empty() {
                        tracing::info!(thing = %thing_id, count = rows.len(), "patching thing power gap");
                        match archive.insert_things(SampleRate::OneMinute, &rows).await {
                            Ok(()) => {
                                for row in rows {
                                    let _ = self
                                        .publisher
                                        .publish(EnergyEvent::ThingPowerLogEntryAdded {
                                            sample_rate: SampleRate::OneMinute,
                                            entry: row,
                                        })
                                        .await;
                                }
                            }
                            Err(err) => {
                                tracing::warn!(thing = %thing_id, %err, "failed to patch thing power gap");
                            }
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(thing = %thing_id, %err, "failed to check thing power gap"),
            }
        }
    }

    /// Produce the 1-minute samples from the live logs.
    async fn sample_minute(
        &self,
        archive: &A,
        state: &LoggerState,
        start: Timestamp,
        end: Timestamp,
    ) {
        let live = &state.balance_live;
        let sample = BalanceSample {
            timestamp: end,
            consumption: live.time_weighted_average(start, end, |e| e.consumption),
            production: live.time_weighted_average(start, end, |e| e.production),
            acquisition: live.time_weighted_average(start, end, |e| e.acquisition),
            storage: live.time_weighted_average(start, end, |e| e.storage),
            total_consumption: state.totals.total_consumption,
            total_production: state.totals.total_production,
            total_acquisition: state.totals.total_acquisition,
            total_return: state.totals.total_return,
        };
        tracing::debug!(
            end = %end,
            consumption = sample.consumption,
            production = sample.production,
            acquisition = sample.acquisition,
            storage = sample.storage,
            "sampled power balance"
        );
        self.insert_balance_row(archive, SampleRate::OneMinute, sample)
            .await;

        for (&thing_id, live) in &state.things_live {
            let sample = ThingSample {
                timestamp: end,
                thing_id,
                current_power: live.time_weighted_average(start, end, |e| e.current_power),
                total_consumption: state
                    .thing_consumed
                    .get(&thing_id)
                    .map_or(0.0, EnergyCounter::total),
                total_production: state
                    .thing_produced
                    .get(&thing_id)
                    .map_or(0.0, EnergyCounter::total),
            };
            self.insert_thing_row(archive, SampleRate::OneMinute, sample)
                .await;
        }
    }

    /// Aggregate one balance sample of a cascaded rate at boundary `end`.
    async fn sample_balance_cascade(&self, archive: &A, config: &SampleConfig, end: Timestamp) {
        let Some(start) = self.window_start(end, config.sample_rate, 1) else {
            return;
        };
        let rows = match archive.balance_window(config.base_rate, start, end).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(rate = %config.sample_rate, %err, "failed to fetch base samples");
                return;
            }
        };

        let mut sample = BalanceSample {
            timestamp: end,
            ..BalanceSample::default()
        };
        if rows.is_empty() {
            // No base data in the window: carry the totals from wherever the
            // base series left off, or from this series itself once the base
            // has been trimmed away entirely. Totals must never regress.
            let carried = match archive.latest_balance(config.base_rate).await {
                Ok(Some(latest)) => Some(latest),
                Ok(None) => match archive.latest_balance(config.sample_rate).await {
                    Ok(latest) => latest,
                    Err(err) => {
                        tracing::warn!(rate = %config.sample_rate, %err, "failed to fetch newest sample");
                        return;
                    }
                },
                Err(err) => {
                    tracing::warn!(rate = %config.sample_rate, %err, "failed to fetch newest base sample");
                    return;
                }
            };
            if let Some(latest) = carried {
                sample.total_consumption = latest.total_consumption;
                sample.total_production = latest.total_production;
                sample.total_acquisition = latest.total_acquisition;
                sample.total_return = latest.total_return;
            }
        } else {
            for row in &rows {
                sample.consumption += row.consumption;
                sample.production += row.production;
                sample.acquisition += row.acquisition;
                sample.storage += row.storage;
            }
            // Scaling by the rate ratio instead of the row count keeps the
            // units right when the base window is only partially filled.
            let scale = config.base_rate.minutes() as f64 / config.sample_rate.minutes() as f64;
            sample.consumption *= scale;
            sample.production *= scale;
            sample.acquisition *= scale;
            sample.storage *= scale;

            let last = rows[rows.len() - 1];
            sample.total_consumption = last.total_consumption;
            sample.total_production = last.total_production;
            sample.total_acquisition = last.total_acquisition;
            sample.total_return = last.total_return;
        }

        self.insert_balance_row(archive, config.sample_rate, sample)
            .await;
    }

    /// Aggregate one per-thing sample of a cascaded rate at boundary `end`.
    async fn sample_thing_cascade(
        &self,
        archive: &A,
        config: &SampleConfig,
        thing_id: ThingId,
        end: Timestamp,
    ) {
        let Some(start) = self.window_start(end, config.sample_rate, 1) else {
            return;
        };
        let rows = match archive
            .thing_window(thing_id, config.base_rate, start, end)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(thing = %thing_id, rate = %config.sample_rate, %err, "failed to fetch base samples");
                return;
            }
        };

        let mut sample = ThingSample::empty(end, thing_id);
        if rows.is_empty() {
            let carried = match archive.latest_thing(thing_id, config.base_rate).await {
                Ok(Some(latest)) => Some(latest),
                Ok(None) => match archive.latest_thing(thing_id, config.sample_rate).await {
                    Ok(latest) => latest,
                    Err(err) => {
                        tracing::warn!(thing = %thing_id, %err, "failed to fetch newest sample");
                        return;
                    }
                },
                Err(err) => {
                    tracing::warn!(thing = %thing_id, %err, "failed to fetch newest base sample");
                    return;
                }
            };
            if let Some(latest) = carried {
                sample.total_consumption = latest.total_consumption;
                sample.total_production = latest.total_production;
            }
        } else {
            for row in &rows {
                sample.current_power += row.current_power;
            }
            let scale = config.base_rate.minutes() as f64 / config.sample_rate.minutes() as f64;
            sample.current_power *= scale;

            let last = rows[rows.len() - 1];
            sample.total_consumption = last.total_consumption;
            sample.total_production = last.total_production;
        }

        self.insert_thing_row(archive, config.sample_rate, sample)
            .await;
    }

    /// Catch a series up to its schedule after downtime or clock skew.
    ///
    /// The first missed boundary is aggregated in full so base data that
    /// exists is captured; the remaining boundaries are filled with
    /// zero-power rows carrying the series' cumulative totals, clamped to
    /// the retention horizon so an arbitrarily long outage fills a bounded
    /// number of rows.
    async fn rectify_series(
        &self,
        archive: &A,
        thing_ids: &[ThingId],
        config: &SampleConfig,
        due: Timestamp,
    ) {
        tracing::debug!(rate = %config.sample_rate, "checking for missed samples");

        let newest = match archive.newest_balance_timestamp(config.sample_rate).await {
            Ok(newest) => newest,
            Err(err) => {
                tracing::warn!(rate = %config.sample_rate, %err, "failed to read newest sample");
                None
            }
        };
        // A series with no samples at all starts from the oldest base row,
        // so e.g. a yearly sample missed at new year is still created.
        let newest = match newest {
            Some(ts) => Some(ts),
            None => archive
                .oldest_balance_timestamp(config.base_rate)
                .await
                .ok()
                .flatten(),
        };

        if let Some(mut cursor) = newest {
            if let Some(first) = self.align(config.sample_rate, cursor) {
                if first < due {
                    self.sample_balance_cascade(archive, config, first).await;
                    cursor = first;
                }
            }
            if let Some(horizon) = self.window_start(due, config.sample_rate, config.max_samples) {
                cursor = cursor.max(horizon);
            }

            let basis = archive
                .latest_balance(config.sample_rate)
                .await
                .ok()
                .flatten()
                .unwrap_or_default();
            let mut rows = Vec::new();
            while let Some(next) = self.align(config.sample_rate, cursor) {
                if next >= due {
                    break;
                }
                rows.push(BalanceSample::zeroed_at(next, &basis));
                cursor = next;
            }
            if !rows.is_empty() {
                tracing::info!(rate = %config.sample_rate, count = rows.len(), "rectifying missed balance samples");
                match archive.insert_balances(config.sample_rate, &rows).await {
                    Ok(()) => {
                        for row in rows {
                            let _ = self
                                .publisher
                                .publish(EnergyEvent::PowerBalanceLogEntryAdded {
                                    sample_rate: config.sample_rate,
                                    entry: row,
                                })
                                .await;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(rate = %config.sample_rate, %err, "failed to rectify balance samples");
                    }
                }
            }
        }

        for &thing_id in thing_ids {
            let newest = archive
                .newest_thing_timestamp(thing_id, config.sample_rate)
                .await
                .ok()
                .flatten();
            let newest = match newest {
                Some(ts) => Some(ts),
                None => archive
                    .oldest_thing_timestamp(thing_id, config.base_rate)
                    .await
                    .ok()
                    .flatten(),
            };
            let Some(mut cursor) = newest else {
                continue;
            };

            if let Some(first) = self.align(config.sample_rate, cursor) {
                if first < due {
                    self.sample_thing_cascade(archive, config, thing_id, first)
                        .await;
                    cursor = first;
                }
            }
            if let Some(horizon) = self.window_start(due, config.sample_rate, config.max_samples) {
                cursor = cursor.max(horizon);
            }

            let basis = archive
                .latest_thing(thing_id, config.sample_rate)
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| ThingSample::empty(cursor, thing_id));
            let mut rows = Vec::new();
            while let Some(next) = self.align(config.sample_rate, cursor) {
                if next >= due {
                    break;
                }
                rows.push(ThingSample::zeroed_at(next, &basis));
                cursor = next;
            }
            if !rows.is_empty() {
                tracing::info!(thing = %thing_id, rate = %config.sample_rate, count = rows.len(), "rectifying missed thing samples");
                match archive.insert_things(config.sample_rate, &rows).await {
                    Ok(()) => {
                        for row in rows {
                            let _ = self
                                .publisher
                                .publish(EnergyEvent::ThingPowerLogEntryAdded {
                                    sample_rate: config.sample_rate,
                                    entry: row,
                                })
                                .await;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(thing = %thing_id, rate = %config.sample_rate, %err, "failed to rectify thing samples");
                    }
                }
            }
        }
    }

    async fn trim(
        &self,
        archive: &A,
        rate: SampleRate,
        thing_ids: &[ThingId],
        older_than: Timestamp,
    ) {
        match archive.trim_balance(rate, older_than).await {
            Ok(trimmed) if trimmed > 0 => {
                tracing::debug!(rate = %rate, trimmed, older_than = %older_than, "trimmed power balance series");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(rate = %rate, %err, "failed to trim power balance series"),
        }
        for &thing_id in thing_ids {
            match archive.trim_thing(thing_id, rate, older_than).await {
                Ok(trimmed) if trimmed > 0 => {
                    tracing::debug!(thing = %thing_id, rate = %rate, trimmed, "trimmed thing power series");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(thing = %thing_id, rate = %rate, %err, "failed to trim thing power series");
                }
            }
        }
    }

    async fn insert_balance_row(&self, archive: &A, rate: SampleRate, sample: BalanceSample) {
        match archive.insert_balance(rate, &sample).await {
            Ok(()) => {
                let _ = self
                    .publisher
                    .publish(EnergyEvent::PowerBalanceLogEntryAdded {
                        sample_rate: rate,
                        entry: sample,
                    })
                    .await;
            }
            Err(err) => tracing::warn!(rate = %rate, %err, "failed to insert balance sample"),
        }
    }

    async fn insert_thing_row(&self, archive: &A, rate: SampleRate, sample: ThingSample) {
        match archive.insert_thing(rate, &sample).await {
            Ok(()) => {
                let _ = self
                    .publisher
                    .publish(EnergyEvent::ThingPowerLogEntryAdded {
                        sample_rate: rate,
                        entry: sample,
                    })
                    .await;
            }
            Err(err) => {
                tracing::warn!(thing = %sample.thing_id, rate = %rate, %err, "failed to insert thing sample");
            }
        }
    }
}
