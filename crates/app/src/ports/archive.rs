//! Archive port — the durable time-series store.
//!
//! One row per (series, rate, timestamp); rows are immutable once inserted
//! and removed only by trimming. Batch inserts are the transactional write
//! path: every row of a batch becomes durable atomically or not at all.
//! Callers publish `EntryAdded` notifications only after an insert call has
//! returned successfully, which keeps the notify-after-commit contract in
//! one place.

use std::future::Future;

use energyhub_domain::balance::{BalanceSample, ThingSample};
use energyhub_domain::error::EnergyHubError;
use energyhub_domain::id::ThingId;
use energyhub_domain::sample_rate::SampleRate;
use energyhub_domain::time::Timestamp;

/// Last *raw* device counters seen for a thing, persisted so a controller
/// restart does not double-count energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThingCounterCache {
    pub thing_id: ThingId,
    pub total_energy_consumed: f64,
    pub total_energy_produced: f64,
}

/// Repository for archived balance and per-thing power series.
pub trait Archive {
    /// Insert one balance row.
    fn insert_balance(
        &self,
        rate: SampleRate,
        sample: &BalanceSample,
    ) -> impl Future<Output = Result<(), EnergyHubError>> + Send;

    /// Insert a batch of balance rows atomically.
    fn insert_balances(
        &self,
        rate: SampleRate,
        samples: &[BalanceSample],
    ) -> impl Future<Output = Result<(), EnergyHubError>> + Send;

    /// Insert one per-thing row.
    fn insert_thing(
        &self,
        rate: SampleRate,
        sample: &ThingSample,
    ) -> impl Future<Output = Result<(), EnergyHubError>> + Send;

    /// Insert a batch of per-thing rows atomically.
    fn insert_things(
        &self,
        rate: SampleRate,
        samples: &[ThingSample],
    ) -> impl Future<Output = Result<(), EnergyHubError>> + Send;

    /// Balance rows at `rate` with `from`/`to` inclusive; an unset bound is
    /// unbounded on that side. Ordered by timestamp ascending.
    fn balance_logs(
        &self,
        rate: SampleRate,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> impl Future<Output = Result<Vec<BalanceSample>, EnergyHubError>> + Send;

    /// Per-thing rows at `rate` for the given things (empty = all things),
    /// `from`/`to` inclusive. Ordered by timestamp ascending.
    fn thing_logs(
        &self,
        rate: SampleRate,
        thing_ids: &[ThingId],
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> impl Future<Output = Result<Vec<ThingSample>, EnergyHubError>> + Send;

    /// Balance rows in the half-open sampling window `(after, until]`,
    /// ordered by timestamp ascending.
    fn balance_window(
        &self,
        rate: SampleRate,
        after: Timestamp,
        until: Timestamp,
    ) -> impl Future<Output = Result<Vec<BalanceSample>, EnergyHubError>> + Send;

    /// Per-thing rows in the half-open sampling window `(after, until]`,
    /// ordered by timestamp ascending.
    fn thing_window(
        &self,
        thing_id: ThingId,
        rate: SampleRate,
        after: Timestamp,
        until: Timestamp,
    ) -> impl Future<Output = Result<Vec<ThingSample>, EnergyHubError>> + Send;

    /// The row with the largest timestamp at `rate`; [`SampleRate::Any`]
    /// means whichever rate exists.
    fn latest_balance(
        &self,
        rate: SampleRate,
    ) -> impl Future<Output = Result<Option<BalanceSample>, EnergyHubError>> + Send;

    /// The row with the largest timestamp for a thing at `rate` (`Any`
    /// allowed).
    fn latest_thing(
        &self,
        thing_id: ThingId,
        rate: SampleRate,
    ) -> impl Future<Output = Result<Option<ThingSample>, EnergyHubError>> + Send;

    fn oldest_balance_timestamp(
        &self,
        rate: SampleRate,
    ) -> impl Future<Output = Result<Option<Timestamp>, EnergyHubError>> + Send;

    fn newest_balance_timestamp(
        &self,
        rate: SampleRate,
    ) -> impl Future<Output = Result<Option<Timestamp>, EnergyHubError>> + Send;

    fn oldest_thing_timestamp(
        &self,
        thing_id: ThingId,
        rate: SampleRate,
    ) -> impl Future<Output = Result<Option<Timestamp>, EnergyHubError>> + Send;

    fn newest_thing_timestamp(
        &self,
        thing_id: ThingId,
        rate: SampleRate,
    ) -> impl Future<Output = Result<Option<Timestamp>, EnergyHubError>> + Send;

    /// Delete balance rows at `rate` strictly older than `older_than`,
    /// returning the number of rows removed.
    fn trim_balance(
        &self,
        rate: SampleRate,
        older_than: Timestamp,
    ) -> impl Future<Output = Result<u64, EnergyHubError>> + Send;

    /// Delete per-thing rows strictly older than `older_than`, returning the
    /// number of rows removed.
    fn trim_thing(
        &self,
        thing_id: ThingId,
        rate: SampleRate,
        older_than: Timestamp,
    ) -> impl Future<Output = Result<u64, EnergyHubError>> + Send;

    /// Upsert the last raw counters seen for a thing.
    fn upsert_thing_cache(
        &self,
        thing_id: ThingId,
        total_energy_consumed: f64,
        total_energy_produced: f64,
    ) -> impl Future<Output = Result<(), EnergyHubError>> + Send;

    /// Load the persisted raw counters for a thing, if any.
    fn thing_cache(
        &self,
        thing_id: ThingId,
    ) -> impl Future<Output = Result<Option<ThingCounterCache>, EnergyHubError>> + Send;

    /// All things that have archived rows, across all rates.
    fn logged_things(
        &self,
    ) -> impl Future<Output = Result<Vec<ThingId>, EnergyHubError>> + Send;

    /// Drop every archived row and the counter cache of a thing.
    fn remove_thing_logs(
        &self,
        thing_id: ThingId,
    ) -> impl Future<Output = Result<(), EnergyHubError>> + Send;
}
