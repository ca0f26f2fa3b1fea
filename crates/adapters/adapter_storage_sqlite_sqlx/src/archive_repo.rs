//! `SQLite` implementation of the [`Archive`] port.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use energyhub_app::ports::{Archive, ThingCounterCache};
use energyhub_domain::balance::{BalanceSample, ThingSample};
use energyhub_domain::error::EnergyHubError;
use energyhub_domain::id::ThingId;
use energyhub_domain::sample_rate::SampleRate;
use energyhub_domain::time::{Timestamp, from_millis, to_millis};

use crate::error::StorageError;

/// Wrapper for converting database rows into domain types without polluting
/// domain structs with database concerns.
struct BalanceRow(BalanceSample);

impl<'r> FromRow<'r, SqliteRow> for BalanceRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let millis: i64 = row.try_get("timestamp")?;
        let timestamp = decode_timestamp(millis)?;

        Ok(Self(BalanceSample {
            timestamp,
            consumption: row.try_get("consumption")?,
            production: row.try_get("production")?,
            acquisition: row.try_get("acquisition")?,
            storage: row.try_get("storage")?,
            total_consumption: row.try_get("totalConsumption")?,
            total_production: row.try_get("totalProduction")?,
            total_acquisition: row.try_get("totalAcquisition")?,
            total_return: row.try_get("totalReturn")?,
        }))
    }
}

struct ThingRow(ThingSample);

impl<'r> FromRow<'r, SqliteRow> for ThingRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let millis: i64 = row.try_get("timestamp")?;
        let timestamp = decode_timestamp(millis)?;
        let thing_id: uuid::Uuid = row.try_get("thingId")?;

        Ok(Self(ThingSample {
            timestamp,
            thing_id: ThingId::from_uuid(thing_id),
            current_power: row.try_get("currentPower")?,
            total_consumption: row.try_get("totalConsumption")?,
            total_production: row.try_get("totalProduction")?,
        }))
    }
}

fn decode_timestamp(millis: i64) -> Result<Timestamp, sqlx::Error> {
    from_millis(millis)
        .ok_or_else(|| sqlx::Error::Decode(Box::new(StorageError::InvalidTimestamp(millis))))
}

const INSERT_BALANCE: &str = r"
    INSERT INTO powerBalance (timestamp, sampleRate, consumption, production, acquisition, storage,
                              totalConsumption, totalProduction, totalAcquisition, totalReturn)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

const INSERT_THING: &str = r"
    INSERT INTO thingPower (timestamp, sampleRate, thingId, currentPower, totalConsumption, totalProduction)
    VALUES (?, ?, ?, ?, ?, ?)
";

const SELECT_BALANCE: &str = r"
    SELECT * FROM powerBalance
    WHERE sampleRate = ?
      AND (? IS NULL OR timestamp >= ?)
      AND (? IS NULL OR timestamp <= ?)
    ORDER BY timestamp ASC
";

const SELECT_THING_ALL: &str = r"
    SELECT * FROM thingPower
    WHERE sampleRate = ?
      AND (? IS NULL OR timestamp >= ?)
      AND (? IS NULL OR timestamp <= ?)
    ORDER BY timestamp ASC
";

const SELECT_THING_ONE: &str = r"
    SELECT * FROM thingPower
    WHERE thingId = ? AND sampleRate = ?
      AND (? IS NULL OR timestamp >= ?)
      AND (? IS NULL OR timestamp <= ?)
    ORDER BY timestamp ASC
";

const SELECT_BALANCE_WINDOW: &str = r"
    SELECT * FROM powerBalance
    WHERE sampleRate = ? AND timestamp > ? AND timestamp <= ?
    ORDER BY timestamp ASC
";

const SELECT_THING_WINDOW: &str = r"
    SELECT * FROM thingPower
    WHERE thingId = ? AND sampleRate = ? AND timestamp > ? AND timestamp <= ?
    ORDER BY timestamp ASC
";

const SELECT_LATEST_BALANCE: &str =
    "SELECT * FROM powerBalance WHERE sampleRate = ? ORDER BY timestamp DESC LIMIT 1";
const SELECT_LATEST_BALANCE_ANY: &str =
    "SELECT * FROM powerBalance ORDER BY timestamp DESC LIMIT 1";
const SELECT_LATEST_THING: &str =
    "SELECT * FROM thingPower WHERE thingId = ? AND sampleRate = ? ORDER BY timestamp DESC LIMIT 1";
const SELECT_LATEST_THING_ANY: &str =
    "SELECT * FROM thingPower WHERE thingId = ? ORDER BY timestamp DESC LIMIT 1";

const OLDEST_BALANCE: &str = "SELECT MIN(timestamp) FROM powerBalance WHERE sampleRate = ?";
const NEWEST_BALANCE: &str = "SELECT MAX(timestamp) FROM powerBalance WHERE sampleRate = ?";
const OLDEST_THING: &str =
    "SELECT MIN(timestamp) FROM thingPower WHERE thingId = ? AND sampleRate = ?";
const NEWEST_THING: &str =
    "SELECT MAX(timestamp) FROM thingPower WHERE thingId = ? AND sampleRate = ?";

const TRIM_BALANCE: &str = "DELETE FROM powerBalance WHERE sampleRate = ? AND timestamp < ?";
const TRIM_THING: &str =
    "DELETE FROM thingPower WHERE thingId = ? AND sampleRate = ? AND timestamp < ?";

const UPSERT_THING_CACHE: &str = r"
    INSERT INTO thingCache (thingId, totalEnergyConsumed, totalEnergyProduced)
    VALUES (?, ?, ?)
    ON CONFLICT(thingId) DO UPDATE
    SET totalEnergyConsumed = excluded.totalEnergyConsumed,
        totalEnergyProduced = excluded.totalEnergyProduced
";

const SELECT_THING_CACHE: &str =
    "SELECT totalEnergyConsumed, totalEnergyProduced FROM thingCache WHERE thingId = ?";

const DISTINCT_THINGS: &str = "SELECT DISTINCT thingId FROM thingPower";

const DELETE_THING_LOGS: &str = "DELETE FROM thingPower WHERE thingId = ?";
const DELETE_THING_CACHE: &str = "DELETE FROM thingCache WHERE thingId = ?";

/// `SQLite`-backed archive.
pub struct SqliteArchive {
    pool: SqlitePool,
}

impl SqliteArchive {
    /// Create a new archive using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl Archive for SqliteArchive {
    async fn insert_balance(
        &self,
        rate: SampleRate,
        sample: &BalanceSample,
    ) -> Result<(), EnergyHubError> {
        sqlx::query(INSERT_BALANCE)
            .bind(to_millis(sample.timestamp))
            .bind(rate.minutes())
            .bind(sample.consumption)
            .bind(sample.production)
            .bind(sample.acquisition)
            .bind(sample.storage)
            .bind(sample.total_consumption)
            .bind(sample.total_production)
            .bind(sample.total_acquisition)
            .bind(sample.total_return)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn insert_balances(
        &self,
        rate: SampleRate,
        samples: &[BalanceSample],
    ) -> Result<(), EnergyHubError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        for sample in samples {
            sqlx::query(INSERT_BALANCE)
                .bind(to_millis(sample.timestamp))
                .bind(rate.minutes())
                .bind(sample.consumption)
                .bind(sample.production)
                .bind(sample.acquisition)
                .bind(sample.storage)
                .bind(sample.total_consumption)
                .bind(sample.total_production)
                .bind(sample.total_acquisition)
                .bind(sample.total_return)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }
        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn insert_thing(
        &self,
        rate: SampleRate,
        sample: &ThingSample,
    ) -> Result<(), EnergyHubError> {
        sqlx::query(INSERT_THING)
            .bind(to_millis(sample.timestamp))
            .bind(rate.minutes())
            .bind(sample.thing_id.as_uuid())
            .bind(sample.current_power)
            .bind(sample.total_consumption)
            .bind(sample.total_production)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn insert_things(
        &self,
        rate: SampleRate,
        samples: &[ThingSample],
    ) -> Result<(), EnergyHubError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        for sample in samples {
            sqlx::query(INSERT_THING)
                .bind(to_millis(sample.timestamp))
                .bind(rate.minutes())
                .bind(sample.thing_id.as_uuid())
                .bind(sample.current_power)
                .bind(sample.total_consumption)
                .bind(sample.total_production)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }
        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn balance_logs(
        &self,
        rate: SampleRate,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<BalanceSample>, EnergyHubError> {
        let from = from.map(to_millis);
        let to = to.map(to_millis);
        let rows: Vec<BalanceRow> = sqlx::query_as(SELECT_BALANCE)
            .bind(rate.minutes())
            .bind(from)
            .bind(from)
            .bind(to)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn thing_logs(
        &self,
        rate: SampleRate,
        thing_ids: &[ThingId],
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<ThingSample>, EnergyHubError> {
        let from = from.map(to_millis);
        let to = to.map(to_millis);

        if thing_ids.is_empty() {
            let rows: Vec<ThingRow> = sqlx::query_as(SELECT_THING_ALL)
                .bind(rate.minutes())
                .bind(from)
                .bind(from)
                .bind(to)
                .bind(to)
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
            return Ok(rows.into_iter().map(|r| r.0).collect());
        }

        let mut samples = Vec::new();
        for thing_id in thing_ids {
            let rows: Vec<ThingRow> = sqlx::query_as(SELECT_THING_ONE)
                .bind(thing_id.as_uuid())
                .bind(rate.minutes())
                .bind(from)
                .bind(from)
                .bind(to)
                .bind(to)
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
            samples.extend(rows.into_iter().map(|r| r.0));
        }
        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }

    async fn balance_window(
        &self,
        rate: SampleRate,
        after: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<BalanceSample>, EnergyHubError> {
        let rows: Vec<BalanceRow> = sqlx::query_as(SELECT_BALANCE_WINDOW)
            .bind(rate.minutes())
            .bind(to_millis(after))
            .bind(to_millis(until))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn thing_window(
        &self,
        thing_id: ThingId,
        rate: SampleRate,
        after: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<ThingSample>, EnergyHubError> {
        let rows: Vec<ThingRow> = sqlx::query_as(SELECT_THING_WINDOW)
            .bind(thing_id.as_uuid())
            .bind(rate.minutes())
            .bind(to_millis(after))
            .bind(to_millis(until))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn latest_balance(
        &self,
        rate: SampleRate,
    ) -> Result<Option<BalanceSample>, EnergyHubError> {
        let row: Option<BalanceRow> = if rate == SampleRate::Any {
            sqlx::query_as(SELECT_LATEST_BALANCE_ANY)
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?
        } else {
            sqlx::query_as(SELECT_LATEST_BALANCE)
                .bind(rate.minutes())
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?
        };
        Ok(row.map(|r| r.0))
    }

    async fn latest_thing(
        &self,
        thing_id: ThingId,
        rate: SampleRate,
    ) -> Result<Option<ThingSample>, EnergyHubError> {
        let row: Option<ThingRow> = if rate == SampleRate::Any {
            sqlx::query_as(SELECT_LATEST_THING_ANY)
                .bind(thing_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?
        } else {
            sqlx::query_as(SELECT_LATEST_THING)
                .bind(thing_id.as_uuid())
                .bind(rate.minutes())
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?
        };
        Ok(row.map(|r| r.0))
    }

    async fn oldest_balance_timestamp(
        &self,
        rate: SampleRate,
    ) -> Result<Option<Timestamp>, EnergyHubError> {
        let millis: Option<i64> = sqlx::query_scalar(OLDEST_BALANCE)
            .bind(rate.minutes())
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(millis.and_then(from_millis))
    }

    async fn newest_balance_timestamp(
        &self,
        rate: SampleRate,
    ) -> Result<Option<Timestamp>, EnergyHubError> {
        let millis: Option<i64> = sqlx::query_scalar(NEWEST_BALANCE)
            .bind(rate.minutes())
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(millis.and_then(from_millis))
    }

    async fn oldest_thing_timestamp(
        &self,
        thing_id: ThingId,
        rate: SampleRate,
    ) -> Result<Option<Timestamp>, EnergyHubError> {
        let millis: Option<i64> = sqlx::query_scalar(OLDEST_THING)
            .bind(thing_id.as_uuid())
            .bind(rate.minutes())
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(millis.and_then(from_millis))
    }

    async fn newest_thing_timestamp(
        &self,
        thing_id: ThingId,
        rate: SampleRate,
    ) -> Result<Option<Timestamp>, EnergyHubError> {
        let millis: Option<i64> = sqlx::query_scalar(NEWEST_THING)
            .bind(thing_id.as_uuid())
            .bind(rate.minutes())
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(millis.and_then(from_millis))
    }

    async fn trim_balance(
        &self,
        rate: SampleRate,
        older_than: Timestamp,
    ) -> Result<u64, EnergyHubError> {
        let result = sqlx::query(TRIM_BALANCE)
            .bind(rate.minutes())
            .bind(to_millis(older_than))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(result.rows_affected())
    }

    async fn trim_thing(
        &self,
        thing_id: ThingId,
        rate: SampleRate,
        older_than: Timestamp,
    ) -> Result<u64, EnergyHubError> {
        let result = sqlx::query(TRIM_THING)
            .bind(thing_id.as_uuid())
            .bind(rate.minutes())
            .bind(to_millis(older_than))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(result.rows_affected())
    }

    async fn upsert_thing_cache(
        &self,
        thing_id: ThingId,
        total_energy_consumed: f64,
        total_energy_produced: f64,
    ) -> Result<(), EnergyHubError> {
        sqlx::query(UPSERT_THING_CACHE)
            .bind(thing_id.as_uuid())
            .bind(total_energy_consumed)
            .bind(total_energy_produced)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn thing_cache(
        &self,
        thing_id: ThingId,
    ) -> Result<Option<ThingCounterCache>, EnergyHubError> {
        let row = sqlx::query(SELECT_THING_CACHE)
            .bind(thing_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        match row {
            Some(row) => {
                let total_energy_consumed: f64 = row
                    .try_get("totalEnergyConsumed")
                    .map_err(StorageError::from)?;
                let total_energy_produced: f64 = row
                    .try_get("totalEnergyProduced")
                    .map_err(StorageError::from)?;
                Ok(Some(ThingCounterCache {
                    thing_id,
                    total_energy_consumed,
                    total_energy_produced,
                }))
            }
            None => Ok(None),
        }
    }

    async fn logged_things(&self) -> Result<Vec<ThingId>, EnergyHubError> {
        let rows = sqlx::query(DISTINCT_THINGS)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let uuid: uuid::Uuid = row.try_get("thingId").map_err(StorageError::from)?;
            ids.push(ThingId::from_uuid(uuid));
        }
        Ok(ids)
    }

    async fn remove_thing_logs(&self, thing_id: ThingId) -> Result<(), EnergyHubError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        sqlx::query(DELETE_THING_LOGS)
            .bind(thing_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        sqlx::query(DELETE_THING_CACHE)
            .bind(thing_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use chrono::Duration;

    async fn setup() -> SqliteArchive {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteArchive::new(db.pool().clone())
    }

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn balance_at(timestamp: Timestamp, consumption: f64, total_consumption: f64) -> BalanceSample {
        BalanceSample {
            timestamp,
            consumption,
            production: 0.0,
            acquisition: consumption,
            storage: 0.0,
            total_consumption,
            total_production: 0.0,
            total_acquisition: total_consumption,
            total_return: 0.0,
        }
    }

    fn thing_at(timestamp: Timestamp, thing_id: ThingId, power: f64) -> ThingSample {
        ThingSample {
            timestamp,
            thing_id,
            current_power: power,
            total_consumption: 0.0,
            total_production: 0.0,
        }
    }

    #[tokio::test]
    async fn should_roundtrip_balance_sample() {
        let archive = setup().await;
        let sample = balance_at(ts("2024-03-15T10:00:00Z"), 500.0, 1.5);

        archive
            .insert_balance(SampleRate::OneMinute, &sample)
            .await
            .unwrap();

        let rows = archive
            .balance_logs(SampleRate::OneMinute, None, None)
            .await
            .unwrap();
        assert_eq!(rows, vec![sample]);
    }

    #[tokio::test]
    async fn should_separate_series_by_sample_rate() {
        let archive = setup().await;
        let minute = balance_at(ts("2024-03-15T10:00:00Z"), 100.0, 0.1);
        let quarter = balance_at(ts("2024-03-15T10:00:00Z"), 200.0, 0.2);

        archive
            .insert_balance(SampleRate::OneMinute, &minute)
            .await
            .unwrap();
        archive
            .insert_balance(SampleRate::FifteenMinutes, &quarter)
            .await
            .unwrap();

        let rows = archive
            .balance_logs(SampleRate::FifteenMinutes, None, None)
            .await
            .unwrap();
        assert_eq!(rows, vec![quarter]);
    }

    #[tokio::test]
    async fn should_apply_inclusive_query_bounds() {
        let archive = setup().await;
        for (minute, consumption) in [(0u32, 1.0), (15, 2.0), (30, 3.0)] {
            let sample = balance_at(
                ts("2024-03-15T10:00:00Z") + Duration::minutes(i64::from(minute)),
                consumption,
                consumption,
            );
            archive
                .insert_balance(SampleRate::FifteenMinutes, &sample)
                .await
                .unwrap();
        }

        let rows = archive
            .balance_logs(
                SampleRate::FifteenMinutes,
                Some(ts("2024-03-15T10:15:00Z")),
                Some(ts("2024-03-15T10:30:00Z")),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, ts("2024-03-15T10:15:00Z"));
        assert_eq!(rows[1].timestamp, ts("2024-03-15T10:30:00Z"));
    }

    #[tokio::test]
    async fn should_exclude_window_start_and_include_window_end() {
        let archive = setup().await;
        for minute in [45u32, 50, 55, 60] {
            let sample = balance_at(
                ts("2024-03-15T10:00:00Z") + Duration::minutes(i64::from(minute)),
                1.0,
                1.0,
            );
            archive
                .insert_balance(SampleRate::OneMinute, &sample)
                .await
                .unwrap();
        }

        let rows = archive
            .balance_window(
                SampleRate::OneMinute,
                ts("2024-03-15T10:45:00Z"),
                ts("2024-03-15T11:00:00Z"),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].timestamp, ts("2024-03-15T10:50:00Z"));
        assert_eq!(rows[2].timestamp, ts("2024-03-15T11:00:00Z"));
    }

    #[tokio::test]
    async fn should_insert_batch_atomically_and_in_order() {
        let archive = setup().await;
        let samples: Vec<BalanceSample> = (0..5)
            .map(|i| {
                balance_at(
                    ts("2024-03-15T10:00:00Z") + Duration::minutes(i),
                    100.0,
                    f64::from(i as i32) / 10.0,
                )
            })
            .collect();

        archive
            .insert_balances(SampleRate::OneMinute, &samples)
            .await
            .unwrap();

        let rows = archive
            .balance_logs(SampleRate::OneMinute, None, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn should_return_latest_balance_per_rate_and_any() {
        let archive = setup().await;
        let minute = balance_at(ts("2024-03-15T10:59:00Z"), 100.0, 0.5);
        let quarter = balance_at(ts("2024-03-15T10:45:00Z"), 200.0, 0.4);
        archive
            .insert_balance(SampleRate::OneMinute, &minute)
            .await
            .unwrap();
        archive
            .insert_balance(SampleRate::FifteenMinutes, &quarter)
            .await
            .unwrap();

        let latest = archive
            .latest_balance(SampleRate::FifteenMinutes)
            .await
            .unwrap();
        assert_eq!(latest, Some(quarter));

        // `Any` returns the newest row across all rates.
        let latest = archive.latest_balance(SampleRate::Any).await.unwrap();
        assert_eq!(latest, Some(minute));
    }

    #[tokio::test]
    async fn should_return_absent_latest_for_empty_series() {
        let archive = setup().await;
        assert_eq!(archive.latest_balance(SampleRate::Any).await.unwrap(), None);
        assert_eq!(
            archive
                .latest_thing(ThingId::new(), SampleRate::OneMinute)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn should_track_oldest_and_newest_timestamps() {
        let archive = setup().await;
        let older = balance_at(ts("2024-03-15T10:00:00Z"), 1.0, 0.1);
        let newer = balance_at(ts("2024-03-15T11:00:00Z"), 2.0, 0.2);
        archive
            .insert_balance(SampleRate::OneHour, &older)
            .await
            .unwrap();
        archive
            .insert_balance(SampleRate::OneHour, &newer)
            .await
            .unwrap();

        assert_eq!(
            archive
                .oldest_balance_timestamp(SampleRate::OneHour)
                .await
                .unwrap(),
            Some(older.timestamp)
        );
        assert_eq!(
            archive
                .newest_balance_timestamp(SampleRate::OneHour)
                .await
                .unwrap(),
            Some(newer.timestamp)
        );
        assert_eq!(
            archive
                .oldest_balance_timestamp(SampleRate::OneDay)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn should_trim_rows_strictly_older_than_horizon() {
        let archive = setup().await;
        for minute in 0..5 {
            let sample = balance_at(
                ts("2024-03-15T10:00:00Z") + Duration::minutes(minute),
                1.0,
                1.0,
            );
            archive
                .insert_balance(SampleRate::OneMinute, &sample)
                .await
                .unwrap();
        }

        let trimmed = archive
            .trim_balance(SampleRate::OneMinute, ts("2024-03-15T10:03:00Z"))
            .await
            .unwrap();
        assert_eq!(trimmed, 3);

        let rows = archive
            .balance_logs(SampleRate::OneMinute, None, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, ts("2024-03-15T10:03:00Z"));
    }

    #[tokio::test]
    async fn should_filter_thing_logs_by_ids() {
        let archive = setup().await;
        let thing_a = ThingId::new();
        let thing_b = ThingId::new();
        archive
            .insert_thing(
                SampleRate::OneMinute,
                &thing_at(ts("2024-03-15T10:00:00Z"), thing_a, 100.0),
            )
            .await
            .unwrap();
        archive
            .insert_thing(
                SampleRate::OneMinute,
                &thing_at(ts("2024-03-15T10:01:00Z"), thing_b, 200.0),
            )
            .await
            .unwrap();

        let only_a = archive
            .thing_logs(SampleRate::OneMinute, &[thing_a], None, None)
            .await
            .unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].thing_id, thing_a);

        // An empty filter unions over all known things.
        let all = archive
            .thing_logs(SampleRate::OneMinute, &[], None, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn should_upsert_and_load_thing_cache() {
        let archive = setup().await;
        let thing_id = ThingId::new();

        assert_eq!(archive.thing_cache(thing_id).await.unwrap(), None);

        archive.upsert_thing_cache(thing_id, 1.5, 0.5).await.unwrap();
        archive.upsert_thing_cache(thing_id, 2.0, 0.7).await.unwrap();

        let cache = archive.thing_cache(thing_id).await.unwrap().unwrap();
        assert_eq!(cache.total_energy_consumed, 2.0);
        assert_eq!(cache.total_energy_produced, 0.7);
    }

    #[tokio::test]
    async fn should_list_distinct_logged_things() {
        let archive = setup().await;
        let thing_id = ThingId::new();
        for minute in 0..3 {
            archive
                .insert_thing(
                    SampleRate::OneMinute,
                    &thing_at(
                        ts("2024-03-15T10:00:00Z") + Duration::minutes(minute),
                        thing_id,
                        100.0,
                    ),
                )
                .await
                .unwrap();
        }

        let things = archive.logged_things().await.unwrap();
        assert_eq!(things, vec![thing_id]);
    }

    #[tokio::test]
    async fn should_remove_thing_logs_and_cache() {
        let archive = setup().await;
        let thing_id = ThingId::new();
        archive
            .insert_thing(
                SampleRate::OneMinute,
                &thing_at(ts("2024-03-15T10:00:00Z"), thing_id, 100.0),
            )
            .await
            .unwrap();
        archive.upsert_thing_cache(thing_id, 1.0, 0.0).await.unwrap();

        archive.remove_thing_logs(thing_id).await.unwrap();

        assert!(archive.logged_things().await.unwrap().is_empty());
        assert_eq!(archive.thing_cache(thing_id).await.unwrap(), None);
    }
}
