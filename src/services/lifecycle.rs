use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;

use crate::db::queries::{self, CompletionScope};
use crate::errors::AppError;
use crate::services::clock::Clock;
use crate::services::validation::DayScope;
use crate::state::AppState;

/// Marks one day's elapsed bookings for a centre and sport as Completed.
/// Safe to repeat: already-completed rows are never touched again.
pub fn complete_elapsed_for_day(
    conn: &Connection,
    clock: &dyn Clock,
    scope: &DayScope,
) -> Result<usize, AppError> {
    let now = clock.now();
    let count = queries::complete_elapsed_bookings(
        conn,
        &now,
        Some(CompletionScope {
            centre_id: &scope.centre_id,
            sport_id: &scope.sport_id,
            date: &scope.date,
        }),
    )?;

    if count > 0 {
        tracing::info!(
            centre_id = %scope.centre_id,
            sport_id = %scope.sport_id,
            date = %scope.date,
            count,
            "bookings completed"
        );
    }
    Ok(count)
}

/// Marks every elapsed booking in the store as Completed.
pub fn complete_all_elapsed(conn: &Connection, clock: &dyn Clock) -> Result<usize, AppError> {
    let now = clock.now();
    let count = queries::complete_elapsed_bookings(conn, &now, None)?;
    if count > 0 {
        tracing::info!(count, "bookings completed");
    }
    Ok(count)
}

/// Runs [`complete_all_elapsed`] every `sweep_interval_secs` until the runtime
/// shuts down. Returns `None` when the interval is configured as 0.
pub fn spawn_sweeper(state: Arc<AppState>) -> Option<tokio::task::JoinHandle<()>> {
    let secs = state.config.sweep_interval_secs;
    if secs == 0 {
        return None;
    }
    let every = Duration::from_secs(secs);
    tracing::info!("completion sweep every {secs}s");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let result = state
                .conn()
                .and_then(|db| complete_all_elapsed(&db, state.clock.as_ref()));
            if let Err(e) = result {
                tracing::error!(error = %e, "completion sweep failed");
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::db::queries;
    use crate::models::BookingType;
    use crate::services::allocator::RandomPicker;
    use crate::services::clock::FixedClock;
    use crate::services::scheduling::create_booking;
    use crate::services::scheduling::tests::{day, request, setup_db, ts, CENTRE, SPORT};

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn scope() -> DayScope {
        DayScope {
            centre_id: CENTRE.to_string(),
            sport_id: SPORT.to_string(),
            date: day(),
        }
    }

    fn types(conn: &Connection) -> Vec<(u8, BookingType)> {
        queries::list_booking_views(conn, CENTRE, SPORT, &day())
            .unwrap()
            .into_iter()
            .map(|v| (v.booking.start_hour, v.booking.booking_type))
            .collect()
    }

    #[test]
    fn test_only_ended_bookings_complete() {
        let (mut conn, courts) = setup_db(1);
        let picker = RandomPicker::seeded(1);
        let clock = FixedClock::new(ts());
        for (start, end) in [(6, 8), (8, 10), (10, 12)] {
            create_booking(&mut conn, &picker, &clock, None, &request(Some(&courts[0]), start, end))
                .unwrap();
        }

        clock.set(at("2025-06-16 10:30"));
        let count = complete_elapsed_for_day(&conn, &clock, &scope()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            types(&conn),
            vec![
                (6, BookingType::Completed),
                (8, BookingType::Completed),
                (10, BookingType::Booking),
            ]
        );
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let (mut conn, courts) = setup_db(1);
        let picker = RandomPicker::seeded(1);
        let clock = FixedClock::new(ts());
        for (start, end) in [(6, 8), (12, 14)] {
            create_booking(&mut conn, &picker, &clock, None, &request(Some(&courts[0]), start, end))
                .unwrap();
        }

        clock.set(at("2025-06-16 09:00"));
        assert_eq!(complete_elapsed_for_day(&conn, &clock, &scope()).unwrap(), 1);
        let once = types(&conn);
        assert_eq!(complete_elapsed_for_day(&conn, &clock, &scope()).unwrap(), 0);
        assert_eq!(types(&conn), once);
    }

    #[test]
    fn test_future_days_untouched_past_days_completed() {
        let (mut conn, courts) = setup_db(1);
        let picker = RandomPicker::seeded(1);
        let clock = FixedClock::new(ts());
        create_booking(&mut conn, &picker, &clock, None, &request(Some(&courts[0]), 20, 22)).unwrap();

        clock.set(at("2025-06-15 23:00"));
        assert_eq!(complete_all_elapsed(&conn, &clock).unwrap(), 0);

        clock.set(at("2025-06-17 05:00"));
        assert_eq!(complete_all_elapsed(&conn, &clock).unwrap(), 1);
        assert_eq!(types(&conn), vec![(20, BookingType::Completed)]);
    }

    #[test]
    fn test_day_scope_limits_the_sweep() {
        let (mut conn, courts) = setup_db(1);
        let picker = RandomPicker::seeded(1);
        let clock = FixedClock::new(ts());
        let mut other_day = request(Some(&courts[0]), 6, 7);
        other_day.date = day().pred_opt().unwrap();
        create_booking(&mut conn, &picker, &clock, None, &other_day).unwrap();
        create_booking(&mut conn, &picker, &clock, None, &request(Some(&courts[0]), 6, 7)).unwrap();

        clock.set(at("2025-06-16 12:00"));
        assert_eq!(complete_elapsed_for_day(&conn, &clock, &scope()).unwrap(), 1);
        assert_eq!(complete_all_elapsed(&conn, &clock).unwrap(), 1);
    }

    fn sweeper_state(conn: Connection, sweep_interval_secs: u64) -> Arc<AppState> {
        Arc::new(AppState {
            db: Arc::new(std::sync::Mutex::new(conn)),
            config: crate::config::AppConfig {
                port: 0,
                database_url: ":memory:".to_string(),
                jwt_secret: "test-secret".to_string(),
                token_ttl_hours: 1,
                sweep_interval_secs,
            },
            clock: Box::new(FixedClock::new(at("2025-06-17 05:00"))),
            picker: Box::new(RandomPicker::seeded(1)),
            credentials: Box::new(crate::services::credentials::JwtCredentials::new("test-secret", 1)),
        })
    }

    #[tokio::test]
    async fn test_sweeper_disabled_at_zero_interval() {
        let (conn, _) = setup_db(1);
        assert!(spawn_sweeper(sweeper_state(conn, 0)).is_none());
    }

    #[tokio::test]
    async fn test_sweeper_completes_on_first_tick() {
        let (mut conn, courts) = setup_db(1);
        let picker = RandomPicker::seeded(1);
        let clock = FixedClock::new(ts());
        create_booking(&mut conn, &picker, &clock, None, &request(Some(&courts[0]), 6, 7)).unwrap();

        let state = sweeper_state(conn, 3600);
        let handle = spawn_sweeper(Arc::clone(&state)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        let db = state.conn().unwrap();
        assert_eq!(types(&db), vec![(6, BookingType::Completed)]);
    }
}
