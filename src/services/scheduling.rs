use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use crate::db::{self, queries, Constraint};
use crate::errors::AppError;
use crate::models::{Booking, BookingView, HourRange, Resource};
use crate::services::allocator::ResourcePicker;
use crate::services::clock::Clock;
use crate::services::validation::BookingRequest;

/// True when any booking on `resource_id` intersects `hours`. Every booking type
/// counts, Completed and Blocked / Tournament included.
pub fn has_conflict(bookings: &[Booking], resource_id: &str, hours: &HourRange) -> bool {
    bookings
        .iter()
        .any(|b| b.resource_id == resource_id && b.hours().overlaps(hours))
}

/// The resources with no booking intersecting `hours`, in input order.
pub fn available_resources<'a>(
    resources: &'a [Resource],
    bookings: &[Booking],
    hours: &HourRange,
) -> Vec<&'a Resource> {
    resources
        .iter()
        .filter(|r| !has_conflict(bookings, &r.id, hours))
        .collect()
}

/// Picks the resource a request will occupy: the named one if it is free, or
/// a random free resource for the sport at the centre.
pub fn resolve_resource(
    conn: &Connection,
    picker: &dyn ResourcePicker,
    req: &BookingRequest,
) -> Result<Resource, AppError> {
    match &req.resource_id {
        Some(resource_id) => {
            let resource = queries::get_resource(conn, resource_id)?
                .filter(|r| r.sport_id == req.sport_id && r.centre_id == req.centre_id)
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "resource {resource_id} for the specified centre and sport"
                    ))
                })?;

            let bookings = queries::find_bookings(
                conn,
                std::slice::from_ref(&resource.id),
                &req.date,
                &[],
            )?;
            if has_conflict(&bookings, &resource.id, &req.hours) {
                tracing::info!(
                    resource_id = %resource.id,
                    date = %req.date,
                    start = req.hours.start,
                    end = req.hours.end,
                    "requested resource already booked"
                );
                return Err(AppError::Conflict(
                    "time slot overlaps with an existing booking for this resource".to_string(),
                ));
            }
            Ok(resource)
        }
        None => {
            let resources = queries::find_resources(conn, &req.sport_id, &req.centre_id)?;
            if resources.is_empty() {
                return Err(AppError::NotFound(
                    "no resources for the specified centre and sport".to_string(),
                ));
            }

            let ids: Vec<String> = resources.iter().map(|r| r.id.clone()).collect();
            let bookings = queries::find_bookings(conn, &ids, &req.date, &[])?;
            let free = available_resources(&resources, &bookings, &req.hours);
            if free.is_empty() {
                tracing::info!(
                    centre_id = %req.centre_id,
                    sport_id = %req.sport_id,
                    date = %req.date,
                    start = req.hours.start,
                    end = req.hours.end,
                    total = resources.len(),
                    "no resources available"
                );
                return Err(AppError::Conflict(
                    "no resources available for the selected time slot".to_string(),
                ));
            }

            let chosen = free[picker.pick(free.len()).min(free.len() - 1)].clone();
            tracing::debug!(
                resource_id = %chosen.id,
                candidates = free.len(),
                "allocated resource"
            );
            Ok(chosen)
        }
    }
}

/// Allocates and persists a booking. The conflict read and the write share one
/// immediate transaction; the slot table's primary key backs that up, so two
/// requests for the same hour cannot both commit.
pub fn create_booking(
    conn: &mut Connection,
    picker: &dyn ResourcePicker,
    clock: &dyn Clock,
    user_id: Option<&str>,
    req: &BookingRequest,
) -> Result<BookingView, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let resource = resolve_resource(&tx, picker, req)?;

    let now = clock.now();
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.map(str::to_string),
        resource_id: resource.id,
        centre_id: req.centre_id.clone(),
        sport_id: req.sport_id.clone(),
        date: req.date,
        start_hour: req.hours.start,
        end_hour: req.hours.end,
        booking_type: req.booking_type,
        note: req.note.clone(),
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = queries::insert_booking(&tx, &booking) {
        return Err(match db::violated_constraint(&e) {
            Some(Constraint::Unique) => {
                tracing::warn!(resource_id = %booking.resource_id, "slot taken at insert");
                AppError::Conflict("time slot overlaps with an existing booking".to_string())
            }
            Some(Constraint::ForeignKey) => AppError::NotFound(
                "centre, sport or user referenced by the booking".to_string(),
            ),
            _ => AppError::Store(e),
        });
    }

    let view = queries::get_booking_view(&tx, &booking.id)?
        .ok_or_else(|| AppError::Internal("created booking not readable".to_string()))?;

    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        resource_id = %booking.resource_id,
        date = %booking.date,
        start = booking.start_hour,
        end = booking.end_hour,
        booking_type = booking.booking_type.as_str(),
        "booking created"
    );

    Ok(view)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;

    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::models::{BookingType, Centre, Sport};
    use crate::services::allocator::RandomPicker;
    use crate::services::clock::FixedClock;

    pub const CENTRE: &str = "6f1c2d3e-4b5a-4c6d-8e7f-901234567890";
    pub const SPORT: &str = "0a1b2c3d-4e5f-4a6b-8c7d-8e9f01234567";

    pub fn ts() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-06-16 08:00", "%Y-%m-%d %H:%M").unwrap()
    }

    pub fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    /// A centre offering one sport with `courts` resources.
    pub fn setup_db(courts: usize) -> (Connection, Vec<String>) {
        let conn = db::init_db(":memory:").unwrap();
        queries::insert_centre(
            &conn,
            &Centre {
                id: CENTRE.to_string(),
                name: "Riverside".to_string(),
                location: "North bank".to_string(),
                sports: vec![],
                created_at: ts(),
                updated_at: ts(),
            },
        )
        .unwrap();
        queries::insert_sport(
            &conn,
            &Sport {
                id: SPORT.to_string(),
                name: "Badminton".to_string(),
                resource_name: "Court".to_string(),
                centres: vec![CENTRE.to_string()],
                created_at: ts(),
                updated_at: ts(),
            },
        )
        .unwrap();

        let mut ids = Vec::new();
        for n in 0..courts {
            let id = Uuid::new_v4().to_string();
            queries::insert_resource(
                &conn,
                &Resource {
                    id: id.clone(),
                    name: format!("Court {}", n + 1),
                    sport_id: SPORT.to_string(),
                    centre_id: CENTRE.to_string(),
                    created_at: ts(),
                    updated_at: ts(),
                },
            )
            .unwrap();
            ids.push(id);
        }
        (conn, ids)
    }

    pub fn request(resource_id: Option<&str>, start: u8, end: u8) -> BookingRequest {
        BookingRequest {
            centre_id: CENTRE.to_string(),
            sport_id: SPORT.to_string(),
            resource_id: resource_id.map(str::to_string),
            date: day(),
            hours: HourRange::new(start, end).unwrap(),
            booking_type: BookingType::Booking,
            note: String::new(),
        }
    }

    fn book(
        conn: &mut Connection,
        resource_id: Option<&str>,
        start: u8,
        end: u8,
    ) -> Result<BookingView, AppError> {
        let picker = RandomPicker::seeded(1);
        let clock = FixedClock::new(ts());
        create_booking(conn, &picker, &clock, None, &request(resource_id, start, end))
    }

    #[test]
    fn test_named_resource_books() {
        let (mut conn, courts) = setup_db(1);
        let view = book(&mut conn, Some(&courts[0]), 9, 11).unwrap();
        assert_eq!(view.booking.resource_id, courts[0]);
        assert_eq!(view.booking.start_hour, 9);
        assert_eq!(view.booking.end_hour, 11);
        assert_eq!(view.booking.date, day());
        assert_eq!(view.resource_name.as_deref(), Some("Court 1"));
        assert_eq!(view.user, None);
    }

    #[test]
    fn test_overlap_rejected_adjacent_allowed() {
        let (mut conn, courts) = setup_db(1);
        book(&mut conn, Some(&courts[0]), 9, 11).unwrap();

        assert!(matches!(
            book(&mut conn, Some(&courts[0]), 10, 12),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            book(&mut conn, Some(&courts[0]), 9, 11),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            book(&mut conn, Some(&courts[0]), 8, 12),
            Err(AppError::Conflict(_))
        ));
        assert!(book(&mut conn, Some(&courts[0]), 11, 13).is_ok());
        assert!(book(&mut conn, Some(&courts[0]), 7, 9).is_ok());
    }

    #[test]
    fn test_same_hours_other_day_is_free() {
        let (mut conn, courts) = setup_db(1);
        book(&mut conn, Some(&courts[0]), 9, 11).unwrap();

        let picker = RandomPicker::seeded(1);
        let clock = FixedClock::new(ts());
        let mut req = request(Some(&courts[0]), 9, 11);
        req.date = day().succ_opt().unwrap();
        assert!(create_booking(&mut conn, &picker, &clock, None, &req).is_ok());
    }

    #[test]
    fn test_unknown_or_foreign_resource_not_found() {
        let (mut conn, _) = setup_db(1);
        let missing = Uuid::new_v4().to_string();
        assert!(matches!(
            book(&mut conn, Some(&missing), 9, 10),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_allocation_without_resources_not_found() {
        let (mut conn, _) = setup_db(0);
        assert!(matches!(
            book(&mut conn, None, 9, 10),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_allocation_fails_when_all_booked() {
        let (mut conn, courts) = setup_db(3);
        for court in &courts {
            book(&mut conn, Some(court), 14, 16).unwrap();
        }
        assert!(matches!(
            book(&mut conn, None, 15, 16),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_allocation_only_uses_free_resources() {
        let (mut conn, courts) = setup_db(4);
        book(&mut conn, Some(&courts[0]), 10, 12).unwrap();
        book(&mut conn, Some(&courts[1]), 10, 12).unwrap();
        let free: HashSet<&String> = courts[2..].iter().collect();

        let picker = RandomPicker::seeded(5);
        let mut seen = HashSet::new();
        for _ in 0..30 {
            let tx = conn.transaction().unwrap();
            let resource = resolve_resource(&tx, &picker, &request(None, 10, 11)).unwrap();
            assert!(free.contains(&resource.id));
            seen.insert(resource.id);
        }
        assert_eq!(seen.len(), 2, "allocation never varied");
    }

    #[test]
    fn test_allocation_fills_every_court_then_conflicts() {
        let (mut conn, courts) = setup_db(3);
        let mut used = HashSet::new();
        for _ in 0..3 {
            let view = book(&mut conn, None, 18, 20).unwrap();
            used.insert(view.booking.resource_id);
        }
        assert_eq!(used.len(), courts.len());
        assert!(matches!(
            book(&mut conn, None, 19, 20),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_slot_table_backstops_bypassed_check() {
        let (mut conn, courts) = setup_db(1);
        let first = book(&mut conn, Some(&courts[0]), 9, 11).unwrap();

        let mut clash = first.booking.clone();
        clash.id = Uuid::new_v4().to_string();
        clash.start_hour = 10;
        clash.end_hour = 12;
        let err = queries::insert_booking(&conn, &clash).unwrap_err();
        assert_eq!(db::violated_constraint(&err), Some(Constraint::Unique));
    }

    #[test]
    fn test_failed_insert_leaves_nothing_behind() {
        let (mut conn, courts) = setup_db(1);
        book(&mut conn, Some(&courts[0]), 9, 11).unwrap();
        let _ = book(&mut conn, Some(&courts[0]), 10, 12);

        let stored = queries::list_booking_views(&conn, CENTRE, SPORT, &day()).unwrap();
        assert_eq!(stored.len(), 1);
        let slots: i64 = conn
            .query_row("SELECT COUNT(*) FROM booking_slots", [], |row| row.get(0))
            .unwrap();
        assert_eq!(slots, 2);
    }

    #[test]
    fn test_has_conflict_ignores_other_resources() {
        let (mut conn, courts) = setup_db(2);
        let view = book(&mut conn, Some(&courts[0]), 9, 11).unwrap();
        let bookings = vec![view.booking];
        let hours = HourRange::new(9, 11).unwrap();
        assert!(has_conflict(&bookings, &courts[0], &hours));
        assert!(!has_conflict(&bookings, &courts[1], &hours));
    }
}
