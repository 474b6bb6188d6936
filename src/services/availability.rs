use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingType, SlotAvailability, CLOSING_HOUR, OPENING_HOUR};
use crate::services::validation::DayScope;

/// Booking types left out of occupancy counts. Blocked / Tournament holds do
/// not reduce the free-court figure shown to customers, although they still
/// block creation on their own resource.
pub const UNCOUNTED_TYPES: [BookingType; 1] = [BookingType::BlockedTournament];

/// Free resources per hour of the operating window, given `total` resources and
/// the bookings that occupy them.
pub fn tally(total: usize, bookings: &[Booking]) -> Vec<SlotAvailability> {
    let window = (CLOSING_HOUR - OPENING_HOUR) as usize;
    let mut booked = vec![0usize; window];

    for booking in bookings {
        for hour in booking.hours().hours() {
            if (OPENING_HOUR..CLOSING_HOUR).contains(&hour) {
                booked[(hour - OPENING_HOUR) as usize] += 1;
            }
        }
    }

    (OPENING_HOUR..CLOSING_HOUR)
        .zip(booked)
        .map(|(hour, taken)| SlotAvailability {
            slot: SlotAvailability::label(hour),
            available_slots: total.saturating_sub(taken) as u32,
        })
        .collect()
}

pub fn available_slots(
    conn: &Connection,
    scope: &DayScope,
) -> Result<Vec<SlotAvailability>, AppError> {
    let resources = queries::find_resources(conn, &scope.sport_id, &scope.centre_id)?;
    if resources.is_empty() {
        return Err(AppError::NotFound(
            "no resources for the specified centre and sport".to_string(),
        ));
    }

    let ids: Vec<String> = resources.iter().map(|r| r.id.clone()).collect();
    let bookings = queries::find_bookings(conn, &ids, &scope.date, &UNCOUNTED_TYPES)?;

    tracing::debug!(
        centre_id = %scope.centre_id,
        sport_id = %scope.sport_id,
        date = %scope.date,
        resources = resources.len(),
        bookings = bookings.len(),
        "computed availability"
    );

    Ok(tally(resources.len(), &bookings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::allocator::RandomPicker;
    use crate::services::clock::FixedClock;
    use crate::services::scheduling::create_booking;
    use crate::services::scheduling::tests::{day, request, setup_db, ts, CENTRE, SPORT};

    fn scope() -> DayScope {
        DayScope {
            centre_id: CENTRE.to_string(),
            sport_id: SPORT.to_string(),
            date: day(),
        }
    }

    fn slots_by_hour(slots: &[SlotAvailability], hour: u8) -> u32 {
        slots[(hour - OPENING_HOUR) as usize].available_slots
    }

    #[test]
    fn test_empty_day_has_eighteen_full_buckets() {
        let (conn, _) = setup_db(3);
        let slots = available_slots(&conn, &scope()).unwrap();
        assert_eq!(slots.len(), 18);
        assert_eq!(slots[0].slot, "4:00 - 5:00");
        assert_eq!(slots[17].slot, "21:00 - 22:00");
        assert!(slots.iter().all(|s| s.available_slots == 3));
    }

    #[test]
    fn test_bookings_reduce_their_hours_only() {
        let (mut conn, courts) = setup_db(2);
        let picker = RandomPicker::seeded(3);
        let clock = FixedClock::new(ts());
        create_booking(&mut conn, &picker, &clock, None, &request(Some(&courts[0]), 9, 11)).unwrap();
        create_booking(&mut conn, &picker, &clock, None, &request(Some(&courts[1]), 10, 12)).unwrap();

        let slots = available_slots(&conn, &scope()).unwrap();
        assert_eq!(slots_by_hour(&slots, 8), 2);
        assert_eq!(slots_by_hour(&slots, 9), 1);
        assert_eq!(slots_by_hour(&slots, 10), 0);
        assert_eq!(slots_by_hour(&slots, 11), 1);
        assert_eq!(slots_by_hour(&slots, 12), 2);
    }

    #[test]
    fn test_blocked_tournament_not_counted() {
        let (mut conn, courts) = setup_db(1);
        let picker = RandomPicker::seeded(3);
        let clock = FixedClock::new(ts());
        let mut req = request(Some(&courts[0]), 14, 16);
        req.booking_type = BookingType::BlockedTournament;
        create_booking(&mut conn, &picker, &clock, None, &req).unwrap();

        let slots = available_slots(&conn, &scope()).unwrap();
        assert_eq!(slots_by_hour(&slots, 14), 1);
        assert_eq!(slots_by_hour(&slots, 15), 1);
    }

    #[test]
    fn test_unknown_pair_not_found() {
        let (conn, _) = setup_db(0);
        assert!(matches!(
            available_slots(&conn, &scope()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_tally_floors_at_zero() {
        let (mut conn, courts) = setup_db(1);
        let picker = RandomPicker::seeded(3);
        let clock = FixedClock::new(ts());
        let view =
            create_booking(&mut conn, &picker, &clock, None, &request(Some(&courts[0]), 6, 7)).unwrap();

        let doubled = vec![view.booking.clone(), view.booking];
        let slots = tally(1, &doubled);
        assert_eq!(slots_by_hour(&slots, 6), 0);
        assert_eq!(slots_by_hour(&slots, 7), 1);
    }
}
