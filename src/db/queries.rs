use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{
    Booking, BookingType, BookingView, Centre, Resource, Role, Sport, User, UserSummary,
};

// ── Users ──

pub fn insert_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, username, password_hash, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.name,
            user.email,
            user.username,
            user.password_hash,
            user.role,
            user.created_at,
            user.updated_at,
        ],
    )?;
    Ok(())
}

const USER_COLUMNS: &str =
    "id, name, email, username, password_hash, role, created_at, updated_at";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        username: row.get(3)?,
        password_hash: row.get(4)?,
        role: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn get_user(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    )
    .optional()
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![email],
        user_from_row,
    )
    .optional()
}

pub fn update_user_role(
    conn: &Connection,
    id: &str,
    role: Role,
    now: &NaiveDateTime,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3",
        params![role, now, id],
    )?;
    Ok(count > 0)
}

// ── Centre ↔ Sport links ──

fn sports_for_centre(conn: &Connection, centre_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT sport_id FROM centre_sports WHERE centre_id = ?1 ORDER BY sport_id",
    )?;
    let rows = stmt.query_map(params![centre_id], |row| row.get(0))?;
    rows.collect()
}

fn centres_for_sport(conn: &Connection, sport_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT centre_id FROM centre_sports WHERE sport_id = ?1 ORDER BY centre_id",
    )?;
    let rows = stmt.query_map(params![sport_id], |row| row.get(0))?;
    rows.collect()
}

fn replace_centre_sports(
    conn: &Connection,
    centre_id: &str,
    sport_ids: &[String],
) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM centre_sports WHERE centre_id = ?1",
        params![centre_id],
    )?;
    for sport_id in sport_ids {
        conn.execute(
            "INSERT OR IGNORE INTO centre_sports (centre_id, sport_id) VALUES (?1, ?2)",
            params![centre_id, sport_id],
        )?;
    }
    Ok(())
}

fn replace_sport_centres(
    conn: &Connection,
    sport_id: &str,
    centre_ids: &[String],
) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM centre_sports WHERE sport_id = ?1",
        params![sport_id],
    )?;
    for centre_id in centre_ids {
        conn.execute(
            "INSERT OR IGNORE INTO centre_sports (centre_id, sport_id) VALUES (?1, ?2)",
            params![centre_id, sport_id],
        )?;
    }
    Ok(())
}

// ── Centres ──

pub fn insert_centre(conn: &Connection, centre: &Centre) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO centres (id, name, location, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            centre.id,
            centre.name,
            centre.location,
            centre.created_at,
            centre.updated_at,
        ],
    )?;
    replace_centre_sports(conn, &centre.id, &centre.sports)
}

pub fn update_centre(conn: &Connection, centre: &Centre) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE centres SET name = ?1, location = ?2, updated_at = ?3 WHERE id = ?4",
        params![centre.name, centre.location, centre.updated_at, centre.id],
    )?;
    if count == 0 {
        return Ok(false);
    }
    replace_centre_sports(conn, &centre.id, &centre.sports)?;
    Ok(true)
}

pub fn get_centre(conn: &Connection, id: &str) -> rusqlite::Result<Option<Centre>> {
    let row = conn
        .query_row(
            "SELECT id, name, location, created_at, updated_at FROM centres WHERE id = ?1",
            params![id],
            |row| {
                Ok(Centre {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    location: row.get(2)?,
                    sports: Vec::new(),
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()?;

    match row {
        Some(mut centre) => {
            centre.sports = sports_for_centre(conn, &centre.id)?;
            Ok(Some(centre))
        }
        None => Ok(None),
    }
}

pub fn list_centres(conn: &Connection) -> rusqlite::Result<Vec<Centre>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, location, created_at, updated_at FROM centres ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Centre {
            id: row.get(0)?,
            name: row.get(1)?,
            location: row.get(2)?,
            sports: Vec::new(),
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    })?;

    let mut centres = vec![];
    for row in rows {
        let mut centre = row?;
        centre.sports = sports_for_centre(conn, &centre.id)?;
        centres.push(centre);
    }
    Ok(centres)
}

pub fn delete_centre(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM centres WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Sports ──

fn sport_from_row(row: &Row) -> rusqlite::Result<Sport> {
    Ok(Sport {
        id: row.get(0)?,
        name: row.get(1)?,
        resource_name: row.get(2)?,
        centres: Vec::new(),
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub fn insert_sport(conn: &Connection, sport: &Sport) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO sports (id, name, resource_name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            sport.id,
            sport.name,
            sport.resource_name,
            sport.created_at,
            sport.updated_at,
        ],
    )?;
    replace_sport_centres(conn, &sport.id, &sport.centres)
}

pub fn update_sport(conn: &Connection, sport: &Sport) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE sports SET name = ?1, resource_name = ?2, updated_at = ?3 WHERE id = ?4",
        params![sport.name, sport.resource_name, sport.updated_at, sport.id],
    )?;
    if count == 0 {
        return Ok(false);
    }
    replace_sport_centres(conn, &sport.id, &sport.centres)?;
    Ok(true)
}

pub fn get_sport(conn: &Connection, id: &str) -> rusqlite::Result<Option<Sport>> {
    let row = conn
        .query_row(
            "SELECT id, name, resource_name, created_at, updated_at FROM sports WHERE id = ?1",
            params![id],
            sport_from_row,
        )
        .optional()?;

    match row {
        Some(mut sport) => {
            sport.centres = centres_for_sport(conn, &sport.id)?;
            Ok(Some(sport))
        }
        None => Ok(None),
    }
}

/// All sports, or only those offered at `centre_id`.
pub fn list_sports(conn: &Connection, centre_id: Option<&str>) -> rusqlite::Result<Vec<Sport>> {
    let (sql, params_vec): (&str, Vec<&dyn ToSql>) = match &centre_id {
        Some(centre_id) => (
            "SELECT s.id, s.name, s.resource_name, s.created_at, s.updated_at
             FROM sports s
             INNER JOIN centre_sports cs ON cs.sport_id = s.id
             WHERE cs.centre_id = ?1 ORDER BY s.name ASC",
            vec![centre_id as &dyn ToSql],
        ),
        None => (
            "SELECT id, name, resource_name, created_at, updated_at FROM sports ORDER BY name ASC",
            vec![],
        ),
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_vec.as_slice(), sport_from_row)?;

    let mut sports = vec![];
    for row in rows {
        let mut sport = row?;
        sport.centres = centres_for_sport(conn, &sport.id)?;
        sports.push(sport);
    }
    Ok(sports)
}

pub fn delete_sport(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM sports WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Resources ──

const RESOURCE_COLUMNS: &str = "id, name, sport_id, centre_id, created_at, updated_at";

fn resource_from_row(row: &Row) -> rusqlite::Result<Resource> {
    Ok(Resource {
        id: row.get(0)?,
        name: row.get(1)?,
        sport_id: row.get(2)?,
        centre_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn insert_resource(conn: &Connection, resource: &Resource) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO resources (id, name, sport_id, centre_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            resource.id,
            resource.name,
            resource.sport_id,
            resource.centre_id,
            resource.created_at,
            resource.updated_at,
        ],
    )?;
    Ok(())
}

pub fn update_resource(conn: &Connection, resource: &Resource) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE resources SET name = ?1, sport_id = ?2, centre_id = ?3, updated_at = ?4 WHERE id = ?5",
        params![
            resource.name,
            resource.sport_id,
            resource.centre_id,
            resource.updated_at,
            resource.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_resource(conn: &Connection, id: &str) -> rusqlite::Result<Option<Resource>> {
    conn.query_row(
        &format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = ?1"),
        params![id],
        resource_from_row,
    )
    .optional()
}

/// Resources matching whichever of `centre_id` / `sport_id` are given.
pub fn list_resources(
    conn: &Connection,
    centre_id: Option<&str>,
    sport_id: Option<&str>,
) -> rusqlite::Result<Vec<Resource>> {
    let mut clauses = Vec::new();
    let mut params_vec: Vec<&dyn ToSql> = Vec::new();
    if let Some(centre_id) = &centre_id {
        clauses.push("centre_id = ?");
        params_vec.push(centre_id);
    }
    if let Some(sport_id) = &sport_id {
        clauses.push("sport_id = ?");
        params_vec.push(sport_id);
    }

    let mut sql = format!("SELECT {RESOURCE_COLUMNS} FROM resources");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY name ASC, id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_vec.as_slice(), resource_from_row)?;
    rows.collect()
}

/// Every bookable unit for a sport at a centre.
pub fn find_resources(
    conn: &Connection,
    sport_id: &str,
    centre_id: &str,
) -> rusqlite::Result<Vec<Resource>> {
    list_resources(conn, Some(centre_id), Some(sport_id))
}

pub fn delete_resource(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM resources WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "b.id, b.user_id, b.resource_id, b.centre_id, b.sport_id, b.date, \
     b.start_hour, b.end_hour, b.booking_type, b.note, b.created_at, b.updated_at";

fn booking_from_row(row: &Row) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        resource_id: row.get(2)?,
        centre_id: row.get(3)?,
        sport_id: row.get(4)?,
        date: row.get(5)?,
        start_hour: row.get(6)?,
        end_hour: row.get(7)?,
        booking_type: row.get(8)?,
        note: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn booking_view_from_row(row: &Row) -> rusqlite::Result<BookingView> {
    let booking = booking_from_row(row)?;
    let resource_name: Option<String> = row.get(12)?;
    let user_name: Option<String> = row.get(13)?;
    let user_email: Option<String> = row.get(14)?;

    let user = match (user_name, user_email) {
        (Some(name), Some(email)) => Some(UserSummary { name, email }),
        _ => None,
    };

    Ok(BookingView {
        booking,
        resource_name,
        user,
    })
}

/// Writes the booking and one `booking_slots` row per occupied hour. A
/// primary-key violation on the slot rows means the hour is already taken.
pub fn insert_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, user_id, resource_id, centre_id, sport_id, date, start_hour, end_hour, booking_type, note, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.id,
            booking.user_id,
            booking.resource_id,
            booking.centre_id,
            booking.sport_id,
            booking.date,
            booking.start_hour,
            booking.end_hour,
            booking.booking_type,
            booking.note,
            booking.created_at,
            booking.updated_at,
        ],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO booking_slots (resource_id, date, hour, booking_id) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for hour in booking.hours().hours() {
        stmt.execute(params![booking.resource_id, booking.date, hour, booking.id])?;
    }
    Ok(())
}

/// Bookings on `date` for any of `resource_ids`, skipping the given types.
pub fn find_bookings(
    conn: &Connection,
    resource_ids: &[String],
    date: &NaiveDate,
    exclude_types: &[BookingType],
) -> rusqlite::Result<Vec<Booking>> {
    if resource_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut params_vec: Vec<&dyn ToSql> = vec![date];
    let resource_marks = vec!["?"; resource_ids.len()].join(", ");
    params_vec.extend(resource_ids.iter().map(|id| id as &dyn ToSql));

    let mut sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.date = ? AND b.resource_id IN ({resource_marks})"
    );
    if !exclude_types.is_empty() {
        let type_marks = vec!["?"; exclude_types.len()].join(", ");
        sql.push_str(&format!(" AND b.booking_type NOT IN ({type_marks})"));
        params_vec.extend(exclude_types.iter().map(|t| t as &dyn ToSql));
    }
    sql.push_str(" ORDER BY b.start_hour ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_vec.as_slice(), booking_from_row)?;
    rows.collect()
}

const BOOKING_VIEW_JOINS: &str = "FROM bookings b
     LEFT JOIN resources r ON r.id = b.resource_id
     LEFT JOIN users u ON u.id = b.user_id";

pub fn get_booking_view(conn: &Connection, id: &str) -> rusqlite::Result<Option<BookingView>> {
    conn.query_row(
        &format!(
            "SELECT {BOOKING_COLUMNS}, r.name, u.name, u.email {BOOKING_VIEW_JOINS} WHERE b.id = ?1"
        ),
        params![id],
        booking_view_from_row,
    )
    .optional()
}

/// Read-only listing of a day's bookings for a centre and sport.
pub fn list_booking_views(
    conn: &Connection,
    centre_id: &str,
    sport_id: &str,
    date: &NaiveDate,
) -> rusqlite::Result<Vec<BookingView>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS}, r.name, u.name, u.email {BOOKING_VIEW_JOINS}
         WHERE b.centre_id = ?1 AND b.sport_id = ?2 AND b.date = ?3
         ORDER BY b.start_hour ASC, r.name ASC"
    ))?;
    let rows = stmt.query_map(params![centre_id, sport_id, date], booking_view_from_row)?;
    rows.collect()
}

/// Narrows a completion sweep to one centre, sport and day.
#[derive(Debug, Clone, Copy)]
pub struct CompletionScope<'a> {
    pub centre_id: &'a str,
    pub sport_id: &'a str,
    pub date: &'a NaiveDate,
}

/// Marks every non-completed booking that ended by `now` as Completed: all
/// bookings on earlier days, and today's bookings with `end_hour <= now.hour`.
pub fn complete_elapsed_bookings(
    conn: &Connection,
    now: &NaiveDateTime,
    scope: Option<CompletionScope<'_>>,
) -> rusqlite::Result<usize> {
    use chrono::Timelike;

    let today = now.date();
    let hour = now.hour();
    let completed = BookingType::Completed;

    let mut sql = String::from(
        "UPDATE bookings SET booking_type = ?1, updated_at = ?2
         WHERE booking_type != ?1
           AND (date < ?3 OR (date = ?3 AND end_hour <= ?4))",
    );
    let mut params_vec: Vec<&dyn ToSql> = vec![&completed, now, &today, &hour];

    if let Some(scope) = &scope {
        sql.push_str(" AND centre_id = ?5 AND sport_id = ?6 AND date = ?7");
        params_vec.push(&scope.centre_id);
        params_vec.push(&scope.sport_id);
        params_vec.push(scope.date);
    }

    conn.execute(&sql, params_vec.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 16)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn seed(conn: &Connection) -> (Centre, Sport) {
        let centre = Centre {
            id: "c1".to_string(),
            name: "Riverside".to_string(),
            location: "North bank".to_string(),
            sports: vec![],
            created_at: ts(),
            updated_at: ts(),
        };
        insert_centre(conn, &centre).unwrap();

        let sport = Sport {
            id: "s1".to_string(),
            name: "Badminton".to_string(),
            resource_name: "Court".to_string(),
            centres: vec!["c1".to_string()],
            created_at: ts(),
            updated_at: ts(),
        };
        insert_sport(conn, &sport).unwrap();
        (centre, sport)
    }

    #[test]
    fn test_centre_sport_links_are_shared() {
        let conn = db::init_db(":memory:").unwrap();
        seed(&conn);

        let centre = get_centre(&conn, "c1").unwrap().unwrap();
        assert_eq!(centre.sports, vec!["s1".to_string()]);

        let sports = list_sports(&conn, Some("c1")).unwrap();
        assert_eq!(sports.len(), 1);
        assert_eq!(sports[0].centres, vec!["c1".to_string()]);

        assert!(list_sports(&conn, Some("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_list_resources_filters() {
        let conn = db::init_db(":memory:").unwrap();
        seed(&conn);
        for (id, name) in [("r1", "Court 1"), ("r2", "Court 2")] {
            insert_resource(
                &conn,
                &Resource {
                    id: id.to_string(),
                    name: name.to_string(),
                    sport_id: "s1".to_string(),
                    centre_id: "c1".to_string(),
                    created_at: ts(),
                    updated_at: ts(),
                },
            )
            .unwrap();
        }

        assert_eq!(list_resources(&conn, None, None).unwrap().len(), 2);
        assert_eq!(find_resources(&conn, "s1", "c1").unwrap().len(), 2);
        assert!(find_resources(&conn, "s1", "other").unwrap().is_empty());
    }

    #[test]
    fn test_find_bookings_excludes_types() {
        let conn = db::init_db(":memory:").unwrap();
        seed(&conn);
        insert_resource(
            &conn,
            &Resource {
                id: "r1".to_string(),
                name: "Court 1".to_string(),
                sport_id: "s1".to_string(),
                centre_id: "c1".to_string(),
                created_at: ts(),
                updated_at: ts(),
            },
        )
        .unwrap();

        let date = ts().date();
        for (id, start, end, booking_type) in [
            ("b1", 9, 10, BookingType::Booking),
            ("b2", 14, 16, BookingType::BlockedTournament),
        ] {
            insert_booking(
                &conn,
                &Booking {
                    id: id.to_string(),
                    user_id: None,
                    resource_id: "r1".to_string(),
                    centre_id: "c1".to_string(),
                    sport_id: "s1".to_string(),
                    date,
                    start_hour: start,
                    end_hour: end,
                    booking_type,
                    note: String::new(),
                    created_at: ts(),
                    updated_at: ts(),
                },
            )
            .unwrap();
        }

        let ids = vec!["r1".to_string()];
        assert_eq!(find_bookings(&conn, &ids, &date, &[]).unwrap().len(), 2);

        let counted =
            find_bookings(&conn, &ids, &date, &[BookingType::BlockedTournament]).unwrap();
        assert_eq!(counted.len(), 1);
        assert_eq!(counted[0].id, "b1");

        let other_day = date.succ_opt().unwrap();
        assert!(find_bookings(&conn, &ids, &other_day, &[]).unwrap().is_empty());
        assert!(find_bookings(&conn, &[], &date, &[]).unwrap().is_empty());
    }
}
