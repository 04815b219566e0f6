use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::errors::{self, ApiError};
use crate::models::{PlanetariumDome, Reservation, Ticket};

const TICKET_SEAT_UNIQUE: &str = "tickets_session_id_row_seat_key";

// One requested seat claim, as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketRequest {
    pub row: i32,
    pub seat: i32,
    pub show_session: i64,
}

#[derive(Debug, Serialize)]
pub struct BookedTicket {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub show_session: i64,
}

#[derive(Debug, Serialize)]
pub struct ReservationWithTickets {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<BookedTicket>,
}

/// Checks a seat coordinate against the dome's grid. Row is checked first;
/// the error names the offending coordinate and its valid range.
pub fn validate_seat(row: i32, seat: i32, dome: &PlanetariumDome) -> Result<(), ApiError> {
    if row < 1 || row > dome.rows {
        return Err(ApiError::SeatOutOfRange {
            coordinate: "row",
            value: row,
            max: dome.rows,
        });
    }
    if seat < 1 || seat > dome.seats_in_row {
        return Err(ApiError::SeatOutOfRange {
            coordinate: "seat",
            value: seat,
            max: dome.seats_in_row,
        });
    }
    Ok(())
}

/// Creates a reservation with all requested tickets as one atomic unit.
///
/// Every seat is range-validated against its session's dome before any
/// insert happens, so an out-of-range seat wins over a conflict on the same
/// seat. Concurrent claims on the same (session, row, seat) are serialized
/// by the unique constraint at commit time; the loser gets `SeatTaken` and
/// the whole reservation rolls back.
pub async fn create_reservation(
    pool: &PgPool,
    user_id: i64,
    requests: &[TicketRequest],
) -> Result<ReservationWithTickets, ApiError> {
    if requests.is_empty() {
        return Err(ApiError::Validation {
            field: "tickets".to_string(),
            message: "at least one ticket is required".to_string(),
        });
    }

    let mut session_ids: Vec<i64> = requests.iter().map(|t| t.show_session).collect();
    session_ids.sort_unstable();
    session_ids.dedup();

    let seating: Vec<(i64, i64, String, i32, i32)> = sqlx::query_as(
        r#"
        SELECT s.id, d.id, d.name, d."rows", d.seats_in_row
        FROM show_sessions s
        JOIN planetarium_domes d ON d.id = s.dome_id
        WHERE s.id = ANY($1)
        "#,
    )
    .bind(&session_ids)
    .fetch_all(pool)
    .await?;

    let domes: HashMap<i64, PlanetariumDome> = seating
        .into_iter()
        .map(|(session_id, id, name, rows, seats_in_row)| {
            (
                session_id,
                PlanetariumDome {
                    id,
                    name,
                    rows,
                    seats_in_row,
                },
            )
        })
        .collect();

    // Range validation for the whole payload happens before any insert,
    // and therefore before any conflict can be observed.
    for request in requests {
        let dome = domes
            .get(&request.show_session)
            .ok_or(ApiError::NotFound("show session"))?;
        validate_seat(request.row, request.seat, dome)?;
    }

    let mut tx = pool.begin().await?;

    let reservation: Reservation = sqlx::query_as(
        "INSERT INTO reservations (user_id) VALUES ($1)
         RETURNING id, user_id, created_at",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut tickets = Vec::with_capacity(requests.len());
    for request in requests {
        let inserted: Result<Ticket, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO tickets (session_id, reservation_id, "row", seat)
            VALUES ($1, $2, $3, $4)
            RETURNING id, session_id, reservation_id, "row", seat
            "#,
        )
        .bind(request.show_session)
        .bind(reservation.id)
        .bind(request.row)
        .bind(request.seat)
        .fetch_one(&mut *tx)
        .await;

        match inserted {
            Ok(ticket) => tickets.push(BookedTicket {
                id: ticket.id,
                row: ticket.row,
                seat: ticket.seat,
                show_session: ticket.session_id,
            }),
            Err(e) if errors::is_unique_violation(&e, TICKET_SEAT_UNIQUE) => {
                let _ = tx.rollback().await;
                return Err(ApiError::SeatTaken {
                    session_id: request.show_session,
                    row: request.row,
                    seat: request.seat,
                });
            }
            Err(e) => {
                tracing::error!("ticket insert failed: {:?}", e);
                let _ = tx.rollback().await;
                return Err(e.into());
            }
        }
    }

    tx.commit().await?;

    Ok(ReservationWithTickets {
        id: reservation.id,
        created_at: reservation.created_at,
        tickets,
    })
}
