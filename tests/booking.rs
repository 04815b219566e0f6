use sqlx::PgPool;

use planetarium::errors::ApiError;
use planetarium::services::availability;
use planetarium::services::booking::{self, TicketRequest};

mod common;

fn ticket(row: i32, seat: i32, show_session: i64) -> TicketRequest {
    TicketRequest {
        row,
        seat,
        show_session,
    }
}

#[sqlx::test(migrations = "./src/migrations")]
async fn booking_a_seat_reduces_availability(pool: PgPool) {
    let user_id = common::create_user(&pool, "user@test.test", false).await;
    let session_id = common::sample_session(&pool, 20, 25).await;

    let reservation = booking::create_reservation(&pool, user_id, &[ticket(1, 1, session_id)])
        .await
        .unwrap();

    assert_eq!(reservation.tickets.len(), 1);
    assert_eq!(reservation.tickets[0].row, 1);
    assert_eq!(reservation.tickets[0].seat, 1);
    assert_eq!(
        availability::available_seats(&pool, session_id).await.unwrap(),
        499
    );
}

#[sqlx::test(migrations = "./src/migrations")]
async fn double_booking_is_a_conflict(pool: PgPool) {
    let alice = common::create_user(&pool, "alice@test.test", false).await;
    let bob = common::create_user(&pool, "bob@test.test", false).await;
    let session_id = common::sample_session(&pool, 20, 25).await;

    booking::create_reservation(&pool, alice, &[ticket(1, 1, session_id)])
        .await
        .unwrap();

    let err = booking::create_reservation(&pool, bob, &[ticket(1, 1, session_id)])
        .await
        .unwrap_err();

    match err {
        ApiError::SeatTaken {
            session_id: sid,
            row,
            seat,
        } => {
            assert_eq!(sid, session_id);
            assert_eq!((row, seat), (1, 1));
        }
        other => panic!("expected SeatTaken, got {other:?}"),
    }

    assert_eq!(
        availability::available_seats(&pool, session_id).await.unwrap(),
        499
    );
    assert_eq!(common::ticket_count(&pool, session_id).await, 1);
    assert_eq!(common::reservation_count(&pool).await, 1);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn conflicting_reservation_persists_nothing(pool: PgPool) {
    let alice = common::create_user(&pool, "alice@test.test", false).await;
    let bob = common::create_user(&pool, "bob@test.test", false).await;
    let session_id = common::sample_session(&pool, 20, 25).await;

    booking::create_reservation(&pool, alice, &[ticket(1, 1, session_id)])
        .await
        .unwrap();

    // two valid seats followed by a conflicting one; none may survive
    let requests = [
        ticket(2, 1, session_id),
        ticket(2, 2, session_id),
        ticket(1, 1, session_id),
    ];
    let err = booking::create_reservation(&pool, bob, &requests)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::SeatTaken { .. }));

    assert_eq!(common::ticket_count(&pool, session_id).await, 1);
    assert_eq!(common::reservation_count(&pool).await, 1);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn out_of_range_row_is_rejected(pool: PgPool) {
    let user_id = common::create_user(&pool, "user@test.test", false).await;
    let session_id = common::sample_session(&pool, 10, 10).await;

    let err = booking::create_reservation(&pool, user_id, &[ticket(11, 1, session_id)])
        .await
        .unwrap_err();

    match err {
        ApiError::SeatOutOfRange {
            coordinate,
            value,
            max,
        } => {
            assert_eq!(coordinate, "row");
            assert_eq!(value, 11);
            assert_eq!(max, 10);
        }
        other => panic!("expected SeatOutOfRange, got {other:?}"),
    }

    assert_eq!(common::ticket_count(&pool, session_id).await, 0);
    assert_eq!(common::reservation_count(&pool).await, 0);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn range_validation_runs_before_conflict_check(pool: PgPool) {
    let alice = common::create_user(&pool, "alice@test.test", false).await;
    let bob = common::create_user(&pool, "bob@test.test", false).await;
    let session_id = common::sample_session(&pool, 10, 10).await;

    booking::create_reservation(&pool, alice, &[ticket(1, 1, session_id)])
        .await
        .unwrap();

    // the payload contains both a conflict and a range violation; the
    // range error wins and nothing is persisted
    let requests = [ticket(1, 1, session_id), ticket(11, 1, session_id)];
    let err = booking::create_reservation(&pool, bob, &requests)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::SeatOutOfRange { .. }));
    assert_eq!(common::ticket_count(&pool, session_id).await, 1);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn duplicate_seat_within_payload_is_a_conflict(pool: PgPool) {
    let user_id = common::create_user(&pool, "user@test.test", false).await;
    let session_id = common::sample_session(&pool, 20, 25).await;

    let requests = [ticket(1, 1, session_id), ticket(1, 1, session_id)];
    let err = booking::create_reservation(&pool, user_id, &requests)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::SeatTaken { .. }));
    assert_eq!(common::ticket_count(&pool, session_id).await, 0);
    assert_eq!(common::reservation_count(&pool).await, 0);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn empty_ticket_list_is_rejected(pool: PgPool) {
    let user_id = common::create_user(&pool, "user@test.test", false).await;

    let err = booking::create_reservation(&pool, user_id, &[])
        .await
        .unwrap_err();

    match err {
        ApiError::Validation { field, .. } => assert_eq!(field, "tickets"),
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[sqlx::test(migrations = "./src/migrations")]
async fn unknown_session_is_not_found(pool: PgPool) {
    let user_id = common::create_user(&pool, "user@test.test", false).await;

    let err = booking::create_reservation(&pool, user_id, &[ticket(1, 1, 424242)])
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)));
}

#[sqlx::test(migrations = "./src/migrations")]
async fn availability_matches_capacity_minus_tickets(pool: PgPool) {
    let user_id = common::create_user(&pool, "user@test.test", false).await;
    let session_id = common::sample_session(&pool, 20, 25).await;

    let requests = [
        ticket(1, 1, session_id),
        ticket(1, 2, session_id),
        ticket(2, 1, session_id),
    ];
    booking::create_reservation(&pool, user_id, &requests)
        .await
        .unwrap();

    assert_eq!(
        availability::available_seats(&pool, session_id).await.unwrap(),
        20 * 25 - 3
    );

    let taken = availability::taken_places(&pool, session_id).await.unwrap();
    let coordinates: Vec<(i32, i32)> = taken.iter().map(|t| (t.row, t.seat)).collect();
    assert_eq!(coordinates, vec![(1, 1), (1, 2), (2, 1)]);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn deleting_a_session_cascades_to_tickets(pool: PgPool) {
    let user_id = common::create_user(&pool, "user@test.test", false).await;
    let session_id = common::sample_session(&pool, 20, 25).await;

    let requests = [ticket(1, 1, session_id), ticket(1, 2, session_id)];
    booking::create_reservation(&pool, user_id, &requests)
        .await
        .unwrap();
    assert_eq!(common::total_ticket_count(&pool).await, 2);

    sqlx::query("DELETE FROM show_sessions WHERE id = $1")
        .bind(session_id)
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(common::total_ticket_count(&pool).await, 0);
    // the reservation shell survives; only its tickets are gone
    assert_eq!(common::reservation_count(&pool).await, 1);
}
