use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Config, NoTls, SimpleQueryMessage, SimpleQueryRow};

use slotgrid::engine::Engine;
use slotgrid::model::Event;
use slotgrid::notify::NotifyHub;
use slotgrid::wire;

// ── Test infrastructure ──────────────────────────────────────

async fn start_test_server() -> (SocketAddr, Arc<Engine>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let engine = Arc::new(Engine::with_seed(Some(1), Arc::new(NotifyHub::new())));

    let engine2 = engine.clone();
    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let engine = engine2.clone();
            tokio::spawn(async move {
                let _ = wire::process_connection(socket, engine).await;
            });
        }
    });

    (addr, engine)
}

async fn connect(addr: SocketAddr) -> tokio_postgres::Client {
    let mut config = Config::new();
    config
        .host(addr.ip().to_string())
        .port(addr.port())
        .dbname("slotgrid")
        .user("slotgrid");

    let (client, connection) = config.connect(NoTls).await.unwrap();
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client
}

fn rows(messages: Vec<SimpleQueryMessage>) -> Vec<SimpleQueryRow> {
    messages
        .into_iter()
        .filter_map(|m| match m {
            SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        })
        .collect()
}

fn affected(messages: &[SimpleQueryMessage]) -> Option<u64> {
    messages.iter().find_map(|m| match m {
        SimpleQueryMessage::CommandComplete(n) => Some(*n),
        _ => None,
    })
}

const SYNC_WEEKLY: &str = "INSERT INTO meetings (name, type, duration, preferred_times, fixed_day, fixed_time, frequency) \
                           VALUES ('Sync', 'Design', 60, '', '', '', 'weekly')";

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn weekly_meeting_appears_in_every_week() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    let result = client.simple_query(SYNC_WEEKLY).await.unwrap();
    assert_eq!(affected(&result), Some(4));

    let rows = rows(client.simple_query("SELECT * FROM schedule").await.unwrap());
    assert_eq!(rows.len(), 4);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.get("week"), Some((i + 1).to_string().as_str()));
        assert_eq!(row.get("day"), Some("Monday"));
        assert_eq!(row.get("start_time"), Some("09:00"));
        assert_eq!(row.get("end_time"), Some("10:00"));
        assert_eq!(row.get("name"), Some("Sync"));
        assert_eq!(row.get("type"), Some("Design"));
        assert_eq!(row.get("duration"), Some("60"));
        assert_eq!(row.get("frequency"), Some("weekly"));
    }
}

#[tokio::test]
async fn reservations_round_trip_and_collide() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    client
        .batch_execute("INSERT INTO reservations (day, start_time, duration) VALUES ('Monday', '16:00', 60)")
        .await
        .unwrap();

    let err = client
        .batch_execute("INSERT INTO reservations (day, start_time, duration) VALUES ('Monday', '16:30', 30)")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::RAISE_EXCEPTION));

    let rows = rows(client.simple_query("SELECT * FROM reservations").await.unwrap());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("day"), Some("Monday"));
    assert_eq!(rows[0].get("start_time"), Some("16:00"));
    assert_eq!(rows[0].get("end_time"), Some("17:00"));
    assert_eq!(rows[0].get("duration"), Some("60"));
}

#[tokio::test]
async fn break_time_is_rejected() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    let err = client
        .batch_execute("INSERT INTO reservations (day, start_time, duration) VALUES ('Monday', '12:00', 30)")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::RAISE_EXCEPTION));
    let rows = rows(client.simple_query("SELECT * FROM reservations").await.unwrap());
    assert!(rows.is_empty());
}

#[tokio::test]
async fn bad_sql_is_a_syntax_error() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    let err = client.batch_execute("SELECT * FROM bookings").await.unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::SYNTAX_ERROR));
}

#[tokio::test]
async fn load_reflects_reservations_and_meetings() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    client
        .batch_execute("INSERT INTO reservations (day, start_time, duration) VALUES ('Monday', '09:00', 90)")
        .await
        .unwrap();
    // Monday carries 6 hours now, so the meeting goes to Tuesday.
    client.batch_execute(SYNC_WEEKLY).await.unwrap();

    let rows = rows(client.simple_query("SELECT * FROM load").await.unwrap());
    assert_eq!(rows.len(), 4);
    let hours = |i: usize, col: &str| rows[i].get(col).unwrap().parse::<f64>().unwrap();
    assert_eq!(hours(0, "total_hours"), 6.0);
    assert_eq!(hours(0, "meeting_hours"), 0.0);
    assert_eq!(hours(1, "total_hours"), 4.0);
    assert_eq!(hours(1, "meeting_hours"), 4.0);
}

#[tokio::test]
async fn schedule_filters_by_week_and_day() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    client.batch_execute(SYNC_WEEKLY).await.unwrap();
    let rows = rows(
        client
            .simple_query("SELECT * FROM schedule WHERE week = 3 AND day = 'Monday'")
            .await
            .unwrap(),
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("week"), Some("3"));

    let rows = rows_for(&client, "SELECT * FROM schedule WHERE day = 'Tuesday'").await;
    assert!(rows.is_empty());
}

async fn rows_for(client: &tokio_postgres::Client, sql: &str) -> Vec<SimpleQueryRow> {
    rows(client.simple_query(sql).await.unwrap())
}

#[tokio::test]
async fn fixed_slot_conflict_over_the_wire() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    let sql = "INSERT INTO meetings (name, type, duration, preferred_times, fixed_day, fixed_time, frequency) \
               VALUES ('Standup', 'Team', 60, NULL, 'Tuesday', '10:00', 'weekly')";
    client.batch_execute(sql).await.unwrap();
    let err = client.batch_execute(sql).await.unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::RAISE_EXCEPTION));
    assert_eq!(rows_for(&client, "SELECT * FROM schedule").await.len(), 4);
}

#[tokio::test]
async fn reset_clears_schedule() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    client.batch_execute(SYNC_WEEKLY).await.unwrap();
    client
        .batch_execute("INSERT INTO reservations (day, start_time, duration) VALUES ('Thursday', '14:00', 30)")
        .await
        .unwrap();

    let result = client.simple_query("DELETE FROM schedule").await.unwrap();
    assert_eq!(affected(&result), Some(4));
    assert!(rows_for(&client, "SELECT * FROM schedule").await.is_empty());
    assert!(rows_for(&client, "SELECT * FROM reservations").await.is_empty());
}

#[tokio::test]
async fn calendar_export_over_the_wire() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    client
        .batch_execute("INSERT INTO reservations (day, start_time, duration) VALUES ('Wednesday', '13:30', 30)")
        .await
        .unwrap();
    let rows = rows_for(&client, "SELECT * FROM calendar").await;
    assert_eq!(rows.len(), 1);
    let ics = rows[0].get("ics").unwrap();
    assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics.contains("SUMMARY:Reserved (External)\r\n"));
    assert!(ics.contains("DTSTART:20250416T133000\r\n"));
    assert!(ics.contains("DURATION:PT30M\r\n"));
    assert!(ics.ends_with("END:VCALENDAR\r\n"));
}

#[tokio::test]
async fn extended_protocol_with_parameters() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    let inserted = client
        .execute(
            "INSERT INTO reservations (day, start_time, duration) VALUES ($1, $2, $3)",
            &[&"Thursday", &"15:00", &"90"],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    let rows = client
        .query("SELECT * FROM reservations", &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let day: &str = rows[0].get("day");
    let end: &str = rows[0].get("end_time");
    assert_eq!(day, "Thursday");
    assert_eq!(end, "16:30");
}

#[tokio::test]
async fn wire_mutations_reach_subscribers() {
    let (addr, engine) = start_test_server().await;
    let mut events = engine.notify.subscribe();
    let client = connect(addr).await;

    client
        .batch_execute("INSERT INTO reservations (day, start_time, duration) VALUES ('Tuesday', '11:00', 60)")
        .await
        .unwrap();
    client.batch_execute("DELETE FROM schedule").await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out")
        .unwrap();
    assert!(matches!(first, Event::ReservationAdded { .. }));
    let second = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out")
        .unwrap();
    assert_eq!(second, Event::ScheduleReset);
}

#[tokio::test]
async fn bound_names_keep_dollar_text() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    let inserted = client
        .execute(
            "INSERT INTO meetings (name, type, duration, preferred_times, fixed_day, fixed_time, frequency) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            &[&"Budget $1", &"Finance $2", &"30", &"", &"", &"", &"monthly"],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    let rows = rows_for(&client, "SELECT * FROM schedule").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some("Budget $1"));
    assert_eq!(rows[0].get("type"), Some("Finance $2"));
}
