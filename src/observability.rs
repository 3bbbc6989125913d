use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total statements executed. Labels: command, status.
pub const REQUESTS_TOTAL: &str = "slotgrid_requests_total";

/// Histogram: statement latency in seconds. Labels: command.
pub const REQUEST_DURATION_SECONDS: &str = "slotgrid_request_duration_seconds";

// ── Scheduling outcomes ─────────────────────────────────────────

/// Counter: committed reservations and meetings. Labels: kind
/// (`reservation` or the meeting frequency).
pub const PLACEMENTS_TOTAL: &str = "slotgrid_placements_total";

/// Counter: meetings that ran out of weeks mid-commit.
pub const PARTIAL_COMMITS_TOTAL: &str = "slotgrid_partial_commits_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "slotgrid_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "slotgrid_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "slotgrid_connections_rejected_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertReservation { .. } => "insert_reservation",
        Command::InsertMeeting(_) => "insert_meeting",
        Command::SelectSchedule { .. } => "select_schedule",
        Command::SelectReservations => "select_reservations",
        Command::SelectLoad => "select_load",
        Command::SelectCalendar => "select_calendar",
        Command::ResetSchedule => "reset_schedule",
    }
}
