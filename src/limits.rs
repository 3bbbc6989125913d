/// Longest accepted meeting name or type label, in bytes.
pub const MAX_LABEL_LEN: usize = 64;

/// Longest accepted preferred-time list on a meeting request.
pub const MAX_PREFERRED_TIMES: usize = 8;

/// Upper bound on committed schedule entries (100 meetings × 4 weeks).
pub const MAX_SCHEDULE_ENTRIES: usize = 400;

pub const MAX_RESERVATIONS: usize = 50;
