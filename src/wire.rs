use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::StartupHandler;
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use tokio::net::TcpStream;

use crate::engine::{Engine, ScheduleError};
use crate::export;
use crate::observability::{command_label, REQUESTS_TOTAL, REQUEST_DURATION_SECONDS};
use crate::sql::{self, Command};

pub struct SlotgridHandler {
    engine: Arc<Engine>,
    query_parser: Arc<SlotgridQueryParser>,
}

impl SlotgridHandler {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            query_parser: Arc::new(SlotgridQueryParser),
        }
    }

    async fn execute_command(&self, cmd: Command) -> PgWireResult<Vec<Response>> {
        let label = command_label(&cmd);
        let started = Instant::now();
        let result = self.run_command(cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(REQUESTS_TOTAL, "command" => label, "status" => status).increment(1);
        metrics::histogram!(REQUEST_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn run_command(&self, cmd: Command) -> PgWireResult<Vec<Response>> {
        let engine = &self.engine;
        match cmd {
            Command::InsertReservation {
                day,
                start_time,
                duration,
            } => {
                engine
                    .reserve(&day, &start_time, duration)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::InsertMeeting(form) => {
                let placement = engine.schedule_meeting(&form).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(
                    Tag::new("INSERT").with_rows(placement.weeks.len()),
                )])
            }
            Command::ResetSchedule => {
                let cleared = engine.reset().await;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(cleared))])
            }
            Command::SelectSchedule { week, day } => {
                let schema = Arc::new(schedule_schema());
                let rows: Vec<PgWireResult<_>> = engine
                    .schedule_rows()
                    .await
                    .into_iter()
                    .filter(|r| week.is_none_or(|w| r.week == w) && day.is_none_or(|d| r.day == d))
                    .map(|r| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&r.meeting_id.to_string())?;
                        encoder.encode_field(&(r.week as i32 + 1))?;
                        encoder.encode_field(&r.day.name())?;
                        encoder.encode_field(&r.start_time)?;
                        encoder.encode_field(&r.end_time)?;
                        encoder.encode_field(&r.name)?;
                        encoder.encode_field(&r.kind)?;
                        encoder.encode_field(&(r.duration_minutes as i32))?;
                        encoder.encode_field(&r.frequency.name())?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(schema, stream::iter(rows)))])
            }
            Command::SelectReservations => {
                let schema = Arc::new(reservations_schema());
                let rows: Vec<PgWireResult<_>> = engine
                    .reservation_rows()
                    .await
                    .into_iter()
                    .map(|r| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&r.id.to_string())?;
                        encoder.encode_field(&r.day.name())?;
                        encoder.encode_field(&r.start_time)?;
                        encoder.encode_field(&r.end_time)?;
                        encoder.encode_field(&(r.duration_minutes as i32))?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(schema, stream::iter(rows)))])
            }
            Command::SelectLoad => {
                let schema = Arc::new(load_schema());
                let rows: Vec<PgWireResult<_>> = engine
                    .load_rows()
                    .await
                    .into_iter()
                    .map(|r| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&r.day.name())?;
                        encoder.encode_field(&r.total_hours)?;
                        encoder.encode_field(&r.meeting_hours)?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(schema, stream::iter(rows)))])
            }
            Command::SelectCalendar => {
                let schema = Arc::new(calendar_schema());
                let ics = export::calendar_ics(&engine.snapshot().await);
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&ics)?;
                let rows = vec![Ok(encoder.take_row())];
                Ok(vec![Response::Query(QueryResponse::new(schema, stream::iter(rows)))])
            }
        }
    }
}

fn text_field(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::VARCHAR, FieldFormat::Text)
}

fn typed_field(name: &str, ty: Type) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, ty, FieldFormat::Text)
}

fn schedule_schema() -> Vec<FieldInfo> {
    vec![
        text_field("meeting_id"),
        typed_field("week", Type::INT4),
        text_field("day"),
        text_field("start_time"),
        text_field("end_time"),
        text_field("name"),
        text_field("type"),
        typed_field("duration", Type::INT4),
        text_field("frequency"),
    ]
}

fn reservations_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id"),
        text_field("day"),
        text_field("start_time"),
        text_field("end_time"),
        typed_field("duration", Type::INT4),
    ]
}

fn load_schema() -> Vec<FieldInfo> {
    vec![
        text_field("day"),
        typed_field("total_hours", Type::FLOAT8),
        typed_field("meeting_hours", Type::FLOAT8),
    ]
}

fn calendar_schema() -> Vec<FieldInfo> {
    vec![text_field("ics")]
}

/// Result columns for a statement, without executing it. Statements that do
/// not parse or return no rows describe as empty.
fn result_schema(sql: &str) -> Vec<FieldInfo> {
    match sql::parse_sql(sql) {
        Ok(Command::SelectSchedule { .. }) => schedule_schema(),
        Ok(Command::SelectReservations) => reservations_schema(),
        Ok(Command::SelectLoad) => load_schema(),
        Ok(Command::SelectCalendar) => calendar_schema(),
        _ => vec![],
    }
}

#[async_trait]
impl SimpleQueryHandler for SlotgridHandler {
    async fn do_query<C>(
        &self,
        _client: &mut C,
        query: &str,
    ) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        self.execute_command(cmd).await
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct SlotgridQueryParser;

#[async_trait]
impl QueryParser for SlotgridQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(result_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for SlotgridHandler {
    type Statement = String;
    type QueryParser = SlotgridQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        _client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let sql = substitute_params(portal);
        let cmd = sql::parse_sql(&sql).map_err(sql_err)?;
        let responses = self.execute_command(cmd).await?;
        responses
            .into_iter()
            .next()
            .ok_or_else(|| PgWireError::ApiError("statement produced no response".into()))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        // Placeholders make the raw statement unparsable; describe with NULLs bound.
        let probe = blank_params(&target.statement);
        Ok(DescribeStatementResponse::new(param_types, result_schema(&probe)))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(result_schema(&substitute_params(target))))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start {
                if let Ok(n) = sql[start..i].parse::<usize>() {
                    max = max.max(n);
                }
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Replace placeholders `$1..$count` in one left-to-right pass. Emitted
/// values are never rescanned, so bound text containing `$1` stays intact.
fn replace_params<F>(sql: &str, count: usize, value: F) -> String
where
    F: Fn(usize) -> String,
{
    let bytes = sql.as_bytes();
    let mut result = String::with_capacity(sql.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        match sql[start..end].parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => {
                result.push_str(&sql[copied..i]);
                result.push_str(&value(n - 1));
                copied = end;
            }
            _ => {}
        }
        i = end.max(start);
    }
    result.push_str(&sql[copied..]);
    result
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
fn substitute_params(portal: &Portal<String>) -> String {
    let params = &portal.parameters;
    replace_params(&portal.statement.statement, params.len(), |i| match &params[i] {
        Some(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            format!("'{}'", text.replace('\'', "''"))
        }
        None => "NULL".to_string(),
    })
}

fn blank_params(sql: &str) -> String {
    replace_params(sql, count_params(sql), |_| "NULL".to_string())
}

// ── Factory ──────────────────────────────────────────────────────

pub struct SlotgridFactory {
    handler: Arc<SlotgridHandler>,
    noop: Arc<NoopHandler>,
}

impl SlotgridFactory {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            handler: Arc::new(SlotgridHandler::new(engine)),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for SlotgridFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.noop.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection until it closes.
pub async fn process_connection(socket: TcpStream, engine: Arc<Engine>) -> std::io::Result<()> {
    let factory = Arc::new(SlotgridFactory::new(engine));
    pgwire::tokio::process_socket(socket, None, factory).await
}

fn engine_err(e: ScheduleError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "P0001".into(),
        e.to_string(),
    )))
}

fn sql_err(e: crate::sql::SqlError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "42601".into(),
        e.to_string(),
    )))
}
