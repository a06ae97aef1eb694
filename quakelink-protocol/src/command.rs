use chrono::{DateTime, Utc};

use crate::error::{QuakeLinkError, Result};
use crate::format::FormatSpec;
use crate::options::SessionOption;
use crate::time::{format_request_time, parse_request_time};

/// Result ordering for `SELECT` queries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OrderBy {
    OriginTimeAsc,
    OriginTimeDesc,
}

impl OrderBy {
    fn as_clause(self) -> &'static str {
        match self {
            Self::OriginTimeAsc => "ORDER BY OTIME ASC",
            Self::OriginTimeDesc => "ORDER BY OTIME DESC",
        }
    }
}

/// Which result sub-streams a `SELECT` requests.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SelectScope {
    /// `SELECT EVENTS`: archived results followed by live updates.
    All,
    /// `SELECT ARCHIVED EVENTS`: archived results only.
    Archived,
    /// `SELECT UPDATED EVENTS`: live updates only.
    Updated,
}

/// Filter and shaping clauses of a `SELECT` request.
///
/// Each clause is omitted from the wire when unset; `limit`/`offset` treat
/// 0 as unset and `OFFSET` only renders inside a `LIMIT` clause.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub format: FormatSpec,
    pub where_expr: String,
    pub order_by: Option<OrderBy>,
    pub limit: u32,
    pub offset: u32,
}

impl SelectParams {
    /// True if the request uses clauses that require server API support.
    pub fn uses_extended_clauses(&self) -> bool {
        self.order_by.is_some() || self.limit > 0 || self.offset > 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Hello,
    /// Fire and forget; the protocol has no auth acknowledgement.
    Auth {
        user: String,
        pass: String,
    },
    SetDefaults,
    Set {
        option: SessionOption,
        enabled: bool,
    },
    /// Fetch the latest revision of one event.
    GetEvent {
        event_id: String,
        format: FormatSpec,
    },
    /// Fetch a specific revision of one event.
    GetUpdate {
        revision: i32,
        event_id: String,
        format: FormatSpec,
    },
    /// Fetch the revision log of one event.
    GetUpdates {
        event_id: String,
        format: FormatSpec,
    },
    Select {
        scope: SelectScope,
        params: SelectParams,
    },
    Abort,
}

impl Command {
    /// Render the request line, without the trailing CRLF.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Hello => "HELLO".into(),
            Self::Auth { user, pass } => format!("auth {user} {pass}"),
            Self::SetDefaults => "SET DEFAULTS".into(),
            Self::Set { option, enabled } => {
                let state = if *enabled { "ON" } else { "OFF" };
                format!("SET {} {state}", option.token())
            }
            Self::GetEvent { event_id, format } => {
                format!("GET EVENT {event_id}{}", format.request_clause())
            }
            Self::GetUpdate {
                revision,
                event_id,
                format,
            } => format!(
                "GET UPDATE {revision} OF EVENT {event_id}{}",
                format.request_clause()
            ),
            Self::GetUpdates { event_id, format } => {
                format!("GET UPDATES OF EVENT {event_id}{}", format.request_clause())
            }
            Self::Select { scope, params } => {
                let mut line = String::from("SELECT");
                match scope {
                    SelectScope::All => {}
                    SelectScope::Archived => line.push_str(" ARCHIVED"),
                    SelectScope::Updated => line.push_str(" UPDATED"),
                }
                line.push_str(" EVENTS");
                if let Some(from) = params.from {
                    line.push_str(" FROM ");
                    line.push_str(&format_request_time(from));
                }
                if let Some(to) = params.to {
                    line.push_str(" TO ");
                    line.push_str(&format_request_time(to));
                }
                line.push_str(&params.format.request_clause());
                if !params.where_expr.is_empty() {
                    line.push_str(" WHERE ");
                    line.push_str(&params.where_expr);
                }
                if let Some(order_by) = params.order_by {
                    line.push(' ');
                    line.push_str(order_by.as_clause());
                }
                if params.limit > 0 {
                    line.push_str(&format!(" LIMIT {}", params.limit));
                    if params.offset > 0 {
                        line.push_str(&format!(" OFFSET {}", params.offset));
                    }
                }
                line
            }
            Self::Abort => "ABORT".into(),
        }
    }

    /// Serialize to wire bytes, CRLF-terminated.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}\r\n", self.to_wire()).into_bytes()
    }

    /// True if the rendered request must not appear in logs.
    pub fn is_sensitive(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Parse a request line (case-insensitive keywords).
    ///
    /// The line may include the trailing `\r\n`.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches('\n').trim_end_matches('\r');
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let keyword = tokens
            .first()
            .ok_or_else(|| QuakeLinkError::InvalidCommand("empty command".into()))?;

        match keyword.to_uppercase().as_str() {
            "HELLO" => {
                reject_extra(&tokens, 1, "HELLO")?;
                Ok(Self::Hello)
            }
            "AUTH" => {
                let user = required(&tokens, 1, "AUTH requires a user")?;
                let pass = required(&tokens, 2, "AUTH requires a password")?;
                reject_extra(&tokens, 3, "AUTH")?;
                Ok(Self::Auth {
                    user: user.to_owned(),
                    pass: pass.to_owned(),
                })
            }
            "SET" => {
                let token = required(&tokens, 1, "SET requires an option")?;
                if token.eq_ignore_ascii_case("DEFAULTS") {
                    reject_extra(&tokens, 2, "SET DEFAULTS")?;
                    return Ok(Self::SetDefaults);
                }
                let option = SessionOption::parse_token(token).ok_or_else(|| {
                    QuakeLinkError::InvalidCommand(format!("unknown option: {token:?}"))
                })?;
                let state = required(&tokens, 2, "SET requires ON or OFF")?;
                let enabled = match state.to_uppercase().as_str() {
                    "ON" => true,
                    "OFF" => false,
                    other => {
                        return Err(QuakeLinkError::InvalidCommand(format!(
                            "SET: expected ON or OFF, got {other:?}"
                        )));
                    }
                };
                reject_extra(&tokens, 3, "SET")?;
                Ok(Self::Set { option, enabled })
            }
            "GET" => parse_get(&tokens),
            "SELECT" => parse_select(&tokens),
            "ABORT" => {
                reject_extra(&tokens, 1, "ABORT")?;
                Ok(Self::Abort)
            }
            _ => Err(QuakeLinkError::InvalidCommand(format!(
                "unknown command: {keyword:?}"
            ))),
        }
    }
}

fn required<'a>(tokens: &[&'a str], index: usize, message: &str) -> Result<&'a str> {
    tokens
        .get(index)
        .copied()
        .ok_or_else(|| QuakeLinkError::InvalidCommand(message.to_owned()))
}

fn expect_keyword(tokens: &[&str], index: usize, keyword: &str) -> Result<()> {
    let token = required(tokens, index, &format!("expected {keyword}"))?;
    if token.eq_ignore_ascii_case(keyword) {
        Ok(())
    } else {
        Err(QuakeLinkError::InvalidCommand(format!(
            "expected {keyword}, got {token:?}"
        )))
    }
}

fn reject_extra(tokens: &[&str], expected_len: usize, command: &str) -> Result<()> {
    if tokens.len() > expected_len {
        Err(QuakeLinkError::InvalidCommand(format!(
            "{command}: unexpected extra arguments"
        )))
    } else {
        Ok(())
    }
}

fn parse_format_clause(tokens: &[&str], index: usize) -> Result<FormatSpec> {
    expect_keyword(tokens, index, "AS")?;
    let spec = required(tokens, index + 1, "AS requires a format")?;
    FormatSpec::parse(spec)
}

fn parse_get(tokens: &[&str]) -> Result<Command> {
    let what = required(tokens, 1, "GET requires arguments")?;
    match what.to_uppercase().as_str() {
        "EVENT" => {
            let event_id = required(tokens, 2, "GET EVENT requires an event id")?;
            let format = parse_format_clause(tokens, 3)?;
            reject_extra(tokens, 5, "GET EVENT")?;
            Ok(Command::GetEvent {
                event_id: event_id.to_owned(),
                format,
            })
        }
        "UPDATE" => {
            let revision = required(tokens, 2, "GET UPDATE requires a revision")?;
            let revision: i32 = revision.parse().map_err(|_| {
                QuakeLinkError::InvalidCommand(format!("invalid revision: {revision:?}"))
            })?;
            expect_keyword(tokens, 3, "OF")?;
            expect_keyword(tokens, 4, "EVENT")?;
            let event_id = required(tokens, 5, "GET UPDATE requires an event id")?;
            let format = parse_format_clause(tokens, 6)?;
            reject_extra(tokens, 8, "GET UPDATE")?;
            Ok(Command::GetUpdate {
                revision,
                event_id: event_id.to_owned(),
                format,
            })
        }
        "UPDATES" => {
            expect_keyword(tokens, 2, "OF")?;
            expect_keyword(tokens, 3, "EVENT")?;
            let event_id = required(tokens, 4, "GET UPDATES requires an event id")?;
            let format = parse_format_clause(tokens, 5)?;
            reject_extra(tokens, 7, "GET UPDATES")?;
            Ok(Command::GetUpdates {
                event_id: event_id.to_owned(),
                format,
            })
        }
        other => Err(QuakeLinkError::InvalidCommand(format!(
            "GET: expected EVENT, UPDATE or UPDATES, got {other:?}"
        ))),
    }
}

fn parse_select(tokens: &[&str]) -> Result<Command> {
    let mut index = 1;
    let scope = match tokens.get(index).map(|t| t.to_uppercase()) {
        Some(t) if t == "ARCHIVED" => {
            index += 1;
            SelectScope::Archived
        }
        Some(t) if t == "UPDATED" => {
            index += 1;
            SelectScope::Updated
        }
        _ => SelectScope::All,
    };
    expect_keyword(tokens, index, "EVENTS")?;
    index += 1;

    let mut params = SelectParams::default();
    let mut format_seen = false;
    while index < tokens.len() {
        match tokens[index].to_uppercase().as_str() {
            "FROM" => {
                let value = required(tokens, index + 1, "FROM requires a time")?;
                params.from = Some(parse_request_time(value)?);
                index += 2;
            }
            "TO" => {
                let value = required(tokens, index + 1, "TO requires a time")?;
                params.to = Some(parse_request_time(value)?);
                index += 2;
            }
            "AS" => {
                let value = required(tokens, index + 1, "AS requires a format")?;
                params.format = FormatSpec::parse(value)?;
                format_seen = true;
                index += 2;
            }
            "WHERE" => {
                let mut expr = Vec::new();
                index += 1;
                while index < tokens.len() {
                    let upper = tokens[index].to_uppercase();
                    if upper == "ORDER" || upper == "LIMIT" || upper == "OFFSET" {
                        break;
                    }
                    expr.push(tokens[index]);
                    index += 1;
                }
                if expr.is_empty() {
                    return Err(QuakeLinkError::InvalidCommand(
                        "WHERE requires an expression".into(),
                    ));
                }
                params.where_expr = expr.join(" ");
            }
            "ORDER" => {
                expect_keyword(tokens, index + 1, "BY")?;
                expect_keyword(tokens, index + 2, "OTIME")?;
                let direction = required(tokens, index + 3, "ORDER BY requires ASC or DESC")?;
                params.order_by = Some(match direction.to_uppercase().as_str() {
                    "ASC" => OrderBy::OriginTimeAsc,
                    "DESC" => OrderBy::OriginTimeDesc,
                    other => {
                        return Err(QuakeLinkError::InvalidCommand(format!(
                            "ORDER BY: expected ASC or DESC, got {other:?}"
                        )));
                    }
                });
                index += 4;
            }
            "LIMIT" => {
                let value = required(tokens, index + 1, "LIMIT requires a count")?;
                params.limit = value.parse().map_err(|_| {
                    QuakeLinkError::InvalidCommand(format!("invalid LIMIT: {value:?}"))
                })?;
                index += 2;
            }
            "OFFSET" => {
                let value = required(tokens, index + 1, "OFFSET requires a count")?;
                params.offset = value.parse().map_err(|_| {
                    QuakeLinkError::InvalidCommand(format!("invalid OFFSET: {value:?}"))
                })?;
                index += 2;
            }
            other => {
                return Err(QuakeLinkError::InvalidCommand(format!(
                    "SELECT: unexpected token {other:?}"
                )));
            }
        }
    }
    if !format_seen {
        return Err(QuakeLinkError::InvalidCommand(
            "SELECT requires an AS clause".into(),
        ));
    }
    Ok(Command::Select { scope, params })
}
