//! Cron-style scheduled jobs.
//!
//! A [`Schedule`] uses the classic field names (`year`, `month`, `day`,
//! `week`, `day_of_week`, `hour`, `minute`, `second`) with string
//! expressions such as `"*/5"`, `"1-5"`, `"mon,wed"`:
//!
//! ```rust,ignore
//! bot.on_schedule(Schedule::new().minute("0"), still_here)?;
//! bot.on_schedule(Schedule::new().day_of_week("mon-fri").hour("9"), standup)?;
//! ```
//!
//! Fields more significant than the least significant one given default to
//! `*`; less significant ones default to their minimum. `second` is `0`
//! unless given. Weekdays count from Monday (`0` = Monday, `6` = Sunday).
//!
//! `year` and `week` (ISO week) act as filters on top of the cron
//! expression evaluated by `croner`.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use croner::Cron;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wren_core::{BotError, BotResult, Event};

use crate::bot::Bot;
use crate::context::Context;
use crate::dispatcher::spawn_isolated;
use crate::handler::HandlerRef;

// ============================================================================
// Schedule
// ============================================================================

/// Cron-style schedule description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
    pub week: Option<String>,
    pub day_of_week: Option<String>,
    pub hour: Option<String>,
    pub minute: Option<String>,
    pub second: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// `utc`, `local`, or a fixed offset such as `+02:00`.
    pub timezone: Option<String>,
}

macro_rules! schedule_setters {
    ($($field:ident),* $(,)?) => {
        $(
            pub fn $field(mut self, value: impl ToString) -> Self {
                self.$field = Some(value.to_string());
                self
            }
        )*
    };
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    schedule_setters!(
        year,
        month,
        day,
        week,
        day_of_week,
        hour,
        minute,
        second,
        start_date,
        end_date,
        timezone,
    );

    /// The six-field cron expression (`sec min hour dom month dow`).
    pub fn cron_expression(&self) -> BotResult<String> {
        // Significance order; `None` marks the filter-only fields.
        let fields: [(&Option<String>, Option<&str>); 8] = [
            (&self.year, None),
            (&self.month, Some("1")),
            (&self.day, Some("1")),
            (&self.week, None),
            (&self.day_of_week, None),
            (&self.hour, Some("0")),
            (&self.minute, Some("0")),
            (&self.second, Some("0")),
        ];
        let least = fields.iter().rposition(|(v, _)| v.is_some());

        let resolved: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, (value, minimum))| match (value, least) {
                (Some(v), _) => v.trim().to_owned(),
                (None, Some(least)) if i > least => minimum.unwrap_or("*").to_owned(),
                _ => "*".to_owned(),
            })
            .collect();

        let second = if self.second.is_some() {
            resolved[7].clone()
        } else {
            "0".to_owned()
        };
        let day_of_week = translate_day_of_week(&resolved[4])?;

        Ok(format!(
            "{second} {minute} {hour} {day} {month} {day_of_week}",
            minute = resolved[6],
            hour = resolved[5],
            day = resolved[2],
            month = resolved[1],
        ))
    }

    /// Compiles the schedule into a trigger.
    pub fn compile(&self) -> BotResult<Trigger> {
        let expression = self.cron_expression()?;
        let cron = Cron::new(&expression)
            .with_seconds_required()
            .with_dom_and_dow()
            .parse()
            .map_err(|e| invalid(format!("cron expression '{expression}': {e}")))?;

        let timezone = match &self.timezone {
            Some(tz) => JobTimezone::parse(tz)?,
            None => JobTimezone::Local,
        };

        Ok(Trigger {
            expression,
            cron,
            years: self.year.as_deref().map(|y| FieldSet::parse(y, 1970, 9999)).transpose()?,
            weeks: self.week.as_deref().map(|w| FieldSet::parse(w, 1, 53)).transpose()?,
            start: self.start_date.as_deref().map(|d| timezone.parse_datetime(d)).transpose()?,
            end: self.end_date.as_deref().map(|d| timezone.parse_datetime(d)).transpose()?,
            timezone,
        })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let named = [
            ("year", &self.year),
            ("month", &self.month),
            ("day", &self.day),
            ("week", &self.week),
            ("day_of_week", &self.day_of_week),
            ("hour", &self.hour),
            ("minute", &self.minute),
            ("second", &self.second),
            ("start_date", &self.start_date),
            ("end_date", &self.end_date),
            ("timezone", &self.timezone),
        ];
        let parts: Vec<String> = named
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| format!("{k}='{v}'")))
            .collect();
        write!(f, "cron[{}]", parts.join(", "))
    }
}

fn invalid(message: impl Into<String>) -> BotError {
    BotError::InvalidOptions(message.into())
}

// ============================================================================
// Field translation
// ============================================================================

const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// Monday-based weekday (0-6 or name) to cron numbering (1 = Monday,
/// 7 = Sunday).
fn weekday_number(token: &str) -> BotResult<u32> {
    let lower = token.trim().to_ascii_lowercase();
    if let Some(i) = WEEKDAYS.iter().position(|d| *d == lower) {
        return Ok(i as u32 + 1);
    }
    match lower.parse::<u32>() {
        Ok(n) if n <= 6 => Ok(n + 1),
        _ => Err(invalid(format!("invalid day_of_week '{token}'"))),
    }
}

fn translate_day_of_week(expr: &str) -> BotResult<String> {
    if expr == "*" || expr == "?" {
        return Ok("*".to_owned());
    }

    let mut out = Vec::new();
    for item in expr.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step = step
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(|| invalid(format!("invalid day_of_week step in '{item}'")))?;
                (range.trim(), Some(step))
            }
            None => (item.trim(), None),
        };

        let (lo, hi) = match range {
            "*" => (1, 7),
            r => match r.split_once('-') {
                Some((a, b)) => (weekday_number(a)?, weekday_number(b)?),
                None => {
                    let n = weekday_number(r)?;
                    (n, if step.is_some() { 7 } else { n })
                }
            },
        };
        if lo > hi {
            return Err(invalid(format!("invalid day_of_week range '{item}'")));
        }

        match step {
            Some(step) => out.extend((lo..=hi).step_by(step).map(|d| d.to_string())),
            None if lo == hi => out.push(lo.to_string()),
            None => out.push(format!("{lo}-{hi}")),
        }
    }
    Ok(out.join(","))
}

/// A set of integers written as a cron field, used for the filter-only
/// fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    ranges: Vec<(u32, u32, u32)>,
}

impl FieldSet {
    pub fn parse(expr: &str, min: u32, max: u32) -> BotResult<Self> {
        let mut ranges = Vec::new();
        for item in expr.split(',') {
            let item = item.trim();
            let (range, step) = match item.split_once('/') {
                Some((r, s)) => (
                    r,
                    s.parse::<u32>()
                        .ok()
                        .filter(|s| *s > 0)
                        .ok_or_else(|| invalid(format!("invalid step in '{item}'")))?,
                ),
                None => (item, 1),
            };
            let parse = |s: &str| {
                s.trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|v| (min..=max).contains(v))
                    .ok_or_else(|| invalid(format!("'{s}' is out of range {min}-{max}")))
            };
            let (lo, hi) = match range {
                "*" => (min, max),
                r => match r.split_once('-') {
                    Some((a, b)) => (parse(a)?, parse(b)?),
                    None if step > 1 => (parse(r)?, max),
                    None => {
                        let v = parse(r)?;
                        (v, v)
                    }
                },
            };
            if lo > hi {
                return Err(invalid(format!("invalid range '{item}'")));
            }
            ranges.push((lo, hi, step));
        }
        Ok(Self { ranges })
    }

    pub fn contains(&self, value: u32) -> bool {
        self.ranges
            .iter()
            .any(|&(lo, hi, step)| value >= lo && value <= hi && (value - lo) % step == 0)
    }

    /// Largest member.
    pub fn max(&self) -> u32 {
        self.ranges.iter().map(|&(_, hi, _)| hi).max().unwrap_or(0)
    }
}

// ============================================================================
// Timezone
// ============================================================================

/// The timezone a schedule is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTimezone {
    Utc,
    Local,
    Fixed(FixedOffset),
}

impl JobTimezone {
    pub fn parse(tz: &str) -> BotResult<Self> {
        let tz = tz.trim();
        match tz.to_ascii_lowercase().as_str() {
            "utc" | "z" | "gmt" => return Ok(Self::Utc),
            "local" => return Ok(Self::Local),
            _ => {}
        }

        let (sign, rest) = match tz.as_bytes().first() {
            Some(b'+') => (1, &tz[1..]),
            Some(b'-') => (-1, &tz[1..]),
            _ => return Err(invalid(format!("unknown timezone '{tz}'"))),
        };
        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(format!("unknown timezone '{tz}'")));
        }
        let (hours, minutes) = match digits.len() {
            2 => (digits.parse::<i32>().ok(), Some(0)),
            4 => (digits[..2].parse::<i32>().ok(), digits[2..].parse::<i32>().ok()),
            _ => (None, None),
        };
        let seconds = hours
            .zip(minutes)
            .map(|(h, m)| sign * (h * 3600 + m * 60))
            .ok_or_else(|| invalid(format!("unknown timezone '{tz}'")))?;
        FixedOffset::east_opt(seconds)
            .map(Self::Fixed)
            .ok_or_else(|| invalid(format!("timezone offset out of range '{tz}'")))
    }

    /// Parses a date or date-time, interpreting naive values in this zone.
    pub fn parse_datetime(&self, s: &str) -> BotResult<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(|| invalid(format!("invalid date '{s}'")))?;

        let resolved = match self {
            Self::Utc => Some(Utc.from_utc_datetime(&naive)),
            Self::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        };
        resolved.ok_or_else(|| invalid(format!("date '{s}' does not exist in {self:?}")))
    }
}

// ============================================================================
// Trigger
// ============================================================================

/// A compiled schedule.
#[derive(Debug, Clone)]
pub struct Trigger {
    expression: String,
    cron: Cron,
    years: Option<FieldSet>,
    weeks: Option<FieldSet>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    timezone: JobTimezone,
}

const MAX_FILTER_SKIPS: usize = 100_000;

impl Trigger {
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The first fire time strictly after `after`, honouring the start and
    /// end bounds. `None` once the schedule is exhausted.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let (mut from, mut inclusive) = match self.start {
            Some(start) if start > after => (start, true),
            _ => (after, false),
        };

        for _ in 0..MAX_FILTER_SKIPS {
            let candidate = match self.timezone {
                JobTimezone::Utc => self.occurrence(&from, inclusive)?,
                JobTimezone::Local => self.occurrence(&from.with_timezone(&Local), inclusive)?,
                JobTimezone::Fixed(offset) => {
                    self.occurrence(&from.with_timezone(&offset), inclusive)?
                }
            };

            if self.end.is_some_and(|end| candidate.0 > end) {
                return None;
            }
            let (year, week) = candidate.1;
            if let Some(years) = &self.years
                && !years.contains(year)
            {
                if year > years.max() {
                    return None;
                }
                from = candidate.0;
                inclusive = false;
                continue;
            }
            if self.weeks.as_ref().is_some_and(|w| !w.contains(week)) {
                from = candidate.0;
                inclusive = false;
                continue;
            }
            return Some(candidate.0);
        }

        warn!(expression = %self.expression, "No fire time satisfies the year/week filters");
        None
    }

    /// Next cron occurrence as UTC, with the local year and ISO week.
    fn occurrence<Tz: TimeZone>(
        &self,
        from: &DateTime<Tz>,
        inclusive: bool,
    ) -> Option<(DateTime<Utc>, (u32, u32))> {
        let next = self.cron.find_next_occurrence(from, inclusive).ok()?;
        let local = next.naive_local();
        let year = u32::try_from(local.year()).ok()?;
        Some((next.with_timezone(&Utc), (year, local.iso_week().week())))
    }
}

// ============================================================================
// Scheduler
// ============================================================================

struct Job {
    schedule: Schedule,
    trigger: Trigger,
    handler: HandlerRef,
}

/// Registered jobs, started together when the bot starts.
#[derive(Default)]
pub struct Scheduler {
    jobs: parking_lot::Mutex<Vec<Job>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores a job.
    pub fn add(&self, schedule: Schedule, handler: HandlerRef) -> BotResult<()> {
        let trigger = schedule.compile()?;
        info!(schedule = %schedule, cron = trigger.expression(), handler = handler.name(), "New schedule");
        self.jobs.lock().push(Job {
            schedule,
            trigger,
            handler,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Spawns one timer task per job. Tasks stop when `token` is cancelled.
    pub fn start(&self, bot: &Bot, token: &CancellationToken) {
        let jobs = self.jobs.lock();
        for job in jobs.iter() {
            let bot = bot.clone();
            let token = token.clone();
            let trigger = job.trigger.clone();
            let handler = job.handler.clone();
            let label = job.schedule.to_string();

            tokio::spawn(async move {
                loop {
                    let now = Utc::now();
                    let Some(next) = trigger.next_after(now) else {
                        info!(job = handler.name(), schedule = %label, "Schedule exhausted");
                        break;
                    };
                    let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                    debug!(job = handler.name(), next = %next, "Waiting for next run");

                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(wait) => {}
                    }

                    let event = Event::new("schedule")
                        .with("job", handler.name())
                        .with("ts", next.to_rfc3339());
                    spawn_isolated(handler.clone(), Context::with_event(bot.clone(), event));
                }
            });
        }
        if !jobs.is_empty() {
            info!(count = jobs.len(), "Scheduler started");
        }
    }
}
