use std::sync::{
  LazyLock,
  OnceLock
};

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

/// Forms accepted for a wall-clock
/// deadline, tried in order. The
/// first one is what a browser
/// `datetime-local` input produces.
const LOCAL_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%d %H:%M:%S"
];

static RELATIVE_RE: LazyLock<Regex> =
  LazyLock::new(|| {
    Regex::new(
      r"^\+(?P<num>\d+)(?P<unit>[dhm])$"
    )
    .expect("relative deadline regex")
  });

static PROJECT_TZ: OnceLock<Tz> =
  OnceLock::new();

/// Installs the zone that local
/// deadlines are read and shown in.
/// Only the first call per process
/// takes effect; returns whether this
/// one did.
pub fn set_project_timezone(
  tz: Tz
) -> bool {
  match PROJECT_TZ.set(tz) {
    | Ok(()) => {
      tracing::info!(timezone = %tz, "project timezone set");
      true
    }
    | Err(rejected) => {
      tracing::warn!(
        kept = %project_timezone(),
        rejected = %rejected,
        "project timezone already set"
      );
      false
    }
  }
}

/// UTC until [`set_project_timezone`]
/// runs.
pub fn project_timezone() -> &'static Tz
{
  PROJECT_TZ
    .get()
    .unwrap_or(&chrono_tz::UTC)
}

/// Short card form, e.g. `Mar 04,
/// 09:30`.
#[must_use]
pub fn format_deadline(
  dt: DateTime<Utc>
) -> String {
  dt.with_timezone(project_timezone())
    .format("%b %d, %H:%M")
    .to_string()
}

#[must_use]
pub fn format_timestamp(
  dt: DateTime<Utc>
) -> String {
  dt.with_timezone(project_timezone())
    .format("%Y-%m-%d %H:%M")
    .to_string()
}

/// Pins a wall-clock time in `tz` to
/// an instant. A repeated hour takes
/// the earlier instant; a skipped
/// hour moves forward by an hour, the
/// way a browser reads a
/// `datetime-local` value.
fn resolve_local(
  tz: Tz,
  local: NaiveDateTime,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  let resolved =
    match tz.from_local_datetime(&local)
    {
      | LocalResult::None => {
        tracing::debug!(context, timezone = %tz, "local time skipped by a clock change");
        local
          .checked_add_signed(
            Duration::hours(1)
          )
          .and_then(|shifted| {
            tz.from_local_datetime(
              &shifted
            )
            .earliest()
          })
      }
      | other => other.earliest()
    };

  resolved
    .map(|dt| dt.with_timezone(&Utc))
    .ok_or_else(|| {
      anyhow!(
        "{context} has no instant in \
         {tz}"
      )
    })
}

fn parse_local_naive(
  token: &str
) -> Option<NaiveDateTime> {
  LOCAL_FORMATS.iter().find_map(|fmt| {
    NaiveDateTime::parse_from_str(
      token, fmt
    )
    .ok()
  })
}

fn local_midnight(
  tz: Tz,
  date: NaiveDate,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  resolve_local(
    tz,
    date.and_time(NaiveTime::MIN),
    context
  )
}

fn relative_offset(
  num: i64,
  unit: &str
) -> Option<Duration> {
  match unit {
    | "d" => Duration::try_days(num),
    | "h" => Duration::try_hours(num),
    | _ => Duration::try_minutes(num)
  }
}

/// Parses a user supplied deadline.
///
/// Accepts RFC 3339, local
/// `YYYY-MM-DDTHH:MM` (and the
/// space/seconds variants),
/// `YYYY-MM-DD`, `today`,
/// `tomorrow`, and relative
/// `+Nd`/`+Nh`/`+Nm`.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_deadline(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<DateTime<Utc>> {
  parse_deadline_in(
    *project_timezone(),
    input,
    now
  )
}

/// [`parse_deadline`] against an
/// explicit zone.
pub fn parse_deadline_in(
  tz: Tz,
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<DateTime<Utc>> {
  let token = input.trim();
  if token.is_empty() {
    return Err(anyhow!(
      "deadline cannot be empty"
    ));
  }
  let today =
    now.with_timezone(&tz).date_naive();

  match token
    .to_ascii_lowercase()
    .as_str()
  {
    | "now" => return Ok(now),
    | "today" => {
      return local_midnight(
        tz, today, "today"
      );
    }
    | "tomorrow" => {
      let next =
        today.succ_opt().ok_or_else(
          || {
            anyhow!(
              "deadline out of range: \
               {token}"
            )
          }
        )?;
      return local_midnight(
        tz, next, "tomorrow"
      );
    }
    | _ => {}
  }

  if let Some(caps) =
    RELATIVE_RE.captures(token)
  {
    let out_of_range = || {
      anyhow!(
        "deadline out of range: {token}"
      )
    };
    let num: i64 = caps["num"]
      .parse()
      .map_err(|_| out_of_range())?;
    return relative_offset(
      num,
      &caps["unit"]
    )
    .and_then(|offset| {
      now.checked_add_signed(offset)
    })
    .ok_or_else(out_of_range);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.with_timezone(&Utc));
  }

  if let Some(ndt) =
    parse_local_naive(token)
  {
    return resolve_local(tz, ndt, token);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return local_midnight(
      tz, date, token
    )
    .context("invalid date");
  }

  Err(anyhow!(
    "unrecognized deadline: {token}"
  ))
}

/// Serde helper for the persisted
/// `deadline` field. Writes RFC 3339;
/// reads RFC 3339, the browser's
/// local `YYYY-MM-DDTHH:MM` form, an
/// empty string or `null`.
pub mod deadline_serde {
  use chrono::{
    DateTime,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    value: &Option<DateTime<Utc>>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match value {
      | Some(dt) => serializer
        .serialize_str(&dt.to_rfc3339()),
      | None => serializer.serialize_none()
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<Option<DateTime<Utc>>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw: Option<String> =
      Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
      return Ok(None);
    };
    let token = raw.trim();
    if token.is_empty() {
      return Ok(None);
    }

    if let Ok(dt) =
      DateTime::parse_from_rfc3339(token)
    {
      return Ok(Some(
        dt.with_timezone(&Utc)
      ));
    }

    let ndt = super::parse_local_naive(
      token
    )
    .ok_or_else(|| {
      serde::de::Error::custom(format!(
        "invalid deadline: {token}"
      ))
    })?;
    super::resolve_local(
      *super::project_timezone(),
      ndt,
      token
    )
    .map(Some)
    .map_err(serde::de::Error::custom)
  }
}
