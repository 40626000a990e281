use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow,
  bail
};
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const DEFAULT_SLOT: &str =
  "smart-tasks";

const RC_ENV_VAR: &str = "SMARTTASKRC";

const DEFAULTS: [(&str, &str); 6] = [
  ("data.location", "~/.smarttask"),
  ("storage.slot", DEFAULT_SLOT),
  ("color", "on"),
  ("auth.delay_ms", "1000"),
  ("due_soon.days", "3"),
  ("timezone", "UTC")
];

/// One meaningful rc line.
#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Include(&'a str),
  Set(&'a str, &'a str)
}

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  /// Canonical paths, in load order.
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      map:          DEFAULTS
        .iter()
        .map(|(k, v)| {
          (k.to_string(), v.to_string())
        })
        .collect(),
      loaded_files: Vec::new()
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rcfile_override
  ))]
  pub fn load(
    rcfile_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    match rc_source(rcfile_override) {
      | Some(path) => {
        info!(rcfile = %path.display(), "loading rc file");
        cfg.load_file(&path)?;
      }
      | None => {
        debug!("no rc file; defaults only")
      }
    }

    Ok(cfg)
  }

  /// `--rc` pairs. A leading `rc.`
  /// on the key is ignored.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      let key = match key
        .strip_prefix("rc.")
      {
        | Some(bare) => bare.to_string(),
        | None => key
      };
      debug!(key = %key, value = %value, "applying override");
      self.map.insert(key, value);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// Accepts `on/off`, `yes/no`,
  /// `y/n`, `true/false` and `1/0`.
  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|raw| {
        parse_switch(raw).ok_or_else(
          || {
            anyhow!(
              "config key {key} must be \
               on or off, got: {raw}"
            )
          }
        )
      })
      .transpose()
  }

  pub fn get_u64(
    &self,
    key: &str
  ) -> anyhow::Result<Option<u64>> {
    self
      .map
      .get(key)
      .map(|v| {
        v.trim().parse::<u64>().with_context(
          || {
            format!(
              "config key {key} must \
               be a non-negative \
               integer, got: {v}"
            )
          }
        )
      })
      .transpose()
  }

  pub fn slot_name(&self) -> String {
    self
      .get("storage.slot")
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
      .unwrap_or_else(|| {
        DEFAULT_SLOT.to_string()
      })
  }

  pub fn auth_delay(
    &self
  ) -> anyhow::Result<Duration> {
    Ok(Duration::from_millis(
      self
        .get_u64("auth.delay_ms")?
        .unwrap_or(1000)
    ))
  }

  pub fn due_soon_window(
    &self
  ) -> anyhow::Result<chrono::Duration>
  {
    let days = self
      .get_u64("due_soon.days")?
      .unwrap_or(3);
    i64::try_from(days)
      .ok()
      .and_then(chrono::Duration::try_days)
      .ok_or_else(|| {
        anyhow!(
          "due_soon.days is too \
           large: {days}"
        )
      })
  }

  /// IANA zone for local deadlines;
  /// blank means UTC.
  pub fn timezone(
    &self
  ) -> anyhow::Result<Tz> {
    let raw = self
      .get("timezone")
      .unwrap_or_default();
    let name = raw.trim();
    if name.is_empty() {
      return Ok(chrono_tz::UTC);
    }
    name.parse::<Tz>().map_err(|err| {
      anyhow!(
        "config key timezone is not a \
         known zone: {name} ({err})"
      )
    })
  }

  /// Reads one rc file and, depth
  /// first, whatever it includes. A
  /// file already loaded is skipped,
  /// so include cycles end.
  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = home_relative(path);
    let canonical = path
      .canonicalize()
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    if self
      .loaded_files
      .contains(&canonical)
    {
      warn!(file = %canonical.display(), "rc file already loaded; skipping include");
      return Ok(());
    }

    let text =
      fs::read_to_string(&canonical)
        .with_context(|| {
          format!(
            "failed to read {}",
            canonical.display()
          )
        })?;
    self
      .loaded_files
      .push(canonical.clone());

    let dir = canonical
      .parent()
      .unwrap_or_else(|| Path::new("."))
      .to_path_buf();

    for (idx, raw) in
      text.lines().enumerate()
    {
      let line = parse_rc_line(raw)
        .with_context(|| {
          format!(
            "invalid config line {}:{}",
            canonical.display(),
            idx + 1
          )
        })?;

      match line {
        | None => {}
        | Some(RcLine::Set(key, value)) => {
          trace!(key, value, "loaded config key");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
        | Some(RcLine::Include(target)) => {
          let target =
            dir.join(home_relative(
              Path::new(target)
            ));
          if target.exists() {
            self.load_file(&target)?;
          } else {
            warn!(include = %target.display(), "included rc file is missing; skipping");
          }
        }
      }
    }

    Ok(())
  }
}

/// Creates the data directory if it
/// is missing. `--data` wins over
/// `data.location`.
#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = match (
    override_dir,
    cfg.get("data.location")
  ) {
    | (Some(dir), _) => dir.to_path_buf(),
    | (None, Some(location))
      if !location.trim().is_empty() =>
    {
      home_relative(Path::new(
        location.trim()
      ))
    }
    | (None, _) => dirs::home_dir()
      .map(|home| home.join(".smarttask"))
      .ok_or_else(|| {
        anyhow!(
          "cannot determine home \
           directory"
        )
      })?
  };

  fs::create_dir_all(&dir)
    .with_context(|| {
      format!(
        "failed to create {}",
        dir.display()
      )
    })?;
  debug!(dir = %dir.display(), "data directory ready");

  Ok(dir)
}

/// `--rcfile`, then `$SMARTTASKRC`
/// (`/dev/null` turns the rc file
/// off), then `~/.smarttaskrc` if it
/// exists.
fn rc_source(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(env_path) =
    std::env::var(RC_ENV_VAR)
  {
    return (env_path != "/dev/null")
      .then(|| PathBuf::from(env_path));
  }

  dirs::home_dir()
    .map(|home| {
      home.join(".smarttaskrc")
    })
    .filter(|path| path.exists())
}

fn parse_rc_line(
  raw: &str
) -> anyhow::Result<Option<RcLine<'_>>>
{
  let line = raw
    .split_once('#')
    .map_or(raw, |(kept, _)| kept)
    .trim();
  if line.is_empty() {
    return Ok(None);
  }

  if let Some(target) =
    line.strip_prefix("include ")
  {
    let target = target.trim();
    if target.is_empty() {
      bail!("include needs a path");
    }
    return Ok(Some(RcLine::Include(
      target
    )));
  }

  match line.split_once('=') {
    | Some((key, value))
      if !key.trim().is_empty() =>
    {
      Ok(Some(RcLine::Set(
        key.trim(),
        value.trim()
      )))
    }
    | _ => bail!(
      "expected key = value, got: \
       {line}"
    )
  }
}

fn home_relative(path: &Path) -> PathBuf {
  match (
    path.strip_prefix("~"),
    dirs::home_dir()
  ) {
    | (Ok(rest), Some(home)) => {
      home.join(rest)
    }
    | _ => path.to_path_buf()
  }
}

fn parse_switch(raw: &str) -> Option<bool> {
  match raw
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "on" | "yes" | "y" | "true"
    | "1" => Some(true),
    | "off" | "no" | "n" | "false"
    | "0" => Some(false),
    | _ => None
  }
}
