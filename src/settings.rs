use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::Deserialize;
use url::Url;
use crate::error::{Error, Result};

pub const LOGIN_PATH: &str = "/Account/Login";
pub const GRADES_PATH: &str = "/StudentGrades/StudentGradesWidgets/LastGradesList";
const MAX_NIGHT_DURATION: u64 = 24;

// Contents of `settings.json`. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Seconds between two polls of the grades page.
    pub reload_interval: u64,
    // Local hour at which the quiet window starts.
    pub night_hour: u32,
    // Length of the quiet window, in hours.
    pub night_duration: u64,
    pub max_retries: u32,
    pub retry_interval: u64,
    pub request_timeout: u64,
    pub base_url: String,
    pub database: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            reload_interval: 60,
            night_hour: 2,
            night_duration: 5,
            max_retries: 3,
            retry_interval: 600,
            request_timeout: 30,
            base_url: "https://my2.ism.lt".to_string(),
            database: PathBuf::from("main.db"),
        }
    }
}

// The two portal pages the poller talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub login: Url,
    pub grades: Url,
}

impl Endpoints {
    pub fn from_base(base: &str) -> Result<Self> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("base_url {} is not an absolute http(s) URL", base)));
        }
        Ok(Endpoints {
            login: base.join(LOGIN_PATH)?,
            grades: base.join(GRADES_PATH)?,
        })
    }
}

// How long and how often a degraded session checks the portal before giving up.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            interval: Duration::from_secs(600),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read settings file {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.reload_interval < 1 {
            return Err(Error::Config("reload_interval must be at least 1 second".into()));
        }
        if self.night_hour > 23 {
            return Err(Error::Config(format!("night_hour must be within 0-23, got {}", self.night_hour)));
        }
        if self.night_duration > MAX_NIGHT_DURATION {
            return Err(Error::Config(format!(
                "night_duration must be at most {} hours, got {}",
                MAX_NIGHT_DURATION, self.night_duration
            )));
        }
        if self.max_retries < 1 {
            return Err(Error::Config("max_retries must be at least 1".into()));
        }
        if self.retry_interval < 1 {
            return Err(Error::Config("retry_interval must be at least 1 second".into()));
        }
        if self.request_timeout < 1 {
            return Err(Error::Config("request_timeout must be at least 1 second".into()));
        }
        self.endpoints()?;
        Ok(())
    }

    pub fn endpoints(&self) -> Result<Endpoints> {
        Endpoints::from_base(&self.base_url)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            interval: Duration::from_secs(self.retry_interval),
        }
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    // Extra pause to take when a cycle ends during the night hour.
    pub fn night_rest(&self, hour: u32) -> Option<Duration> {
        if hour != self.night_hour || self.night_duration == 0 {
            return None;
        }
        self.night_duration.checked_mul(60 * 60).map(Duration::from_secs)
    }
}
