use std::convert::Infallible;
use std::time::Duration;
use chrono::{Local, Timelike};
use log::{debug, error, info, warn};
use reqwest::StatusCode;
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::store::GradeStore;
use crate::utils::grades::parse_grades;
use crate::utils::notify::Notifier;
use crate::utils::session::{AuthSession, SessionConfig};

// What a single poll cycle ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    // The portal dropped the session; a fresh one was logged in.
    Relogged,
    Unchanged,
    // The listing grew; this many grades had unseen identities.
    NewGrades(usize),
}

pub struct PollLoop {
    settings: Settings,
    session: AuthSession,
    store: GradeStore,
    notifier: Box<dyn Notifier>,
}

impl PollLoop {
    pub fn new(
        settings: Settings,
        session: AuthSession,
        store: GradeStore,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        PollLoop {
            settings,
            session,
            store,
            notifier,
        }
    }

    // Logs in and returns a loop ready to run.
    pub async fn start(
        settings: Settings,
        session_config: SessionConfig,
        store: GradeStore,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self> {
        let session = AuthSession::connect(session_config).await?;
        Ok(Self::new(settings, session, store, notifier))
    }

    // Polls forever. Only returns on a fatal error.
    pub async fn run(mut self) -> Result<Infallible> {
        info!("Checking for grades every {} seconds.", self.settings.reload_interval);
        loop {
            if self.run_cycle().await? == CycleOutcome::Relogged {
                continue;
            }

            tokio::time::sleep(self.settings.reload_interval()).await;

            if let Some(rest) = self.settings.night_rest(Local::now().hour()) {
                info!("Resting until {}", resting_until(rest));
                tokio::time::sleep(rest).await;
                info!("Continuing.");
            }
        }
    }

    // Fetch, parse, compare and, when the listing grew, notify and persist.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let grades_url = self.session.config().endpoints.grades.clone();
        let page = self.session.get(&grades_url).await?;
        debug!("Fetched grades page ({}), session {:?}", page.status, self.session.status());

        match page.status {
            StatusCode::OK => {}
            StatusCode::INTERNAL_SERVER_ERROR => {
                warn!("500 status code, restarting session.");
                self.renew_session().await?;
                return Ok(CycleOutcome::Relogged);
            }
            status => {
                return Err(Error::UnexpectedStatus {
                    url: page.url.to_string(),
                    status,
                })
            }
        }

        let current = parse_grades(&page.body)?;
        let username = self.session.config().credential.username.clone();
        let stored = self.store.load(&username)?;

        // Only a longer listing counts as new content; reordering or shrinking does not.
        if current.len() <= stored.len() {
            debug!("No new grades ({} listed, {} stored)", current.len(), stored.len());
            return Ok(CycleOutcome::Unchanged);
        }

        let new_grades = self.store.diff(&current, &username)?;
        info!("Found {} new grades", new_grades.len());

        if !new_grades.is_empty() {
            match self.notifier.notify(new_grades.as_slice(), &username).await {
                Ok(()) => info!("Notification sent"),
                Err(e) => error!("Notification failed, continuing: {:#}", e),
            }
        }

        self.store.replace(&username, &current)?;
        Ok(CycleOutcome::NewGrades(new_grades.len()))
    }

    async fn renew_session(&mut self) -> Result<()> {
        debug!(
            "Discarding {:?} session (login token {})",
            self.session.status(),
            if self.session.login_token().is_some() { "present" } else { "absent" }
        );
        let config = self.session.config().clone();
        self.session = AuthSession::connect(config).await?;
        Ok(())
    }
}

// Wall-clock end of a rest, or its length when the clock cannot represent it.
fn resting_until(rest: Duration) -> String {
    chrono::Duration::from_std(rest)
        .ok()
        .and_then(|rest| Local::now().checked_add_signed(rest))
        .map(|until| until.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| format!("{} hours from now", rest.as_secs() / 3600))
}
