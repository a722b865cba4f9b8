//src/context.rs
//! Process-wide theme and session state, created once at startup and handed
//! to the service.
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info};

use crate::config::{load_config, save_config, ConfigError, ThemeMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeContext {
    mode: ThemeMode,
    /// Where the flag is persisted; `None` keeps it in memory only.
    config_path: Option<PathBuf>,
}

impl ThemeContext {
    #[must_use]
    pub const fn new(mode: ThemeMode, config_path: Option<PathBuf>) -> Self {
        Self { mode, config_path }
    }

    #[must_use]
    pub const fn mode(&self) -> ThemeMode {
        self.mode
    }

    #[must_use]
    pub fn is_dark(&self) -> bool {
        self.mode == ThemeMode::Dark
    }

    /// Sets the mode and writes it to the config file.
    /// # Errors
    /// `ConfigError` if the file cannot be read back or written; the in-memory
    /// mode is already changed in that case.
    pub fn set_mode(&mut self, mode: ThemeMode) -> Result<(), ConfigError> {
        self.mode = mode;
        if let Some(path) = &self.config_path {
            let mut config = load_config(path)?;
            config.theme = mode;
            save_config(path, &config)?;
            debug!(theme = %mode, "theme saved");
        }
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<ThemeMode, ConfigError> {
        self.set_mode(self.mode.toggled())?;
        Ok(self.mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
}

/// Which screen set the user may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Default)]
pub struct Auth {
    session: Option<Session>,
    subscribers: Vec<Sender<SessionEvent>>,
}

impl Auth {
    #[must_use]
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session,
            subscribers: Vec::new(),
        }
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The id stamped on records created by the current user.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user_id.as_str())
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        if self.session.is_some() {
            Screen::Authenticated
        } else {
            Screen::Unauthenticated
        }
    }

    /// Receives every session change from now on.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn sign_in(&mut self, session: Session) {
        info!(user_id = %session.user_id, "signed in");
        self.session = Some(session.clone());
        self.notify(&SessionEvent::SignedIn(session));
    }

    pub fn sign_out(&mut self) {
        if self.session.take().is_some() {
            info!("signed out");
            self.notify(&SessionEvent::SignedOut);
        }
    }

    // Dropped receivers are forgotten.
    fn notify(&mut self, event: &SessionEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
