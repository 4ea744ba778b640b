//! Application state management

use crate::auth::{AuthGateway, PasswordConfig};
use crate::clock::Clock;
use rolodex_core::{AccountStore, AppConfig, ContactStore, Mailer, Result};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
///
/// Built once at startup; everything mutable lives behind the stores.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Account persistence
    pub accounts: Arc<dyn AccountStore>,
    /// Contact persistence
    pub contacts: Arc<dyn ContactStore>,
    /// Time source for tokens and date checks
    pub clock: Arc<dyn Clock>,
    /// Account mutations and token issuance
    pub auth: AuthGateway,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create state with production password hashing cost
    pub fn new(
        config: AppConfig,
        accounts: Arc<dyn AccountStore>,
        contacts: Arc<dyn ContactStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::with_password_config(
            config,
            accounts,
            contacts,
            mailer,
            clock,
            PasswordConfig::default(),
        )
    }

    pub fn with_password_config(
        config: AppConfig,
        accounts: Arc<dyn AccountStore>,
        contacts: Arc<dyn ContactStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        passwords: PasswordConfig,
    ) -> Result<Self> {
        let auth = AuthGateway::new(&config, accounts.clone(), mailer, clock.clone(), passwords)?;

        Ok(Self {
            config,
            accounts,
            contacts,
            clock,
            auth,
            start_time: Instant::now(),
        })
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
