use anyhow::Result;

use crate::store::{LocalStore, ONBOARDING_KEY};

/// Introduction shown on first run, as (title, body) pages.
pub const PAGES: &[(&str, &str)] = &[
    (
        "Welcome to Skyra!",
        "Your weather companion: current conditions the moment you ask.",
    ),
    (
        "About the app",
        "Forecasts, hourly breakdowns and city search. Save favorites to check them at a glance.",
    ),
    (
        "Accounts",
        "Sign in to keep favorites and unit preferences with your account across devices.",
    ),
];

/// First-run introduction gate.
#[derive(Debug, Clone)]
pub struct Onboarding {
    store: LocalStore,
}

impl Onboarding {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn is_complete(&self) -> Result<bool> {
        Ok(self.store.get(ONBOARDING_KEY)?.as_deref() == Some("true"))
    }

    pub fn complete(&self) -> Result<()> {
        self.store.set(ONBOARDING_KEY, "true")
    }

    /// Shows the introduction again on next start.
    pub fn reset(&self) -> Result<()> {
        self.store.remove(ONBOARDING_KEY)
    }
}
