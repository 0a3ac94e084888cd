use anyhow::{bail, Context, Result};
use memorie_api::{ApiClient, ApiConfig};
use memorie_core::session::{GuardState, Route};
use memorie_core::types::StoredUser;
use memorie_core::{Config, ContactRepository, Session, Store};
use std::sync::Arc;

/// Everything a command needs: configuration, the local store, the session and the backend.
pub struct App {
    pub config: Config,
    pub store: Arc<Store>,
    pub session: Session,
    pub api: ApiClient,
}

impl App {
    pub fn load() -> Result<Self> {
        let config = Config::from_env();
        let store = Store::open(&config.db_path)
            .with_context(|| format!("failed to open store at {}", config.db_path.display()))?
            .with_log_retention(config.log_retention);
        let store = Arc::new(store);
        let api = ApiClient::new(ApiConfig::from(&config));

        tracing::debug!(
            db = %config.db_path.display(),
            api = %api.base_url(),
            "memorie initialized"
        );

        Ok(Self {
            session: Session::new(store.clone()),
            store,
            config,
            api,
        })
    }

    pub fn contacts(&self) -> ContactRepository {
        ContactRepository::hydrate(self.store.clone())
    }

    /// Apply a route guard. `Ok(false)` means the command should stop without error.
    pub fn enter(&self, route: Route) -> Result<bool> {
        match route.guard().check(&self.session) {
            GuardState::Allow | GuardState::Checking => Ok(true),
            GuardState::Redirect(Route::Login) => {
                bail!("Not signed in. Run `memorie login` first.")
            }
            GuardState::Redirect(target) => {
                let name = self.session.current().map(|u| u.name).unwrap_or_default();
                println!("Already signed in as {name} (continue at {})", target.path());
                Ok(false)
            }
        }
    }

    /// The signed-in user, or an error telling the user to log in.
    pub fn require_signed_in(&self) -> Result<StoredUser> {
        self.enter(Route::Dashboard)?;
        self.session
            .current()
            .context("Not signed in. Run `memorie login` first.")
    }
}
