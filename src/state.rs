use std::sync::Arc;
use tokio::sync::RwLock;

use crate::backend::{ActivityLog, OwnershipLookup, ProfileTable, RoleRequestTable};
use crate::config::Config;
use crate::db::Store;
use crate::gateway::Gateway;
use crate::routing::{Navigator, RouteGuard, RouteTable};
use crate::services::{
    Authorizer, ClassroomService, DefaultProfileService, DefaultRoleRequestService,
    DefaultSessionService, NotificationService, Notifier, ProfileService, RoleRequestService,
    SeaOrmClassroomService, SeaOrmCredentialStore, SessionService,
};
use crate::session::SessionContext;

/// Everything one device needs: the store, the service graph wired over it
/// and the session context they share.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub context: Arc<SessionContext>,

    pub credentials: Arc<SeaOrmCredentialStore>,

    pub sessions: Arc<dyn SessionService>,

    pub authorizer: Arc<Authorizer>,

    pub profiles: Arc<dyn ProfileService>,

    pub role_requests: Arc<dyn RoleRequestService>,

    pub classrooms: Arc<dyn ClassroomService>,

    pub notifications: Arc<NotificationService>,

    pub guard: Arc<RouteGuard>,

    pub gateway: Gateway,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::init(config, None).await
    }

    /// Resumes a previously issued credential token.
    pub async fn with_token(config: Config, token: String) -> anyhow::Result<Self> {
        Self::init(config, Some(token)).await
    }

    async fn init(config: Config, token: Option<String>) -> anyhow::Result<Self> {
        config.validate()?;

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let credentials = Arc::new(match token {
            Some(token) => {
                SeaOrmCredentialStore::with_token(store.clone(), config.security.clone(), token)
            }
            None => SeaOrmCredentialStore::new(store.clone(), config.security.clone()),
        });

        let tables = Arc::new(store.clone());
        let profile_table: Arc<dyn ProfileTable> = tables.clone();
        let lookup: Arc<dyn OwnershipLookup> = tables.clone();
        let request_table: Arc<dyn RoleRequestTable> = tables.clone();
        let activity: Arc<dyn ActivityLog> = tables;

        let context = Arc::new(SessionContext::new());
        let sessions: Arc<dyn SessionService> = Arc::new(DefaultSessionService::new(
            credentials.clone(),
            profile_table.clone(),
            context.clone(),
        ));

        let authorizer = Arc::new(Authorizer::new(lookup));

        let notifications = Arc::new(NotificationService::new(
            store.clone(),
            config.general.event_bus_buffer_size,
        ));

        let profiles: Arc<dyn ProfileService> = Arc::new(DefaultProfileService::new(
            profile_table.clone(),
            authorizer.clone(),
            activity.clone(),
        ));

        let notifier: Arc<dyn Notifier> = notifications.clone();
        let role_requests: Arc<dyn RoleRequestService> = Arc::new(
            DefaultRoleRequestService::new(request_table, profile_table, activity)
                .with_notifier(notifier),
        );

        let classrooms: Arc<dyn ClassroomService> = Arc::new(SeaOrmClassroomService::new(
            store.clone(),
            authorizer.clone(),
        ));

        let guard = Arc::new(RouteGuard::new(
            RouteTable::word_venture(),
            &config.routing.sign_in_path,
            sessions.clone(),
        )?);

        let gateway = Gateway::new(
            sessions.clone(),
            profiles.clone(),
            role_requests.clone(),
            classrooms.clone(),
            notifications.clone(),
        );

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            context,
            credentials,
            sessions,
            authorizer,
            profiles,
            role_requests,
            classrooms,
            notifications,
            guard,
            gateway,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }

    /// A navigator bound to this state's route guard.
    #[must_use]
    pub fn navigator(&self) -> Navigator {
        Navigator::new(self.guard.clone())
    }
}
