use crate::{
    configuration::{MapSettings, Settings},
    modules::{
        database::get_store,
        extractors::jwt::{JwtAccessSecret, TokenExtractors},
        store::GroupStore,
        subscriptions::SubscriptionRegistry,
    },
    utils::{
        chat::ChatService, events::EventService, groups::GroupService, users::UserService,
    },
};
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(FromRef, Clone)]
pub struct AppState {
    pub store: Arc<dyn GroupStore>,
    pub groups: GroupService,
    pub chat: ChatService,
    pub events: EventService,
    pub users: UserService,
    pub subscriptions: SubscriptionRegistry,
    pub token_ext: TokenExtractors,
    pub map: MapSettings,
}

impl AppState {
    pub async fn new(config: Settings, test_store: Option<Arc<dyn GroupStore>>) -> Self {
        let token_ext = TokenExtractors {
            access: JwtAccessSecret(config.app.access_jwt_secret),
        };

        let store = match test_store {
            Some(store) => store,
            None => get_store(config.postgres).await,
        };

        let events = EventService::new(store.clone());
        if let Some(catalog) = &config.events.catalog_file {
            events
                .load_catalog(catalog)
                .await
                .expect("Failed to load event catalog");
        }

        AppState {
            groups: GroupService::new(store.clone(), config.groups),
            chat: ChatService::new(store.clone(), config.chat),
            events,
            users: UserService::new(store.clone()),
            subscriptions: SubscriptionRegistry::new(),
            token_ext,
            map: config.map,
            store,
        }
    }
}
