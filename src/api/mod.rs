pub mod game;
pub mod health;

use crate::AppState;
use axum::Router;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/game", game::router())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::AppState;
    use futures_util::future::{self, BoxFuture};
    use futures_util::FutureExt;
    use space_surfer::sources::{QuoteTransport, RawStream};
    use space_surfer::types::Quote;
    use space_surfer::{Config, FeedError, GameEngine};
    use std::sync::Arc;

    /// Transport whose connection attempts never complete.
    pub struct Idle;

    impl QuoteTransport for Idle {
        fn name(&self) -> &'static str {
            "idle"
        }

        fn connect(&self, _: &str) -> BoxFuture<'static, Result<RawStream, FeedError>> {
            future::pending().boxed()
        }

        fn parse(&self, _: &str) -> Result<Option<Quote>, FeedError> {
            Ok(None)
        }
    }

    pub fn state() -> AppState {
        let config = Arc::new(Config::default());
        let (engine, _) = GameEngine::new(config.clone(), Arc::new(Idle));
        AppState { config, engine }
    }
}
