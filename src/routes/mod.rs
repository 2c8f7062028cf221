pub mod health;
pub mod trigger;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use health::health_check;
pub use trigger::trigger_backup;

/// Build the HTTP router; the manual trigger is only mounted when enabled
pub fn router(state: AppState) -> Router {
    let mut router = Router::new().route("/health", get(health_check));

    if state.config.enable_test_trigger {
        router = router.route("/api/backup/test", get(trigger_backup));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
