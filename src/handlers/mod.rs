//! Business handlers served behind the pipeline.
//!
//! Handlers are grouped the way the config file declares them: the
//! [`user`] group (`/api/user...`) and the [`open`] group
//! (`/open-api/...`). [`operations`] is the compiled-in route table the
//! registry is built from; [`routes`] wires the same table into an axum
//! router, passing every handler through [`AdviceStage::wrap`] so that the
//! advice applies to whichever group it is scoped to.

pub mod open;
pub mod user;

use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::advice::AdviceStage;
use crate::registry::Operation;

/// Every route served by this crate, keyed by handler id.
#[must_use]
pub fn operations() -> Vec<Operation> {
    vec![
        Operation::new(user::REGISTER, Method::POST, user::REGISTER_PATH),
        Operation::new(user::REMOVE, Method::DELETE, user::REMOVE_PATH),
        Operation::new(open::ECHO, Method::POST, open::ECHO_PATH),
        Operation::new(open::GREET, Method::GET, open::GREET_PATH),
    ]
}

pub fn routes<S>(advice: &Arc<AdviceStage>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(
            user::REGISTER_PATH,
            post(advice.wrap(user::REGISTER, user::register)),
        )
        .route(
            user::REMOVE_PATH,
            delete(advice.wrap(user::REMOVE, user::remove)),
        )
        .route(open::ECHO_PATH, post(advice.wrap(open::ECHO, open::echo)))
        .route(open::GREET_PATH, get(advice.wrap(open::GREET, open::greet)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn operation_table_has_unique_routes_and_ids() {
        let ops = operations();
        let routes: HashSet<_> = ops.iter().map(|o| (o.method.clone(), o.path)).collect();
        let ids: HashSet<_> = ops.iter().map(|o| o.id).collect();
        assert_eq!(routes.len(), ops.len());
        assert_eq!(ids.len(), ops.len());
    }
}
