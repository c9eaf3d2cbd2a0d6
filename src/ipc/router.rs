use super::handlers;
use super::reply::err;
use super::types::{AppState, Request};
use serde_json::Value;

type Domain = fn(&mut AppState, &Request) -> Option<Value>;

/// Each domain claims its own `domain.*` methods and passes on the rest.
const DOMAINS: &[Domain] = &[
    handlers::core::try_handle,
    handlers::students::try_handle,
    handlers::assignments::try_handle,
    handlers::gradebook::try_handle,
    handlers::attendance::try_handle,
    handlers::dashboard::try_handle,
    handlers::backup_exchange::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> Value {
    for domain in DOMAINS {
        if let Some(resp) = domain(state, &req) {
            return resp;
        }
    }
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
