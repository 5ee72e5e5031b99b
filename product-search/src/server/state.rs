// App state for the HTTP server
use crate::query::QueryService;

#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
}
