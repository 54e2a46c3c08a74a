use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error};

use aerolink_core::repository::RouteRepository;
use aerolink_core::{CoreError, CoreResult};
use aerolink_shared::models::Route;

use crate::chain::{RouteChain, RouteChainView};

/// A route with its resolved segment chain
#[derive(Debug, Clone, Serialize)]
pub struct AirlineRoute {
    #[serde(flatten)]
    pub route: Route,
    pub chain: RouteChainView,
}

/// Rebuilds ordered segment chains from the per-route detail table
#[derive(Clone)]
pub struct RouteGraphResolver {
    routes: Arc<dyn RouteRepository>,
}

impl RouteGraphResolver {
    pub fn new(routes: Arc<dyn RouteRepository>) -> Self {
        Self { routes }
    }

    pub async fn get_route(&self, code: &str) -> CoreResult<RouteChain> {
        let details = self.routes.list_route_details(code).await?;

        if details.is_empty() {
            return match self.routes.get_route(code).await? {
                Some(_) => Err(CoreError::DataIntegrity(format!("Route {} has no segments", code))),
                None => Err(CoreError::NotFound(format!("Route {} not found", code))),
            };
        }

        let chain = RouteChain::from_details(code, details).inspect_err(|e| {
            error!(route = %code, error = %e, "Route chain is corrupt");
        })?;

        debug!(
            route = %code,
            segments = chain.segments().len(),
            total_minutes = chain.total_duration().num_minutes(),
            "Resolved route chain"
        );
        Ok(chain)
    }

    /// Every route of an airline with its chain, ordered by code
    pub async fn list_airline_routes(&self, airline_code: &str) -> CoreResult<Vec<AirlineRoute>> {
        let mut routes = self.routes.list_routes_by_airline(airline_code).await?;
        routes.sort_by(|a, b| a.code.cmp(&b.code));

        let mut listed = Vec::with_capacity(routes.len());
        for route in routes {
            let chain = self.get_route(&route.code).await?.view();
            listed.push(AirlineRoute { route, chain });
        }
        Ok(listed)
    }
}
