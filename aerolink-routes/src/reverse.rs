use std::sync::Arc;

use tracing::debug;

use aerolink_core::repository::RouteRepository;
use aerolink_core::CoreResult;

use crate::resolver::RouteGraphResolver;

/// Finds the route flying a given route's itinerary backwards.
///
/// Start and end airports are taken from the resolved chain's head and tail,
/// never from segment id order. Only routes of the same airline match.
#[derive(Clone)]
pub struct ReverseRouteMatcher {
    routes: Arc<dyn RouteRepository>,
    resolver: RouteGraphResolver,
}

impl ReverseRouteMatcher {
    pub fn new(routes: Arc<dyn RouteRepository>) -> Self {
        Self {
            resolver: RouteGraphResolver::new(routes.clone()),
            routes,
        }
    }

    /// Code of the first route of the same airline, by code order, starting at
    /// `code`'s end airport and ending at its start airport; `None` when no such
    /// route or no route `code` exists.
    pub async fn find_reverse_route(&self, code: &str) -> CoreResult<Option<String>> {
        let Some(route) = self.routes.get_route(code).await? else {
            return Ok(None);
        };

        let original = self.resolver.get_route(code).await?;
        let (start, end) = (original.origin(), original.destination());

        for candidate in self.routes.route_codes_departing_from(end).await? {
            if candidate == code {
                continue;
            }
            match self.routes.get_route(&candidate).await? {
                Some(other) if other.airline_code == route.airline_code => {}
                _ => continue,
            }
            let chain = self.resolver.get_route(&candidate).await?;
            if chain.origin() == end && chain.destination() == start {
                debug!(route = %code, reverse = %candidate, "Matched reverse route");
                return Ok(Some(candidate));
            }
        }

        debug!(route = %code, "No reverse route");
        Ok(None)
    }
}
