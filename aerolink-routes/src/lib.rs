pub mod sections;
pub mod chain;
pub mod builder;
pub mod resolver;
pub mod reverse;
pub mod scheduler;
pub mod search;

pub use sections::SectionSpec;
pub use chain::{RouteChain, RouteChainView};
pub use builder::{NewRouteRequest, RouteChainBuilder, RoutePairCreated};
pub use resolver::{AirlineRoute, RouteGraphResolver};
pub use reverse::ReverseRouteMatcher;
pub use scheduler::{DatePair, FlightScheduler, ScheduleCreated};
pub use search::{FlightSearch, RoundTripResult};
