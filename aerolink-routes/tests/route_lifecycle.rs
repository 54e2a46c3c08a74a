use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use aerolink_core::geo::FlightTimeModel;
use aerolink_core::repository::RouteRepository;
use aerolink_core::CoreError;
use aerolink_routes::{
    DatePair, FlightScheduler, FlightSearch, NewRouteRequest, ReverseRouteMatcher, RouteChainBuilder,
    RouteGraphResolver, SectionSpec,
};
use aerolink_shared::models::{AircraftInstance, AircraftModel, Airport, Route, RouteDetail};
use aerolink_store::MemoryStore;

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
}

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (code, latitude, longitude) in [
        ("VCE", 45.505, 12.352),
        ("LHR", 51.470, -0.454),
        ("FCO", 41.8003, 12.2389),
        ("MUC", 48.3538, 11.7861),
        ("AKL", -37.0082, 174.785),
        ("MAD", 40.4719, -3.5626),
    ] {
        store
            .add_airport(Airport {
                iata_code: code.to_string(),
                name: code.to_string(),
                latitude,
                longitude,
                city_id: None,
            })
            .await;
    }
    store
}

async fn add_aircraft(store: &MemoryStore, airline_code: &str) -> Uuid {
    let model_id = Uuid::new_v4();
    store
        .add_aircraft_model(AircraftModel {
            id: model_id,
            name: "A320".to_string(),
            max_economy_seats: 180,
            max_cabin_cols: 7,
        })
        .await;
    let id = Uuid::new_v4();
    store
        .add_aircraft_instance(AircraftInstance {
            id,
            airline_code: airline_code.to_string(),
            aircraft_model_id: model_id,
            current_position: None,
            flying_towards: None,
        })
        .await;
    id
}

fn builder(store: &Arc<MemoryStore>) -> RouteChainBuilder {
    RouteChainBuilder::new(store.clone(), store.clone(), FlightTimeModel::default(), 120)
}

fn scheduler(store: &Arc<MemoryStore>) -> FlightScheduler {
    FlightScheduler::new(store.clone(), store.clone(), store.clone())
}

fn request(number: u32, sections: SectionSpec, turnaround: u32) -> NewRouteRequest {
    NewRouteRequest {
        airline_code: "AZ".to_string(),
        number,
        start_date: day(1),
        end_date: day(30),
        sections,
        return_turnaround_minutes: turnaround,
    }
}

fn venice_london(number: u32) -> NewRouteRequest {
    request(number, SectionSpec::chain("VCE", "LHR", hm(8, 30), &[]), 120)
}

/// FCO -> VCE -> MUC -> LHR, 61 + 120 + 54 + 180 + 101 minutes
fn rome_london(number: u32) -> NewRouteRequest {
    request(
        number,
        SectionSpec::chain("FCO", "VCE", hm(7, 0), &[("VCE", "MUC", 120), ("MUC", "LHR", 180)]),
        90,
    )
}

/// Takes a route code without going through the builder.
async fn occupy(store: &MemoryStore, code: &str, details: Vec<RouteDetail>) {
    occupy_for(store, "AZ", code, details).await;
}

async fn occupy_for(store: &MemoryStore, airline_code: &str, code: &str, details: Vec<RouteDetail>) {
    store
        .add_raw_route(
            Route {
                code: code.to_string(),
                airline_code: airline_code.to_string(),
                start_date: day(1),
                end_date: day(30),
                created_at: Utc::now(),
            },
            details,
        )
        .await;
}

fn raw_detail(code: &str, from: &str, to: &str, next_id: Option<Uuid>) -> RouteDetail {
    RouteDetail {
        id: Uuid::new_v4(),
        route_code: code.to_string(),
        route_section_id: Uuid::new_v4(),
        departure_airport: from.to_string(),
        arrival_airport: to.to_string(),
        departure_time: hm(9, 0),
        arrival_time: hm(10, 0),
        next_id,
    }
}

#[tokio::test]
async fn test_single_segment_route_pair() {
    let store = seeded_store().await;
    let created = builder(&store).insert_new_route(&venice_london(100)).await.unwrap();
    assert_eq!(created.outbound_code, "AZ100");
    assert_eq!(created.return_code, "AZ101");

    let resolver = RouteGraphResolver::new(store.clone());
    let outbound = resolver.get_route("AZ100").await.unwrap().view();
    assert_eq!(outbound.segments.len(), 1);
    assert_eq!(outbound.segments[0].departure_time, "08:30");
    // ~1151 km at 800 km/h plus 30 min overhead
    assert_eq!(outbound.segments[0].arrival_time, "10:26");
    assert_eq!(outbound.total_duration, "01:56");

    let inbound = resolver.get_route("AZ101").await.unwrap().view();
    assert_eq!(inbound.segments[0].from, "LHR");
    assert_eq!(inbound.segments[0].to, "VCE");
    assert_eq!(inbound.segments[0].departure_time, "12:26");
    assert_eq!(inbound.segments[0].arrival_time, "14:22");

    let counts = store.row_counts().await;
    assert_eq!((counts.routes, counts.sections, counts.details), (2, 2, 2));
}

#[tokio::test]
async fn test_multi_segment_chain_round_trips() {
    let store = seeded_store().await;
    builder(&store).insert_new_route(&rome_london(100)).await.unwrap();

    let resolver = RouteGraphResolver::new(store.clone());
    let outbound = resolver.get_route("AZ100").await.unwrap();
    assert_eq!(outbound.airports(), vec!["FCO", "VCE", "MUC", "LHR"]);
    assert_eq!(outbound.total_duration().num_minutes(), 61 + 120 + 54 + 180 + 101);
    assert_eq!(outbound.view().segments[2].arrival_time, "15:36");

    let inbound = resolver.get_route("AZ101").await.unwrap();
    assert_eq!(inbound.airports(), vec!["LHR", "MUC", "VCE", "FCO"]);
    assert_eq!(inbound.first_departure_time(), hm(17, 6));

    let view = inbound.view();
    let layovers: Vec<_> = view.segments.iter().map(|s| s.layover_minutes).collect();
    assert_eq!(layovers, vec![None, Some(180), Some(120)]);
    // Last return leg leaves VCE at 00:41 after midnight
    assert_eq!(view.segments[2].departure_time, "00:41");
    assert_eq!(view.segments[2].arrival_time, "01:42");
    assert_eq!(view.total_duration, "08:36");
}

#[tokio::test]
async fn test_taken_code_is_conflict() {
    let store = seeded_store().await;
    let builder = builder(&store);
    builder.insert_new_route(&venice_london(100)).await.unwrap();

    let err = builder.insert_new_route(&venice_london(100)).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
    assert_eq!(store.row_counts().await.routes, 2);
}

#[tokio::test]
async fn test_return_code_falls_back_then_conflicts() {
    let store = seeded_store().await;
    let builder = builder(&store);

    occupy(&store, "AZ401", vec![raw_detail("AZ401", "VCE", "LHR", None)]).await;
    let created = builder.insert_new_route(&venice_london(400)).await.unwrap();
    assert_eq!(created.return_code, "AZ399");

    occupy(&store, "AZ299", vec![raw_detail("AZ299", "VCE", "LHR", None)]).await;
    occupy(&store, "AZ301", vec![raw_detail("AZ301", "VCE", "LHR", None)]).await;
    let err = builder.insert_new_route(&venice_london(300)).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(ref m) if m.contains("Return slot busy")));
}

#[tokio::test]
async fn test_unknown_airport_writes_nothing() {
    let store = seeded_store().await;
    let spec = SectionSpec::chain("VCE", "LHR", hm(8, 30), &[("LHR", "JFK", 150)]);

    let err = builder(&store).insert_new_route(&request(100, spec, 60)).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(ref m) if m.contains("JFK")));
    assert_eq!(store.row_counts().await.routes, 0);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let store = seeded_store().await;
    let builder = builder(&store);

    let short_wait = request(100, SectionSpec::chain("FCO", "VCE", hm(7, 0), &[("VCE", "MUC", 60)]), 60);
    assert!(matches!(
        builder.insert_new_route(&short_wait).await,
        Err(CoreError::ValidationError(_))
    ));

    let mut reversed_window = venice_london(100);
    reversed_window.start_date = day(30);
    reversed_window.end_date = day(1);
    assert!(matches!(
        builder.insert_new_route(&reversed_window).await,
        Err(CoreError::ValidationError(_))
    ));

    let no_turnaround = request(100, SectionSpec::chain("VCE", "LHR", hm(8, 30), &[]), 0);
    assert!(matches!(
        builder.insert_new_route(&no_turnaround).await,
        Err(CoreError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_legs_and_turnarounds_stay_under_a_day() {
    let store = seeded_store().await;
    let builder = builder(&store);

    // ~19,900 km, over 25 hours in the air
    let antipodal = request(100, SectionSpec::chain("AKL", "MAD", hm(8, 0), &[]), 120);
    let err = builder.insert_new_route(&antipodal).await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationError(ref m) if m.contains("shorter than a day")));

    let full_day = request(100, SectionSpec::chain("VCE", "LHR", hm(8, 30), &[]), 24 * 60);
    let err = builder.insert_new_route(&full_day).await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationError(ref m) if m.contains("turnaround")));
    assert_eq!(store.row_counts().await.routes, 0);

    let longest = request(100, SectionSpec::chain("VCE", "LHR", hm(8, 30), &[]), 24 * 60 - 1);
    builder.insert_new_route(&longest).await.unwrap();
}

#[tokio::test]
async fn test_reverse_route_matching() {
    let store = seeded_store().await;
    builder(&store).insert_new_route(&rome_london(100)).await.unwrap();
    occupy(&store, "AZ500", vec![raw_detail("AZ500", "FCO", "MUC", None)]).await;

    let matcher = ReverseRouteMatcher::new(store.clone());
    assert_eq!(matcher.find_reverse_route("AZ100").await.unwrap().as_deref(), Some("AZ101"));
    assert_eq!(matcher.find_reverse_route("AZ101").await.unwrap().as_deref(), Some("AZ100"));
    assert_eq!(matcher.find_reverse_route("AZ500").await.unwrap(), None);
    assert_eq!(matcher.find_reverse_route("AZ999").await.unwrap(), None);
}

#[tokio::test]
async fn test_reverse_route_stays_within_the_airline() {
    let store = seeded_store().await;
    builder(&store).insert_new_route(&venice_london(100)).await.unwrap();
    // Sorts ahead of AZ101 among the LHR departures
    occupy_for(&store, "AA", "AA5", vec![raw_detail("AA5", "LHR", "VCE", None)]).await;
    occupy_for(&store, "BA", "BA7", vec![raw_detail("BA7", "VCE", "LHR", None)]).await;

    let matcher = ReverseRouteMatcher::new(store.clone());
    assert_eq!(matcher.find_reverse_route("AZ100").await.unwrap().as_deref(), Some("AZ101"));
    assert_eq!(matcher.find_reverse_route("AA5").await.unwrap(), None);
    assert_eq!(matcher.find_reverse_route("BA7").await.unwrap(), None);

    let aircraft = add_aircraft(&store, "AZ").await;
    let created = scheduler(&store)
        .insert_flight_schedule("AZ100", aircraft, &[DatePair::new(day(2), day(2))])
        .await
        .unwrap();
    assert_eq!(created.return_route, "AZ101");
    let codes: Vec<_> = created.flights.iter().map(|f| f.route_code.as_str()).collect();
    assert_eq!(codes, vec!["AZ100", "AZ101"]);

    let foreign = add_aircraft(&store, "AA").await;
    let err = scheduler(&store)
        .insert_flight_schedule("AA5", foreign, &[DatePair::new(day(2), day(2))])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(ref m) if m.contains("No return route")));
}

#[tokio::test]
async fn test_corrupt_chain_is_reported() {
    let store = seeded_store().await;
    occupy(
        &store,
        "AZ900",
        vec![
            raw_detail("AZ900", "FCO", "VCE", None),
            raw_detail("AZ900", "VCE", "MUC", None),
        ],
    )
    .await;
    occupy(&store, "AZ901", vec![]).await;

    let resolver = RouteGraphResolver::new(store.clone());
    assert!(matches!(resolver.get_route("AZ900").await, Err(CoreError::DataIntegrity(_))));
    assert!(matches!(resolver.get_route("AZ901").await, Err(CoreError::DataIntegrity(_))));
    assert!(matches!(resolver.get_route("AZ902").await, Err(CoreError::NotFound(_))));

    let search = FlightSearch::new(store.clone(), store.clone(), store.clone());
    assert!(matches!(
        search.search_flights("FCO", "MUC", day(2), false).await,
        Err(CoreError::DataIntegrity(_))
    ));
}

#[tokio::test]
async fn test_airline_routes_are_listed_by_code() {
    let store = seeded_store().await;
    let builder = builder(&store);
    builder.insert_new_route(&rome_london(200)).await.unwrap();
    builder.insert_new_route(&venice_london(100)).await.unwrap();

    let listed = RouteGraphResolver::new(store.clone())
        .list_airline_routes("AZ")
        .await
        .unwrap();
    let codes: Vec<_> = listed.iter().map(|r| r.route.code.as_str()).collect();
    assert_eq!(codes, vec!["AZ100", "AZ101", "AZ200", "AZ201"]);
    assert_eq!(listed[2].chain.segments.len(), 3);

    let json = serde_json::to_value(&listed[0]).unwrap();
    assert_eq!(json["code"], "AZ100");
    assert_eq!(json["chain"]["total_duration"], "01:56");
}

#[tokio::test]
async fn test_schedule_creates_flight_pairs() {
    let store = seeded_store().await;
    builder(&store).insert_new_route(&venice_london(100)).await.unwrap();
    let aircraft = add_aircraft(&store, "AZ").await;
    let scheduler = scheduler(&store);

    let created = scheduler
        .insert_flight_schedule("AZ100", aircraft, &[DatePair::new(day(2), day(2)), DatePair::new(day(4), day(4))])
        .await
        .unwrap();
    assert_eq!(created.return_route, "AZ101");

    let legs: Vec<_> = created
        .flights
        .iter()
        .map(|f| (f.route_code.as_str(), f.scheduled_departure_day, f.scheduled_arrival_day))
        .collect();
    assert_eq!(
        legs,
        vec![
            ("AZ100", day(2), day(2)),
            ("AZ101", day(2), day(2)),
            ("AZ100", day(4), day(4)),
            ("AZ101", day(4), day(4)),
        ]
    );

    let routes = scheduler.routes_assigned_to_aircraft(aircraft).await.unwrap();
    assert_eq!(routes, vec!["AZ100", "AZ101"]);
}

#[tokio::test]
async fn test_overnight_return_lands_next_day() {
    let store = seeded_store().await;
    builder(&store).insert_new_route(&rome_london(100)).await.unwrap();
    let aircraft = add_aircraft(&store, "AZ").await;

    let created = scheduler(&store)
        .insert_flight_schedule("AZ100", aircraft, &[DatePair::new(day(2), day(2))])
        .await
        .unwrap();
    assert_eq!(created.flights[1].scheduled_departure_day, day(2));
    assert_eq!(created.flights[1].scheduled_arrival_day, day(3));
}

#[tokio::test]
async fn test_schedule_rejections() {
    let store = seeded_store().await;
    builder(&store).insert_new_route(&rome_london(100)).await.unwrap();
    let aircraft = add_aircraft(&store, "AZ").await;
    let foreign = add_aircraft(&store, "BA").await;
    let scheduler = scheduler(&store);

    // Outbound lands on the 2nd, not the 3rd
    let err = scheduler
        .insert_flight_schedule("AZ100", aircraft, &[DatePair::new(day(2), day(3))])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationError(ref m) if m.contains("2025-06-02") && m.contains("2025-06-03")));

    let twice = [DatePair::new(day(2), day(2)), DatePair::new(day(2), day(2))];
    let err = scheduler.insert_flight_schedule("AZ999", aircraft, &twice).await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationError(ref m) if m.contains("Duplicate")));

    assert!(matches!(
        scheduler.insert_flight_schedule("AZ100", aircraft, &[]).await,
        Err(CoreError::ValidationError(_))
    ));
    assert!(matches!(
        scheduler.insert_flight_schedule("AZ999", aircraft, &[DatePair::new(day(2), day(2))]).await,
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        scheduler.insert_flight_schedule("AZ100", Uuid::new_v4(), &[DatePair::new(day(2), day(2))]).await,
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        scheduler.insert_flight_schedule("AZ100", foreign, &[DatePair::new(day(2), day(2))]).await,
        Err(CoreError::ValidationError(_))
    ));

    let july = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
    assert!(matches!(
        scheduler.insert_flight_schedule("AZ100", aircraft, &[DatePair::new(july, july)]).await,
        Err(CoreError::ValidationError(_))
    ));

    // Return of the first pair lands on the 3rd, the second pair departs then
    let err = scheduler
        .insert_flight_schedule("AZ100", aircraft, &[DatePair::new(day(2), day(2)), DatePair::new(day(3), day(3))])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(ref m) if m.contains("2025-06-03")));

    assert_eq!(store.row_counts().await.flights, 0);
}

#[tokio::test]
async fn test_double_booking_is_conflict_and_atomic() {
    let store = seeded_store().await;
    builder(&store).insert_new_route(&venice_london(100)).await.unwrap();
    let aircraft = add_aircraft(&store, "AZ").await;
    let scheduler = scheduler(&store);

    scheduler
        .insert_flight_schedule("AZ100", aircraft, &[DatePair::new(day(5), day(5))])
        .await
        .unwrap();

    let err = scheduler
        .insert_flight_schedule("AZ100", aircraft, &[DatePair::new(day(6), day(6)), DatePair::new(day(5), day(5))])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(ref m) if m.contains("2025-06-05")));
    assert_eq!(store.row_counts().await.flights, 2);
}

#[tokio::test]
async fn test_failed_flight_write_rolls_back_batch() {
    let store = seeded_store().await;
    builder(&store).insert_new_route(&venice_london(100)).await.unwrap();
    let aircraft = add_aircraft(&store, "AZ").await;

    store.fail_on_write(3);
    let result = scheduler(&store)
        .insert_flight_schedule("AZ100", aircraft, &[DatePair::new(day(2), day(2)), DatePair::new(day(4), day(4))])
        .await;
    assert!(matches!(result, Err(CoreError::InternalError(_))));
    assert_eq!(store.row_counts().await.flights, 0);
}

#[tokio::test]
async fn test_flight_search() {
    let store = seeded_store().await;
    let builder = builder(&store);
    builder.insert_new_route(&venice_london(100)).await.unwrap();
    builder.insert_new_route(&rome_london(200)).await.unwrap();
    let aircraft = add_aircraft(&store, "AZ").await;
    let other = add_aircraft(&store, "AZ").await;
    let scheduler = scheduler(&store);
    scheduler
        .insert_flight_schedule("AZ100", aircraft, &[DatePair::new(day(2), day(2))])
        .await
        .unwrap();
    scheduler
        .insert_flight_schedule("AZ200", other, &[DatePair::new(day(2), day(2))])
        .await
        .unwrap();

    let search = FlightSearch::new(store.clone(), store.clone(), store.clone());

    let found = search.search_flights("VCE", "LHR", day(2), true).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].route_code, "AZ100");
    assert!(search.search_flights("VCE", "LHR", day(3), false).await.unwrap().is_empty());

    assert!(search.search_flights("FCO", "LHR", day(2), true).await.unwrap().is_empty());
    let connecting = search.search_flights("FCO", "LHR", day(2), false).await.unwrap();
    assert_eq!(connecting.len(), 1);
    assert_eq!(connecting[0].route_code, "AZ200");

    assert!(matches!(
        search.search_flights("VCE", "VCE", day(2), false).await,
        Err(CoreError::ValidationError(_))
    ));
    assert!(matches!(
        search.search_flights("VCE", "JFK", day(2), false).await,
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        search.search_round_trip("VCE", "LHR", day(2), day(2), false).await,
        Err(CoreError::ValidationError(_))
    ));

    let trip = search.search_round_trip("LHR", "FCO", day(1), day(2), false).await.unwrap();
    assert!(trip.outbound_flights.is_empty());
    assert_eq!(trip.return_flights.len(), 1);
    assert_eq!(trip.return_flights[0].route_code, "AZ200");
}

#[tokio::test]
async fn test_route_details_are_linked_head_to_tail() {
    let store = seeded_store().await;
    builder(&store).insert_new_route(&rome_london(100)).await.unwrap();

    let details = store.list_route_details("AZ100").await.unwrap();
    assert_eq!(details.len(), 3);
    assert_eq!(details.iter().filter(|d| d.next_id.is_none()).count(), 1);
}
