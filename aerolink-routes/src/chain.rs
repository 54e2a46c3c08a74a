//! Reconstruction of a route's segment chain from its flat detail rows.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveTime, TimeDelta};
use serde::Serialize;
use uuid::Uuid;

use aerolink_core::geo::{elapsed_between, format_hh_mm};
use aerolink_core::{CoreError, CoreResult};
use aerolink_shared::models::RouteDetail;

/// Orders the details of one route by following `next_id` from the head.
///
/// The head is the one detail no other detail points at. No head, several
/// heads, a dangling or cyclic `next_id`, or segments unreachable from the
/// head are reported as `DataIntegrity`; the chain is never repaired.
pub fn order_chain(route_code: &str, details: Vec<RouteDetail>) -> CoreResult<Vec<RouteDetail>> {
    let total = details.len();
    let mut by_id: HashMap<Uuid, RouteDetail> = HashMap::with_capacity(total);
    for detail in details {
        let id = detail.id;
        if by_id.insert(id, detail).is_some() {
            return Err(CoreError::DataIntegrity(format!(
                "Route {} has duplicate segment {}",
                route_code, id
            )));
        }
    }

    let referenced: HashSet<Uuid> = by_id.values().filter_map(|d| d.next_id).collect();
    let heads: Vec<Uuid> = by_id
        .keys()
        .filter(|id| !referenced.contains(id))
        .copied()
        .collect();

    let head = match heads.as_slice() {
        [head] => *head,
        [] => {
            return Err(CoreError::DataIntegrity(format!(
                "Route {} has no head segment",
                route_code
            )))
        }
        many => {
            return Err(CoreError::DataIntegrity(format!(
                "Route {} has {} head segments",
                route_code,
                many.len()
            )))
        }
    };

    let mut ordered = Vec::with_capacity(total);
    let mut visited = HashSet::with_capacity(total);
    let mut cursor = Some(head);

    while let Some(id) = cursor {
        if !visited.insert(id) {
            return Err(CoreError::DataIntegrity(format!(
                "Route {} has a cycle at segment {}",
                route_code, id
            )));
        }
        let detail = by_id.remove(&id).ok_or_else(|| {
            CoreError::DataIntegrity(format!(
                "Route {} links to missing segment {}",
                route_code, id
            ))
        })?;
        cursor = detail.next_id;
        ordered.push(detail);
    }

    if ordered.len() != total {
        return Err(CoreError::DataIntegrity(format!(
            "Route {} has {} segments unreachable from its head",
            route_code,
            total - ordered.len()
        )));
    }

    Ok(ordered)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSegment {
    pub detail: RouteDetail,
    pub flight_time: TimeDelta,
    /// Ground time since the previous arrival; `None` for the first segment
    pub layover: Option<TimeDelta>,
}

/// A route's segments in flying order with derived timings.
/// Always holds at least one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChain {
    route_code: String,
    segments: Vec<ChainSegment>,
    total_duration: TimeDelta,
}

impl RouteChain {
    pub fn from_details(route_code: &str, details: Vec<RouteDetail>) -> CoreResult<Self> {
        let ordered = order_chain(route_code, details)?;

        let mut segments: Vec<ChainSegment> = Vec::with_capacity(ordered.len());
        let mut total_duration = TimeDelta::zero();

        for detail in ordered {
            let flight_time = elapsed_between(detail.departure_time, detail.arrival_time);
            let layover = segments
                .last()
                .map(|prev| elapsed_between(prev.detail.arrival_time, detail.departure_time));

            total_duration = total_duration + flight_time + layover.unwrap_or_else(TimeDelta::zero);
            segments.push(ChainSegment {
                detail,
                flight_time,
                layover,
            });
        }

        Ok(Self {
            route_code: route_code.to_string(),
            segments,
            total_duration,
        })
    }

    pub fn route_code(&self) -> &str {
        &self.route_code
    }

    pub fn segments(&self) -> &[ChainSegment] {
        &self.segments
    }

    /// Sum of every flight time and layover
    pub fn total_duration(&self) -> TimeDelta {
        self.total_duration
    }

    fn first(&self) -> &RouteDetail {
        &self.segments[0].detail
    }

    fn last(&self) -> &RouteDetail {
        &self.segments[self.segments.len() - 1].detail
    }

    pub fn origin(&self) -> &str {
        &self.first().departure_airport
    }

    pub fn destination(&self) -> &str {
        &self.last().arrival_airport
    }

    pub fn first_departure_time(&self) -> NaiveTime {
        self.first().departure_time
    }

    /// Airports in visiting order, origin first
    pub fn airports(&self) -> Vec<&str> {
        std::iter::once(self.origin())
            .chain(self.segments.iter().map(|s| s.detail.arrival_airport.as_str()))
            .collect()
    }

    pub fn view(&self) -> RouteChainView {
        RouteChainView {
            route_code: self.route_code.clone(),
            segments: self
                .segments
                .iter()
                .map(|s| SegmentView {
                    from: s.detail.departure_airport.clone(),
                    to: s.detail.arrival_airport.clone(),
                    departure_time: s.detail.departure_time.format("%H:%M").to_string(),
                    arrival_time: s.detail.arrival_time.format("%H:%M").to_string(),
                    layover_minutes: s.layover.map(|l| l.num_minutes()),
                })
                .collect(),
            total_duration: format_hh_mm(self.total_duration),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentView {
    pub from: String,
    pub to: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub layover_minutes: Option<i64>,
}

/// Serializable shape of a resolved route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteChainView {
    pub route_code: String,
    pub segments: Vec<SegmentView>,
    pub total_duration: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn detail(from: &str, to: &str, dep: NaiveTime, arr: NaiveTime) -> RouteDetail {
        RouteDetail {
            id: Uuid::new_v4(),
            route_code: "AZ100".to_string(),
            route_section_id: Uuid::new_v4(),
            departure_airport: from.to_string(),
            arrival_airport: to.to_string(),
            departure_time: dep,
            arrival_time: arr,
            next_id: None,
        }
    }

    /// FCO -> VCE -> MUC -> LHR, linked in order, returned shuffled.
    fn three_legs() -> Vec<RouteDetail> {
        let mut a = detail("FCO", "VCE", hm(7, 0), hm(8, 1));
        let mut b = detail("VCE", "MUC", hm(10, 1), hm(10, 55));
        let c = detail("MUC", "LHR", hm(23, 0), hm(0, 41));
        b.next_id = Some(c.id);
        a.next_id = Some(b.id);
        vec![c, a, b]
    }

    #[test]
    fn test_order_chain_follows_next_links() {
        let ordered = order_chain("AZ100", three_legs()).unwrap();
        let route: Vec<_> = ordered.iter().map(|d| d.departure_airport.as_str()).collect();
        assert_eq!(route, vec!["FCO", "VCE", "MUC"]);
    }

    #[test]
    fn test_chain_timings_roll_across_midnight() {
        let chain = RouteChain::from_details("AZ100", three_legs()).unwrap();
        let view = chain.view();

        assert_eq!(chain.airports(), vec!["FCO", "VCE", "MUC", "LHR"]);
        assert_eq!(view.segments[0].layover_minutes, None);
        assert_eq!(view.segments[1].layover_minutes, Some(120));
        assert_eq!(view.segments[2].layover_minutes, Some(12 * 60 + 5));
        assert_eq!(chain.segments()[2].flight_time, TimeDelta::minutes(101));
        // 61 + 120 + 54 + 725 + 101
        assert_eq!(view.total_duration, "17:41");
        assert_eq!(view.segments[2].arrival_time, "00:41");
    }

    #[test]
    fn test_two_heads_is_integrity_error() {
        let mut details = three_legs();
        details.push(detail("LHR", "FCO", hm(12, 0), hm(14, 0)));
        let err = order_chain("AZ100", details).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(ref m) if m.contains("2 head segments")));
    }

    #[test]
    fn test_full_cycle_has_no_head() {
        let mut a = detail("FCO", "VCE", hm(7, 0), hm(8, 0));
        let mut b = detail("VCE", "FCO", hm(10, 0), hm(11, 0));
        a.next_id = Some(b.id);
        b.next_id = Some(a.id);
        let err = order_chain("AZ100", vec![a, b]).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(ref m) if m.contains("no head")));
    }

    #[test]
    fn test_detached_cycle_is_unreachable() {
        let mut details = three_legs();
        let mut x = detail("LHR", "CDG", hm(9, 0), hm(10, 0));
        let mut y = detail("CDG", "LHR", hm(12, 0), hm(13, 0));
        x.next_id = Some(y.id);
        y.next_id = Some(x.id);
        details.push(x);
        details.push(y);

        let err = order_chain("AZ100", details).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(ref m) if m.contains("2 segments unreachable")));
    }

    #[test]
    fn test_dangling_next_is_integrity_error() {
        let mut a = detail("FCO", "VCE", hm(7, 0), hm(8, 0));
        a.next_id = Some(Uuid::new_v4());
        let err = order_chain("AZ100", vec![a]).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(ref m) if m.contains("missing segment")));
    }

    #[test]
    fn test_empty_route_has_no_head() {
        assert!(matches!(order_chain("AZ100", vec![]), Err(CoreError::DataIntegrity(_))));
    }
}
