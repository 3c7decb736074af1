use crate::condition::RoutingCondition;
use eventbridge_common::{Event, Route};
use serde_json::json;

/// An ordered `(condition, route)` pair. Rules are evaluated in declaration
/// order; the first whose condition matches wins (§4.6).
#[derive(Debug, Clone)]
pub struct RoutingRule {
    pub condition: RoutingCondition,
    pub route: Route,
}

impl RoutingRule {
    pub fn new(condition: RoutingCondition, route: Route) -> Self {
        Self { condition, route }
    }
}

/// Holds an ordered list of rules and an optional default route.
///
/// `find_route` is a pure function of `(rules, default, source, event)`
/// (P4) — it never suspends and never mutates the router.
#[derive(Debug, Clone, Default)]
pub struct Router {
    rules: Vec<RoutingRule>,
    default_route: Option<Route>,
}

impl Router {
    pub fn new(rules: Vec<RoutingRule>, default_route: Option<Route>) -> Self {
        Self {
            rules,
            default_route,
        }
    }

    /// Evaluates rules against `event`, augmented with the synthetic
    /// `source` field equal to `source_name`, and returns the first
    /// matching rule's route, or the default route if none match, or
    /// `None` if there is no default either.
    pub fn find_route(&self, source_name: &str, event: &Event) -> Option<Route> {
        let mut effective = event.as_json();
        if let Some(obj) = effective.as_object_mut() {
            obj.insert("source".to_string(), json!(source_name));
        }

        for rule in &self.rules {
            if rule.condition.matches(&effective) {
                return Some(rule.route.clone());
            }
        }

        self.default_route.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::RoutingCondition;
    use eventbridge_common::Event;
    use serde_json::json;

    fn route(broker: &str) -> Route {
        Route {
            broker_name: broker.to_string(),
            exchange_name: "e1".to_string(),
            routing_key: "k.a".to_string(),
            properties: None,
        }
    }

    #[test]
    fn s1_route_by_source_name() {
        let router = Router::new(
            vec![RoutingRule::new(
                RoutingCondition::compile("source == 'orgA'").unwrap(),
                route("b1"),
            )],
            None,
        );

        let event = Event::new("/topic/x", 1, json!({}));
        assert_eq!(router.find_route("orgA", &event), Some(route("b1")));
        assert_eq!(router.find_route("orgB", &event), None);
    }

    #[test]
    fn s2_fallback_to_default() {
        let default = route("b1");
        let router = Router::new(vec![], Some(default.clone()));
        let event = Event::new("/topic/x", 1, json!({}));
        assert_eq!(router.find_route("orgA", &event), Some(default.clone()));
        assert_eq!(router.find_route("orgB", &event), Some(default));
    }

    #[test]
    fn first_matching_rule_wins() {
        let router = Router::new(
            vec![
                RoutingRule::new(RoutingCondition::compile("source == 'orgA'").unwrap(), route("first")),
                RoutingRule::new(RoutingCondition::compile("source == 'orgA'").unwrap(), route("second")),
            ],
            None,
        );
        let event = Event::new("/topic/x", 1, json!({}));
        assert_eq!(router.find_route("orgA", &event), Some(route("first")));
    }

    #[test]
    fn rules_can_see_event_payload() {
        let router = Router::new(
            vec![RoutingRule::new(
                RoutingCondition::compile("data.payload.Type == 'Account'").unwrap(),
                route("b1"),
            )],
            None,
        );
        let event = Event::new("/topic/x", 1, json!({"Type": "Account"}));
        assert_eq!(router.find_route("orgA", &event), Some(route("b1")));
    }
}
