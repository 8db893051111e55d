use cqrs_domain::chrono::{TimeZone, Utc};
use cqrs_domain::criteria::Criteria;
use cqrs_domain::domain_event::DomainEvent;
use cqrs_domain::error::DomainError;
use cqrs_domain::repository::{InMemoryRepository, ReadRepository};
use cqrs_domain::specification::{
    InMemoryQuery, Specification, SpecificationEvaluator, TrackingMode,
};
use cqrs_macros::domain_event;

#[derive(Debug, Clone, PartialEq)]
struct Order {
    id: u32,
    customer: &'static str,
    total: u32,
}

struct ForCustomer(&'static str);

impl Criteria<Order> for ForCustomer {
    fn is_satisfied_by(&self, candidate: &Order) -> bool {
        candidate.customer == self.0
    }
}

fn orders() -> Vec<Order> {
    vec![
        Order { id: 1, customer: "ann", total: 30 },
        Order { id: 2, customer: "bob", total: 10 },
        Order { id: 3, customer: "ann", total: 10 },
        Order { id: 4, customer: "cid", total: 50 },
        Order { id: 5, customer: "ann", total: 20 },
    ]
}

#[test]
fn composed_criteria_with_secondary_order() {
    let spec = Specification::<Order>::new()
        .filter(ForCustomer("ann").or(ForCustomer("bob")))
        .order_by(|o: &Order| o.total)
        .then_by_descending(|o: &Order| o.id)
        .as_read_only();

    let result = SpecificationEvaluator::apply(InMemoryQuery::new(orders()), &spec).unwrap();
    let ids: Vec<_> = result.to_vec().iter().map(|o| o.id).collect();

    assert_eq!(ids, vec![3, 2, 5, 1]);
    assert_eq!(result.tracking_mode(), TrackingMode::ReadOnly);
}

#[test]
fn count_ignores_order_and_window() {
    let spec = Specification::<Order>::new()
        .filter(ForCustomer("cid").not())
        .include("lines")
        .order_by_descending(|o: &Order| o.total)
        .paginate(1, 1);

    let counted =
        SpecificationEvaluator::apply_for_count(InMemoryQuery::new(orders()), &spec).unwrap();
    assert_eq!(counted.count(), 4);
    assert_eq!(counted.describe(), vec!["filter", "include:lines"]);
}

#[tokio::test]
async fn negative_skip_is_rejected_before_execution() {
    let repo = InMemoryRepository::with_items(orders());
    let spec = Specification::<Order>::new().paginate(-1, 2);

    let err = repo.list(&spec).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidSpecification { .. }));
}

#[domain_event(event_type = "order.placed")]
struct OrderPlaced {
    order_id: u32,
}

#[test]
fn domain_event_macro_exposes_type_and_time() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let event = OrderPlaced {
        event_date_time: at,
        order_id: 9,
    };

    assert_eq!(OrderPlaced::EVENT_TYPE, "order.placed");
    assert_eq!(event.clone().event_date_time(), at);
    assert_eq!(event.order_id, 9);
}
