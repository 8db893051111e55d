use cqrs_domain::chrono::Utc;
use cqrs_domain::domain_event::DomainEvent;
use cqrs_macros::domain_event;

#[domain_event(event_type = "catalog.product_created")]
struct ProductCreated {
    product_id: u64,
}

#[domain_event]
#[derive(PartialEq)]
struct StockDepleted {
    event_date_time: cqrs_domain::chrono::DateTime<Utc>,
    sku: String,
}

fn main() {
    let now = Utc::now();
    let created = ProductCreated {
        event_date_time: now,
        product_id: 1,
    };
    assert_eq!(ProductCreated::EVENT_TYPE, "catalog.product_created");
    assert_eq!(created.clone().event_date_time(), now);
    assert_eq!(created.product_id, 1);

    let depleted = StockDepleted {
        event_date_time: now,
        sku: "A-1".into(),
    };
    assert_eq!(StockDepleted::EVENT_TYPE, "StockDepleted");
    assert_eq!(depleted.clone(), depleted);
}
