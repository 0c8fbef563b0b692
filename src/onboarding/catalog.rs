use serde::Serialize;
use utoipa::ToSchema;

/// Banking products a fully onboarded customer can switch on.
pub const SERVICE_CATALOG: &[(&str, &str)] = &[
    ("savings_account", "Savings account"),
    ("debit_card", "Debit card"),
    ("upi", "UPI payments"),
    ("net_banking", "Net banking"),
    ("credit_card", "Credit card"),
    ("fixed_deposit", "Fixed deposit"),
];

#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceOffer {
    pub id: String,
    pub label: String,
}

#[must_use]
pub fn offers() -> Vec<ServiceOffer> {
    SERVICE_CATALOG
        .iter()
        .map(|(id, label)| ServiceOffer {
            id: (*id).to_string(),
            label: (*label).to_string(),
        })
        .collect()
}

#[must_use]
pub fn is_known(id: &str) -> bool {
    SERVICE_CATALOG.iter().any(|(known, _)| *known == id)
}
