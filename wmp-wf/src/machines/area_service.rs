//! Area-service request lifecycle
//!
//! A request is either consumed by approval (becoming an assignment) or
//! withdrawn; neither path leaves a request row behind.

use wmp_common::db::ServiceType;

/// Whether approving this service also moves the area's legacy primary
/// company pointer
pub fn updates_primary_company(service_type: ServiceType) -> bool {
    service_type == ServiceType::WasteCollection
}

pub fn approval_message(service_type: ServiceType, area_name: &str) -> String {
    format!(
        "Your request to provide {} in {} has been approved",
        service_label(service_type),
        area_name
    )
}

pub fn withdrawal_message(service_type: ServiceType, area_name: &str) -> String {
    format!(
        "Your request to provide {} in {} was not approved",
        service_label(service_type),
        area_name
    )
}

fn service_label(service_type: ServiceType) -> &'static str {
    match service_type {
        ServiceType::WasteCollection => "waste collection",
        ServiceType::ManholeManagement => "manhole management",
        ServiceType::Recycling => "recycling",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_waste_collection_moves_primary() {
        assert!(updates_primary_company(ServiceType::WasteCollection));
        assert!(!updates_primary_company(ServiceType::ManholeManagement));
        assert!(!updates_primary_company(ServiceType::Recycling));
    }

    #[test]
    fn test_messages_name_service() {
        let msg = approval_message(ServiceType::ManholeManagement, "North");
        assert!(msg.contains("manhole management"));
        assert!(msg.contains("North"));
        assert!(withdrawal_message(ServiceType::Recycling, "South").contains("not approved"));
    }
}
