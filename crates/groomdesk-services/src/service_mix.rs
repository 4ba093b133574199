//! Service mix classifier
//!
//! Given the requested services of a visit, already resolved to their
//! bath/groom tags by the catalog, compute what kind of visit it is and how
//! many quota units it deducts. Pure function: no I/O, deterministic for the
//! same tagged list.

use crate::constants::{BATH_UNIT_WEIGHT, GROOM_UNIT_WEIGHT};
use groomdesk_core::models::{ServiceMixResult, ServiceTag, TaggedService, VisitKind};
use groomdesk_core::{AppError, AppResult};

/// Classify a set of requested services and compute the deduction weight
///
/// Weight rule: one bath service costs 1 unit, one groom service costs 4.
/// The visit is Bath or Groom when only one class is present, Mixed
/// otherwise. An empty request is an error, not a zero-weight visit.
pub fn classify(services: &[TaggedService]) -> AppResult<ServiceMixResult> {
    if services.is_empty() {
        return Err(AppError::InvalidArgument(
            "at least one service must be requested".to_string(),
        ));
    }

    let bath_count = services
        .iter()
        .filter(|s| s.tag == ServiceTag::Bath)
        .count() as i32;
    let groom_count = services.len() as i32 - bath_count;

    let deduction_weight = groom_count * GROOM_UNIT_WEIGHT + bath_count * BATH_UNIT_WEIGHT;

    let visit_kind = if bath_count == 0 {
        VisitKind::Groom
    } else if groom_count == 0 {
        VisitKind::Bath
    } else {
        VisitKind::Mixed
    };

    let reason = format!(
        "{} bath x {} + {} groom x {} = {} units",
        bath_count, BATH_UNIT_WEIGHT, groom_count, GROOM_UNIT_WEIGHT, deduction_weight
    );

    Ok(ServiceMixResult {
        visit_kind,
        deduction_weight,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn tagged(tag: ServiceTag) -> TaggedService {
        TaggedService {
            id: Uuid::new_v4(),
            tag,
        }
    }

    #[test]
    fn test_two_baths() {
        let result = classify(&[tagged(ServiceTag::Bath), tagged(ServiceTag::Bath)]).unwrap();
        assert_eq!(result.visit_kind, VisitKind::Bath);
        assert_eq!(result.deduction_weight, 2);
    }

    #[test]
    fn test_single_groom() {
        let result = classify(&[tagged(ServiceTag::Groom)]).unwrap();
        assert_eq!(result.visit_kind, VisitKind::Groom);
        assert_eq!(result.deduction_weight, 4);
    }

    #[test]
    fn test_mixed_visit() {
        let result = classify(&[tagged(ServiceTag::Bath), tagged(ServiceTag::Groom)]).unwrap();
        assert_eq!(result.visit_kind, VisitKind::Mixed);
        assert_eq!(result.deduction_weight, 5);
    }

    #[test]
    fn test_empty_request_rejected() {
        assert!(matches!(
            classify(&[]),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_reason_spells_out_breakdown() {
        let result = classify(&[
            tagged(ServiceTag::Bath),
            tagged(ServiceTag::Bath),
            tagged(ServiceTag::Groom),
        ])
        .unwrap();
        assert_eq!(result.deduction_weight, 6);
        assert_eq!(result.reason, "2 bath x 1 + 1 groom x 4 = 6 units");
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let services = vec![tagged(ServiceTag::Groom), tagged(ServiceTag::Bath)];
        let a = classify(&services).unwrap();
        let b = classify(&services).unwrap();
        assert_eq!(a.visit_kind, b.visit_kind);
        assert_eq!(a.deduction_weight, b.deduction_weight);
        assert_eq!(a.reason, b.reason);
    }
}
