mod common;

use chrono::Duration;

use ambulance_dispatch::models::crew::{CrewRole, CrewStatus};
use ambulance_dispatch::models::dispatch::{Dispatch, DispatchFilter, DispatchStatus, NewTrackingSample};
use ambulance_dispatch::models::event::EventKind;
use ambulance_dispatch::models::geo::GeoPoint;
use ambulance_dispatch::models::vehicle::{VehicleCategory, VehicleStatus};
use ambulance_dispatch::repositories::ResourceDirectory;
use ambulance_dispatch::services::assignment_service::{DispatchOutcome, DispatchRequest};
use ambulance_dispatch::services::dispatch_lifecycle::DispatchFeedback;
use ambulance_dispatch::utils::clock::Clock;
use ambulance_dispatch::utils::errors::AppError;

use common::{Harness, ORIGIN};

async fn created_dispatch(h: &Harness) -> Dispatch {
    match h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap() {
        DispatchOutcome::Created { dispatch, .. } => dispatch,
        other => panic!("expected a created dispatch, got {:?}", other),
    }
}

fn sample(lat: f64, lng: f64, h: &Harness) -> NewTrackingSample {
    NewTrackingSample {
        position: GeoPoint::new(lat, lng),
        speed_kmh: Some(42.0),
        altitude_m: Some(3640.0),
        accuracy_m: Some(5.0),
        recorded_at: h.clock.now(),
    }
}

#[tokio::test]
async fn test_full_lifecycle_records_timestamps_and_duration() {
    let h = Harness::new();
    let (vehicle, driver, _) = h.seed_minimal().await;
    let dispatch = created_dispatch(&h).await;
    let assigned_at = dispatch.assigned_at.unwrap();

    h.clock.advance(Duration::minutes(2));
    let en_route = h.lifecycle.transition(dispatch.id, DispatchStatus::EnRoute).await.unwrap();
    assert_eq!(en_route.status, DispatchStatus::EnRoute);
    assert_eq!(en_route.assigned_at, Some(assigned_at));

    h.clock.advance(Duration::minutes(10));
    let on_scene = h.lifecycle.transition(dispatch.id, DispatchStatus::OnScene).await.unwrap();
    assert_eq!(on_scene.arrived_at, Some(assigned_at + Duration::minutes(12)));

    h.clock.advance(Duration::minutes(15));
    h.lifecycle
        .transition(dispatch.id, DispatchStatus::Transporting)
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(20));
    let completed = h.lifecycle.transition(dispatch.id, DispatchStatus::Completed).await.unwrap();
    assert_eq!(completed.status, DispatchStatus::Completed);
    // asignación -> llegada
    assert_eq!(completed.actual_minutes, Some(12));
    assert!(completed.concluded_at.is_some());

    let vehicle = h.directory.get_vehicle(vehicle.id).await.unwrap().unwrap();
    assert_eq!(vehicle.status, VehicleStatus::Available);
    let driver = h.directory.get_crew_member(driver.id).await.unwrap().unwrap();
    assert_eq!(driver.status, CrewStatus::Available);

    let status_events = h
        .directory
        .outbox()
        .await
        .into_iter()
        .filter(|e| e.event_type == EventKind::DispatchStatusChanged.as_str())
        .count();
    assert_eq!(status_events, 4);
}

#[tokio::test]
async fn test_transitions_outside_the_table_are_rejected() {
    let h = Harness::new();
    h.seed_minimal().await;
    let dispatch = created_dispatch(&h).await;

    let err = h
        .lifecycle
        .transition(dispatch.id, DispatchStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: DispatchStatus::Assigned,
            to: DispatchStatus::Completed
        }
    ));

    // mismo estado
    let err = h
        .lifecycle
        .transition(dispatch.id, DispatchStatus::Assigned)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    h.lifecycle.transition(dispatch.id, DispatchStatus::EnRoute).await.unwrap();
    let err = h
        .lifecycle
        .transition(dispatch.id, DispatchStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    let stored = h.directory.get_dispatch(dispatch.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DispatchStatus::EnRoute);

    let err = h
        .lifecycle
        .transition(404, DispatchStatus::EnRoute)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_cancel_from_assigned_frees_resources() {
    let h = Harness::new();
    let (vehicle, _, paramedic) = h.seed_minimal().await;
    let dispatch = created_dispatch(&h).await;

    let cancelled = h
        .lifecycle
        .transition(dispatch.id, DispatchStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status, DispatchStatus::Cancelled);

    let vehicle = h.directory.get_vehicle(vehicle.id).await.unwrap().unwrap();
    assert_eq!(vehicle.status, VehicleStatus::Available);
    let paramedic = h.directory.get_crew_member(paramedic.id).await.unwrap().unwrap();
    assert_eq!(paramedic.status, CrewStatus::Available);

    let err = h
        .lifecycle
        .transition(dispatch.id, DispatchStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_tracking_moves_vehicle_and_is_closed_after_conclusion() {
    let h = Harness::new();
    let (vehicle, _, _) = h.seed_minimal().await;
    let dispatch = created_dispatch(&h).await;

    let stored = h
        .lifecycle
        .record_tracking(dispatch.id, sample(-16.4995, -68.1490, &h))
        .await
        .unwrap();
    assert_eq!(stored.dispatch_id, dispatch.id);

    let moved = h.directory.get_vehicle(vehicle.id).await.unwrap().unwrap();
    assert_eq!(moved.latitude, Some(-16.4995));
    assert_eq!(moved.longitude, Some(-68.1490));

    let details = h.lifecycle.details(dispatch.id).await.unwrap();
    assert_eq!(details.tracking.len(), 1);
    assert_eq!(details.crew.len(), 2);

    let mut bad = sample(-16.4995, -68.1490, &h);
    bad.speed_kmh = Some(-3.0);
    let err = h.lifecycle.record_tracking(dispatch.id, bad).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidField { .. }));

    h.lifecycle
        .transition(dispatch.id, DispatchStatus::Cancelled)
        .await
        .unwrap();
    let err = h
        .lifecycle
        .record_tracking(dispatch.id, sample(-16.49, -68.14, &h))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_feedback_only_after_conclusion() {
    let h = Harness::new();
    h.seed_minimal().await;
    let dispatch = created_dispatch(&h).await;
    let feedback = DispatchFeedback {
        rating: 5,
        comment: Some("Llegada rápida".to_string()),
        patient_outcome: Some("estable".to_string()),
    };

    let err = h
        .lifecycle
        .add_feedback(dispatch.id, feedback.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    h.lifecycle
        .transition(dispatch.id, DispatchStatus::Cancelled)
        .await
        .unwrap();
    let updated = h.lifecycle.add_feedback(dispatch.id, feedback).await.unwrap();
    let supplementary = updated.supplementary.unwrap();
    let stored = &supplementary["feedback"];
    assert_eq!(stored["rating"], 5);
    assert_eq!(stored["patient_outcome"], "estable");

    let err = h
        .lifecycle
        .add_feedback(
            dispatch.id,
            DispatchFeedback {
                rating: 0,
                comment: None,
                patient_outcome: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidField { .. }));
}

#[tokio::test]
async fn test_list_filters_active_dispatches() {
    let h = Harness::new();
    h.seed_minimal().await;
    let dispatch = created_dispatch(&h).await;

    let active = h
        .lifecycle
        .list(&DispatchFilter {
            active_only: true,
            ..DispatchFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(active.len(), 1);

    h.lifecycle
        .transition(dispatch.id, DispatchStatus::Cancelled)
        .await
        .unwrap();
    let active = h
        .lifecycle
        .list(&DispatchFilter {
            active_only: true,
            ..DispatchFilter::default()
        })
        .await
        .unwrap();
    assert!(active.is_empty());
}

#[tokio::test]
async fn test_vehicle_status_override_respects_active_dispatch() {
    let h = Harness::new();
    let (vehicle, _, _) = h.seed_minimal().await;
    let spare = h.vehicle_at("1002-LPZ", VehicleCategory::Basic, -16.51, -68.15).await;

    let err = h
        .fleet
        .set_vehicle_status(spare.id, VehicleStatus::InService)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let maintained = h
        .fleet
        .set_vehicle_status(spare.id, VehicleStatus::Maintenance)
        .await
        .unwrap();
    assert_eq!(maintained.status, VehicleStatus::Maintenance);

    created_dispatch(&h).await;
    let err = h
        .fleet
        .set_vehicle_status(vehicle.id, VehicleStatus::Available)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let located = h
        .fleet
        .update_vehicle_location(spare.id, GeoPoint::new(-16.52, -68.16))
        .await
        .unwrap();
    assert_eq!(located.latitude, Some(-16.52));
    let err = h
        .fleet
        .update_vehicle_location(spare.id, GeoPoint::new(-16.52, -190.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidField { .. }));
}

#[tokio::test]
async fn test_attach_and_detach_keep_staffing_invariant() {
    let h = Harness::new();
    let (_, driver, paramedic) = h.seed_minimal().await;
    let dispatch = created_dispatch(&h).await;
    let nurse = h.crew("Elena", CrewRole::Nurse, 10).await;

    let link = h
        .fleet
        .attach_crew(dispatch.id, nurse.id, None, false)
        .await
        .unwrap();
    assert_eq!(link.role, CrewRole::Nurse);
    assert!(!link.responsible);
    let nurse_now = h.directory.get_crew_member(nurse.id).await.unwrap().unwrap();
    assert_eq!(nurse_now.status, CrewStatus::InService);

    // ya vinculado y en servicio
    let err = h
        .fleet
        .attach_crew(dispatch.id, nurse.id, None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    h.fleet.detach_crew(dispatch.id, nurse.id).await.unwrap();
    h.fleet.detach_crew(dispatch.id, paramedic.id).await.unwrap();
    let err = h.fleet.detach_crew(dispatch.id, driver.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = h.fleet.detach_crew(dispatch.id, nurse.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let paramedic = h.directory.get_crew_member(paramedic.id).await.unwrap().unwrap();
    assert_eq!(paramedic.status, CrewStatus::Available);
}

#[tokio::test]
async fn test_crew_status_override_and_event() {
    let h = Harness::new();
    let (_, driver, _) = h.seed_minimal().await;
    let resting = h.crew("Rosa", CrewRole::Driver, 1).await;

    let updated = h
        .fleet
        .set_crew_status(resting.id, CrewStatus::Resting)
        .await
        .unwrap();
    assert_eq!(updated.status, CrewStatus::Resting);
    let events = h.directory.outbox().await;
    assert!(events
        .iter()
        .any(|e| e.event_type == EventKind::CrewStatusChanged.as_str()));

    let err = h
        .fleet
        .set_crew_status(resting.id, CrewStatus::InService)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    created_dispatch(&h).await;
    let err = h
        .fleet
        .set_crew_status(driver.id, CrewStatus::OnLeave)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}
