mod common;

use chrono::Duration;
use std::collections::BTreeMap;

use ambulance_dispatch::clients::ml_client::ModelSuggestion;
use ambulance_dispatch::models::crew::{CrewFilter, CrewRole, CrewStatus, RoleQuotas};
use ambulance_dispatch::models::dispatch::{DispatchFilter, DispatchOutcomeKind, DispatchStatus};
use ambulance_dispatch::models::event::EventKind;
use ambulance_dispatch::models::geo::GeoPoint;
use ambulance_dispatch::models::vehicle::{VehicleCategory, VehicleStatus};
use ambulance_dispatch::repositories::ResourceDirectory;
use ambulance_dispatch::services::assignment_service::{CrewReservation, DispatchOutcome, DispatchRequest};
use ambulance_dispatch::services::geo_calculator::GeoCalculator;
use ambulance_dispatch::utils::errors::AppError;

use ambulance_dispatch::utils::clock::Clock;

use common::{Harness, StubModel, ORIGIN};

#[tokio::test]
async fn test_create_dispatch_assigns_nearest_vehicle_and_crew() {
    let h = Harness::new();
    let near = h.vehicle_at("1001-LPZ", VehicleCategory::Basic, -16.501, -68.15).await;
    let _far = h.vehicle_at("1002-LPZ", VehicleCategory::Basic, -16.55, -68.15).await;
    let driver = h.crew("Juan", CrewRole::Driver, 5).await;
    let paramedic = h.crew("Ana", CrewRole::Paramedic, 4).await;

    let outcome = h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap();
    let DispatchOutcome::Created { dispatch, vehicle, crew } = outcome else {
        panic!("expected a created dispatch");
    };

    assert_eq!(vehicle.id, near.id);
    assert_eq!(dispatch.vehicle_id, Some(near.id));
    assert_eq!(dispatch.status, DispatchStatus::Assigned);
    assert!(dispatch.assigned_at.is_some());
    // 7.2 minutos del modelo, redondeado hacia arriba
    assert_eq!(dispatch.estimated_minutes, Some(8));
    assert_eq!(crew.len(), 2);
    assert_eq!(crew.iter().filter(|c| c.responsible).count(), 1);

    let stored = h.directory.get_vehicle(near.id).await.unwrap().unwrap();
    assert_eq!(stored.status, VehicleStatus::InService);
    for id in [driver.id, paramedic.id] {
        let member = h.directory.get_crew_member(id).await.unwrap().unwrap();
        assert_eq!(member.status, CrewStatus::InService);
    }

    let persisted = h.directory.get_dispatch(dispatch.id).await.unwrap().unwrap();
    assert_eq!(persisted.estimated_minutes, Some(8));

    let outbox = h.directory.outbox().await;
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].event_type, EventKind::DispatchCreated.as_str());
}

#[tokio::test]
async fn test_no_vehicle_within_radius_leaves_store_untouched() {
    let h = Harness::new();
    // ~55 km al sur
    let far = h.vehicle_at("1001-LPZ", VehicleCategory::Basic, -17.0, -68.15).await;
    h.crew("Juan", CrewRole::Driver, 5).await;
    h.crew("Ana", CrewRole::Paramedic, 4).await;

    let outcome = h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::NoVehicle));

    let vehicle = h.directory.get_vehicle(far.id).await.unwrap().unwrap();
    assert_eq!(vehicle.status, VehicleStatus::Available);
    let dispatches = h.directory.list_dispatches(&DispatchFilter::default()).await.unwrap();
    assert!(dispatches.is_empty());
    assert!(h.directory.outbox().await.is_empty());
}

#[tokio::test]
async fn test_larger_radius_reaches_distant_vehicle() {
    let h = Harness::new();
    h.vehicle_at("1001-LPZ", VehicleCategory::Basic, -17.0, -68.15).await;
    h.crew("Juan", CrewRole::Driver, 5).await;
    h.crew("Ana", CrewRole::Paramedic, 4).await;

    let mut request = DispatchRequest::at(ORIGIN);
    request.max_radius_km = Some(80.0);
    let outcome = h.engine.create_dispatch(request).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Created { .. }));
}

#[tokio::test]
async fn test_missing_role_rolls_back_vehicle_and_partial_crew() {
    let h = Harness::new();
    let vehicle = h.vehicle_at("1001-LPZ", VehicleCategory::Basic, -16.501, -68.15).await;
    let driver = h.crew("Juan", CrewRole::Driver, 5).await;

    let outcome = h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap();
    match outcome {
        DispatchOutcome::NoCrew { role, required, available } => {
            assert_eq!(role, CrewRole::Paramedic);
            assert_eq!(required, 1);
            assert_eq!(available, 0);
        }
        other => panic!("expected NoCrew, got {:?}", other),
    }

    let vehicle = h.directory.get_vehicle(vehicle.id).await.unwrap().unwrap();
    assert_eq!(vehicle.status, VehicleStatus::Available);
    let driver = h.directory.get_crew_member(driver.id).await.unwrap().unwrap();
    assert_eq!(driver.status, CrewStatus::Available);
    assert!(h.directory.all_links().await.is_empty());
    assert!(h
        .directory
        .list_dispatches(&DispatchFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_required_category_skips_closer_vehicles() {
    let h = Harness::new();
    h.vehicle_at("1001-LPZ", VehicleCategory::Basic, -16.501, -68.15).await;
    let icu = h
        .vehicle_at("1002-LPZ", VehicleCategory::CriticalCare, -16.53, -68.15)
        .await;
    h.crew("Juan", CrewRole::Driver, 5).await;
    h.crew("Ana", CrewRole::Paramedic, 4).await;

    let mut request = DispatchRequest::at(ORIGIN);
    request.required_category = Some(VehicleCategory::CriticalCare);
    let DispatchOutcome::Created { vehicle, .. } = h.engine.create_dispatch(request).await.unwrap() else {
        panic!("expected a created dispatch");
    };
    assert_eq!(vehicle.id, icu.id);
}

#[tokio::test]
async fn test_most_experienced_crew_is_reserved_first() {
    let h = Harness::new();
    h.vehicle_at("1001-LPZ", VehicleCategory::Basic, -16.501, -68.15).await;
    let junior = h.crew("Rosa", CrewRole::Driver, 2).await;
    let senior = h.crew("Carlos", CrewRole::Driver, 11).await;
    let physician = h.crew("Patricia", CrewRole::Physician, 15).await;

    let mut request = DispatchRequest::at(ORIGIN);
    request.role_quotas = Some(RoleQuotas::new([(CrewRole::Driver, 1), (CrewRole::Physician, 1)]));
    let DispatchOutcome::Created { crew, .. } = h.engine.create_dispatch(request).await.unwrap() else {
        panic!("expected a created dispatch");
    };

    let ids: Vec<i64> = crew.iter().map(|c| c.member.id).collect();
    assert!(ids.contains(&senior.id));
    assert!(ids.contains(&physician.id));
    assert!(!ids.contains(&junior.id));

    let available = h
        .fleet
        .list_crew(&CrewFilter {
            status: Some(CrewStatus::Available),
            role: None,
        })
        .await
        .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].id, junior.id);
}

#[tokio::test]
async fn test_model_outage_falls_back_to_formula_estimate() {
    let h = Harness::with_model(StubModel::failing());
    h.vehicle_at("1001-LPZ", VehicleCategory::Basic, -16.55, -68.15).await;
    h.crew("Juan", CrewRole::Driver, 5).await;
    h.crew("Ana", CrewRole::Paramedic, 4).await;

    let DispatchOutcome::Created { dispatch, .. } =
        h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap()
    else {
        panic!("expected a created dispatch");
    };

    // 11:00 local usa 40 km/h, la misma velocidad de la estimación inicial
    let distance = dispatch.distance_km.unwrap();
    assert_eq!(
        dispatch.estimated_minutes,
        Some(GeoCalculator::estimate_travel_time(distance, 40.0))
    );
}

#[tokio::test]
async fn test_invalid_request_is_rejected_before_any_change() {
    let h = Harness::new();
    h.seed_minimal().await;

    let mut request = DispatchRequest::at(ORIGIN);
    request.traffic_factor = Some(1.5);
    let err = h.engine.create_dispatch(request).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidField { ref field, .. } if field == "traffic_factor"));

    let err = h
        .engine
        .create_dispatch(DispatchRequest::at(GeoPoint::new(95.0, 0.0)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidField { .. }));
    assert!(h.directory.all_links().await.is_empty());
}

#[tokio::test]
async fn test_failed_commit_keeps_resources_available() {
    let h = Harness::new();
    let (vehicle, driver, _) = h.seed_minimal().await;
    h.directory.set_fail_commits(true);

    assert!(h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.is_err());

    h.directory.set_fail_commits(false);
    let vehicle = h.directory.get_vehicle(vehicle.id).await.unwrap().unwrap();
    assert_eq!(vehicle.status, VehicleStatus::Available);
    let driver = h.directory.get_crew_member(driver.id).await.unwrap().unwrap();
    assert_eq!(driver.status, CrewStatus::Available);
}

#[tokio::test]
async fn test_conclude_releases_resources_and_is_idempotent() {
    let h = Harness::new();
    let (vehicle, driver, paramedic) = h.seed_minimal().await;
    let DispatchOutcome::Created { dispatch, .. } =
        h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap()
    else {
        panic!("expected a created dispatch");
    };

    h.clock.advance(Duration::minutes(20));
    let concluded = h
        .engine
        .conclude_dispatch(dispatch.id, DispatchOutcomeKind::Completed)
        .await
        .unwrap();
    assert_eq!(concluded.status, DispatchStatus::Completed);
    assert_eq!(concluded.actual_minutes, Some(20));
    let concluded_at = concluded.concluded_at.unwrap();

    let vehicle = h.directory.get_vehicle(vehicle.id).await.unwrap().unwrap();
    assert_eq!(vehicle.status, VehicleStatus::Available);
    for id in [driver.id, paramedic.id] {
        let member = h.directory.get_crew_member(id).await.unwrap().unwrap();
        assert_eq!(member.status, CrewStatus::Available);
    }
    assert!(h.directory.all_links().await.is_empty());

    h.clock.advance(Duration::minutes(5));
    let again = h
        .engine
        .conclude_dispatch(dispatch.id, DispatchOutcomeKind::Completed)
        .await
        .unwrap();
    assert_eq!(again.concluded_at, Some(concluded_at));

    let err = h
        .engine
        .conclude_dispatch(dispatch.id, DispatchOutcomeKind::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: DispatchStatus::Completed,
            to: DispatchStatus::Cancelled
        }
    ));
}

#[tokio::test]
async fn test_reserve_crew_for_active_dispatch() {
    let h = Harness::new();
    h.seed_minimal().await;
    let DispatchOutcome::Created { dispatch, .. } =
        h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap()
    else {
        panic!("expected a created dispatch");
    };
    let nurse = h.crew("Elena", CrewRole::Nurse, 10).await;

    let reservation = h
        .engine
        .reserve_crew(dispatch.id, Some(RoleQuotas::new([(CrewRole::Nurse, 1)])))
        .await
        .unwrap();
    let CrewReservation::Reserved(reserved) = reservation else {
        panic!("expected a reservation");
    };
    assert_eq!(reserved.len(), 1);
    assert_eq!(reserved[0].member.id, nurse.id);
    // ya existía un responsable
    assert!(!reserved[0].responsible);

    let insufficient = h
        .engine
        .reserve_crew(dispatch.id, Some(RoleQuotas::new([(CrewRole::Physician, 2)])))
        .await
        .unwrap();
    assert_eq!(
        insufficient,
        CrewReservation::Insufficient {
            role: CrewRole::Physician,
            required: 2,
            available: 0
        }
    );

    let err = h.engine.reserve_crew(9_999, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_release_crew_only_after_conclusion() {
    let h = Harness::new();
    h.seed_minimal().await;
    let DispatchOutcome::Created { dispatch, .. } =
        h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap()
    else {
        panic!("expected a created dispatch");
    };

    // un despacho activo conserva su personal
    let err = h.engine.release_crew(dispatch.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let in_service = h
        .fleet
        .list_crew(&CrewFilter {
            status: Some(CrewStatus::InService),
            role: None,
        })
        .await
        .unwrap();
    assert_eq!(in_service.len(), 2);
    assert_eq!(h.directory.all_links().await.len(), 2);

    h.engine
        .conclude_dispatch(dispatch.id, DispatchOutcomeKind::Cancelled)
        .await
        .unwrap();

    let err = h.engine.reserve_crew(dispatch.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(h.directory.all_links().await.is_empty());

    assert_eq!(h.engine.release_crew(dispatch.id).await.unwrap(), 0);
    let members = h.fleet.list_crew(&CrewFilter::default()).await.unwrap();
    assert!(members.iter().all(|m| m.status == CrewStatus::Available));

    let err = h.engine.release_crew(9_999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_empty_crew_quotas_are_rejected() {
    let h = Harness::new();
    let (vehicle, _, _) = h.seed_minimal().await;

    let mut request = DispatchRequest::at(ORIGIN);
    request.role_quotas = Some(RoleQuotas(BTreeMap::new()));
    let err = h.engine.create_dispatch(request).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidField { ref field, .. } if field == "crew"));

    let vehicle = h.directory.get_vehicle(vehicle.id).await.unwrap().unwrap();
    assert_eq!(vehicle.status, VehicleStatus::Available);
    assert!(h
        .directory
        .list_dispatches(&DispatchFilter::default())
        .await
        .unwrap()
        .is_empty());
    assert!(h.directory.outbox().await.is_empty());

    let DispatchOutcome::Created { dispatch, .. } =
        h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap()
    else {
        panic!("expected a created dispatch");
    };
    let err = h
        .engine
        .reserve_crew(dispatch.id, Some(RoleQuotas::new([(CrewRole::Nurse, 0)])))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidField { ref field, .. } if field == "crew"));
    assert_eq!(h.directory.all_links().await.len(), 2);
}

#[tokio::test]
async fn test_short_role_reserves_nobody() {
    let h = Harness::new();
    h.seed_minimal().await;
    let DispatchOutcome::Created { dispatch, .. } =
        h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap()
    else {
        panic!("expected a created dispatch");
    };
    let driver = h.crew("Pedro", CrewRole::Driver, 7).await;
    let paramedic = h.crew("Luis", CrewRole::Paramedic, 3).await;

    let reservation = h
        .engine
        .reserve_crew(
            dispatch.id,
            Some(RoleQuotas::new([(CrewRole::Driver, 1), (CrewRole::Paramedic, 2)])),
        )
        .await
        .unwrap();
    assert_eq!(
        reservation,
        CrewReservation::Insufficient {
            role: CrewRole::Paramedic,
            required: 2,
            available: 1
        }
    );

    for id in [driver.id, paramedic.id] {
        let member = h.directory.get_crew_member(id).await.unwrap().unwrap();
        assert_eq!(member.status, CrewStatus::Available);
    }
    assert_eq!(h.directory.all_links().await.len(), 2);
}

#[tokio::test]
async fn test_assign_pending_dispatch() {
    let h = Harness::new();
    let (vehicle, driver, paramedic) = h.seed_minimal().await;
    let pending = h.pending_dispatch(ORIGIN).await;

    // sin ambulancia en el radio el despacho sigue pendiente
    let outcome = h
        .engine
        .assign_pending(pending.id, None, Some(VehicleCategory::CriticalCare), None)
        .await
        .unwrap();
    assert!(matches!(outcome, DispatchOutcome::NoVehicle));

    let outcome = h
        .engine
        .assign_pending(pending.id, Some(RoleQuotas::new([(CrewRole::Physician, 1)])), None, None)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        DispatchOutcome::NoCrew {
            role: CrewRole::Physician,
            ..
        }
    ));
    let stored = h.directory.get_dispatch(pending.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DispatchStatus::Pending);
    assert_eq!(stored.vehicle_id, None);
    let idle = h.directory.get_vehicle(vehicle.id).await.unwrap().unwrap();
    assert_eq!(idle.status, VehicleStatus::Available);

    h.clock.advance(Duration::minutes(2));
    let DispatchOutcome::Created { dispatch, vehicle: assigned, crew } =
        h.engine.assign_pending(pending.id, None, None, None).await.unwrap()
    else {
        panic!("expected the pending dispatch to be assigned");
    };
    assert_eq!(assigned.id, vehicle.id);
    assert_eq!(assigned.status, VehicleStatus::InService);
    assert_eq!(crew.len(), 2);
    assert_eq!(dispatch.status, DispatchStatus::Assigned);
    assert_eq!(dispatch.assigned_at, Some(h.clock.now()));
    assert_eq!(dispatch.request_ref, Some(77));

    let stored = h.directory.get_dispatch(pending.id).await.unwrap().unwrap();
    assert_eq!(stored.vehicle_id, Some(vehicle.id));
    assert!(stored.distance_km.is_some());
    assert_eq!(stored.estimated_minutes, Some(8));
    for id in [driver.id, paramedic.id] {
        let member = h.directory.get_crew_member(id).await.unwrap().unwrap();
        assert_eq!(member.status, CrewStatus::InService);
    }

    let outbox = h.directory.outbox().await;
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].event_type, EventKind::DispatchStatusChanged.as_str());

    // el ciclo de vida sigue desde `assigned`
    h.lifecycle
        .transition(pending.id, DispatchStatus::EnRoute)
        .await
        .unwrap();

    let err = h
        .engine
        .assign_pending(pending.id, None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: DispatchStatus::EnRoute,
            to: DispatchStatus::Assigned
        }
    ));
}

#[tokio::test]
async fn test_la_paz_intermediate_unit_within_two_kilometres() {
    let h = Harness::new();
    let unit = h
        .vehicle_at("2001-LPZ", VehicleCategory::Intermediate, -16.51, -68.14)
        .await;

    let matched = h
        .engine
        .find_nearest_available_vehicle(GeoPoint::new(-16.5, -68.15), None, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(matched.vehicle.id, unit.id);
    assert!(
        (1.3..=1.6).contains(&matched.distance_km),
        "distance was {}",
        matched.distance_km
    );

    let minutes = GeoCalculator::estimate_travel_time(matched.distance_km, 40.0);
    assert_eq!(minutes, (matched.distance_km / 40.0 * 60.0).ceil() as i32);
    assert_eq!(minutes, 3);
}

#[tokio::test]
async fn test_candidates_are_ranked_by_distance() {
    let h = Harness::new();
    let _farthest = h.vehicle_at("1003-LPZ", VehicleCategory::Basic, -16.58, -68.15).await;
    let a = h.vehicle_at("1001-LPZ", VehicleCategory::Basic, -16.501, -68.15).await;
    let b = h.vehicle_at("1002-LPZ", VehicleCategory::Advanced, -16.52, -68.15).await;

    let ranked = h.engine.list_vehicles_by_distance(ORIGIN, None, Some(2)).await.unwrap();
    let ids: Vec<i64> = ranked.iter().map(|m| m.vehicle.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
    assert!(ranked[0].distance_km < ranked[1].distance_km);
    assert!(ranked.iter().all(|m| m.estimated_minutes.is_some()));

    let nearest = h
        .engine
        .find_nearest_available_vehicle(ORIGIN, Some(VehicleCategory::Basic), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(nearest.vehicle.id, a.id);

    let none = h
        .engine
        .find_nearest_available_vehicle(ORIGIN, None, Some(0.05))
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_statistics_window_and_completion_rate() {
    let h = Harness::new();
    h.vehicle_at("1001-LPZ", VehicleCategory::Basic, -16.501, -68.15).await;
    h.vehicle_at("1002-LPZ", VehicleCategory::Basic, -16.502, -68.15).await;
    for (name, role) in [
        ("Juan", CrewRole::Driver),
        ("Carlos", CrewRole::Driver),
        ("Ana", CrewRole::Paramedic),
        ("Luis", CrewRole::Paramedic),
    ] {
        h.crew(name, role, 3).await;
    }

    let mut ids = Vec::new();
    for _ in 0..2 {
        if let DispatchOutcome::Created { dispatch, .. } =
            h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap()
        {
            ids.push(dispatch.id);
        }
    }
    assert_eq!(ids.len(), 2);
    h.engine
        .conclude_dispatch(ids[0], DispatchOutcomeKind::Completed)
        .await
        .unwrap();

    let stats = h.engine.dispatch_statistics(24).await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completion_rate, 50.0);
    assert_eq!(stats.by_status.get("completed"), Some(&1));
    assert_eq!(stats.by_status.get("assigned"), Some(&1));

    // fuera de la ventana
    h.clock.advance(Duration::hours(30));
    let stats = h.engine.dispatch_statistics(24).await.unwrap();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.completion_rate, 0.0);

    assert!(h.engine.dispatch_statistics(0).await.is_err());
}

#[tokio::test]
async fn test_availability_snapshot_counts_resources() {
    let h = Harness::new();
    h.seed_minimal().await;
    h.vehicle_at("1002-LPZ", VehicleCategory::Advanced, -16.51, -68.15).await;
    h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap();

    let snapshot = h.engine.availability_snapshot().await.unwrap();
    assert_eq!(snapshot.vehicles.total, 2);
    assert_eq!(snapshot.vehicles.available(), 1);
    assert_eq!(snapshot.vehicles.in_service(), 1);
    assert_eq!(snapshot.crew.in_service(), 2);
    assert_eq!(snapshot.active_dispatches, 1);
}

#[tokio::test]
async fn test_suggestion_never_reassigns() {
    let h = Harness::new();
    let (current, _, _) = h.seed_minimal().await;
    let other = h.vehicle_at("3001-LPZ", VehicleCategory::Advanced, -16.52, -68.15).await;
    let DispatchOutcome::Created { dispatch, .. } =
        h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap()
    else {
        panic!("expected a created dispatch");
    };

    // sin optimizador: la asignación actual
    let suggestion = h.engine.suggest_vehicle(dispatch.id).await.unwrap();
    assert_eq!(suggestion.source, "current");
    assert_eq!(suggestion.suggested_vehicle_id, Some(current.id));
    assert_eq!(suggestion.confidence, 0.5);
    assert_eq!(suggestion.estimated_minutes, dispatch.estimated_minutes);

    h.model.suggest(Some(ModelSuggestion {
        vehicle_id: Some(other.id),
        confidence: 0.87,
        estimated_minutes: Some(5),
        distance_km: Some(2.2),
        reason: Some("menor tiempo estimado".to_string()),
    }));
    let suggestion = h.engine.suggest_vehicle(dispatch.id).await.unwrap();
    assert_eq!(suggestion.source, "model");
    assert_eq!(suggestion.current_vehicle_id, Some(current.id));
    assert_eq!(suggestion.suggested_vehicle_id, Some(other.id));
    assert_eq!(suggestion.estimated_minutes, Some(5));

    let stored = h.directory.get_dispatch(dispatch.id).await.unwrap().unwrap();
    assert_eq!(stored.vehicle_id, Some(current.id));
    assert_eq!(stored.estimated_minutes, dispatch.estimated_minutes);
    let other = h.directory.get_vehicle(other.id).await.unwrap().unwrap();
    assert_eq!(other.status, VehicleStatus::Available);
    assert_eq!(h.directory.outbox().await.len(), 1);

    let err = h.engine.suggest_vehicle(9_999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
