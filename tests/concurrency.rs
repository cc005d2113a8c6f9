mod common;

use std::collections::HashSet;

use ambulance_dispatch::models::crew::CrewRole;
use ambulance_dispatch::models::vehicle::{VehicleCategory, VehicleFilter, VehicleStatus};
use ambulance_dispatch::repositories::ResourceDirectory;
use ambulance_dispatch::services::assignment_service::{DispatchOutcome, DispatchRequest};

use common::{Harness, ORIGIN};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_share_a_vehicle() {
    let h = Harness::new();
    h.vehicle_at("1001-LPZ", VehicleCategory::Basic, -16.501, -68.15).await;
    h.vehicle_at("1002-LPZ", VehicleCategory::Advanced, -16.502, -68.151).await;
    for i in 0..6 {
        h.crew(&format!("Conductor{}", i), CrewRole::Driver, i).await;
        h.crew(&format!("Paramedico{}", i), CrewRole::Paramedic, i).await;
    }

    let mut handles = Vec::new();
    for _ in 0..6 {
        let engine = h.engine.clone();
        handles.push(tokio::spawn(async move {
            engine.create_dispatch(DispatchRequest::at(ORIGIN)).await
        }));
    }

    let mut created = Vec::new();
    let mut no_vehicle = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            DispatchOutcome::Created { dispatch, .. } => created.push(dispatch),
            DispatchOutcome::NoVehicle => no_vehicle += 1,
            DispatchOutcome::NoCrew { role, .. } => panic!("unexpected crew shortage for {:?}", role),
        }
    }
    assert_eq!(created.len(), 2);
    assert_eq!(no_vehicle, 4);

    let vehicles: HashSet<i64> = created.iter().filter_map(|d| d.vehicle_id).collect();
    assert_eq!(vehicles.len(), 2);

    let in_service = h
        .directory
        .list_vehicles(&VehicleFilter {
            status: Some(VehicleStatus::InService),
            ..VehicleFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(in_service.len(), 2);

    let links = h.directory.all_links().await;
    assert_eq!(links.len(), 4);
    let members: HashSet<i64> = links.iter().map(|l| l.crew_member_id).collect();
    assert_eq!(members.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_share_crew() {
    let h = Harness::new();
    for i in 0..4 {
        h.vehicle_at(&format!("200{}-LPZ", i), VehicleCategory::Basic, -16.501, -68.15 - i as f64 * 0.001)
            .await;
    }
    // personal para un solo despacho
    h.crew("Juan", CrewRole::Driver, 5).await;
    h.crew("Ana", CrewRole::Paramedic, 4).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = h.engine.clone();
        handles.push(tokio::spawn(async move {
            engine.create_dispatch(DispatchRequest::at(ORIGIN)).await
        }));
    }

    let mut created = 0;
    let mut no_crew = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            DispatchOutcome::Created { .. } => created += 1,
            DispatchOutcome::NoCrew { .. } => no_crew += 1,
            DispatchOutcome::NoVehicle => panic!("vehicles should not run out"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(no_crew, 3);

    // los intentos sin personal no dejan vehículos reservados
    let in_service = h
        .directory
        .list_vehicles(&VehicleFilter {
            status: Some(VehicleStatus::InService),
            ..VehicleFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(in_service.len(), 1);
}
