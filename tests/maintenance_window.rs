// tests/maintenance_window.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use data_manager::errors::{DataManagerError, Result};
use data_manager::maintenance::{within_maintenance, ClusterMaintenance, MaintenanceDetails, MaintenanceMode};
use data_manager::report::Report;
use data_manager::services::{ConfigValueRef, IngressRef};
use data_manager_test_utils::fake_cluster::{ClusterWrite, InMemoryClusterControl};

fn ingress() -> IngressRef {
    IngressRef {
        namespace: "prod".to_string(),
        name: "web".to_string(),
    }
}

fn mode_value() -> ConfigValueRef {
    ConfigValueRef {
        namespace: "prod".to_string(),
        name: "app-config".to_string(),
        key: "MODE".to_string(),
    }
}

fn details() -> MaintenanceDetails {
    MaintenanceDetails {
        ingress: ingress(),
        ingress_class: "maintenance".to_string(),
        config_value_ref: mode_value(),
        config_value: "maintenance".to_string(),
    }
}

fn cluster() -> Arc<InMemoryClusterControl> {
    Arc::new(
        InMemoryClusterControl::new()
            .with_ingress(&ingress(), Some("nginx"))
            .with_config_value(&mode_value(), "live"),
    )
}

fn window(cluster: &Arc<InMemoryClusterControl>) -> ClusterMaintenance {
    ClusterMaintenance::new(cluster.clone(), details()).with_settle_delay(Duration::ZERO)
}

#[tokio::test]
async fn body_sees_maintenance_values_and_originals_come_back() {
    common::init_tracing();
    let cluster = cluster();
    let mut window = window(&cluster);
    let report = Report::root("test");

    let observer = cluster.clone();
    let seen = within_maintenance(&mut window, &report, async {
        Ok((observer.ingress_class(&ingress()), observer.config_value(&mode_value())))
    })
    .await
    .unwrap();

    assert_eq!(seen, (Some("maintenance".to_string()), Some("maintenance".to_string())));
    assert_eq!(cluster.ingress_class(&ingress()).as_deref(), Some("nginx"));
    assert_eq!(cluster.config_value(&mode_value()).as_deref(), Some("live"));
    assert!(!window.is_active());
    assert_eq!(
        cluster.writes()[..2],
        [
            ClusterWrite::ConfigValue {
                value: mode_value(),
                data: "maintenance".to_string()
            },
            ClusterWrite::IngressClass {
                ingress: ingress(),
                class: Some("maintenance".to_string())
            },
        ]
    );
}

#[tokio::test]
async fn failing_body_still_restores() {
    let cluster = cluster();
    let mut window = window(&cluster);
    let report = Report::root("test");

    let result: Result<()> = within_maintenance(&mut window, &report, async {
        Err(DataManagerError::IntegrityError("row count".to_string()))
    })
    .await;

    assert!(matches!(result, Err(DataManagerError::IntegrityError(msg)) if msg == "row count"));
    assert_eq!(cluster.ingress_class(&ingress()).as_deref(), Some("nginx"));
    assert_eq!(cluster.config_value(&mode_value()).as_deref(), Some("live"));
}

#[tokio::test]
async fn ingress_without_class_gets_it_removed_again() {
    let cluster = Arc::new(
        InMemoryClusterControl::new()
            .with_ingress(&ingress(), None)
            .with_config_value(&mode_value(), "live"),
    );
    let mut window = window(&cluster);

    within_maintenance(&mut window, &Report::root("test"), async { Ok(()) })
        .await
        .unwrap();

    assert_eq!(cluster.ingress_class(&ingress()), None);
    assert_eq!(
        cluster.writes().last(),
        Some(&ClusterWrite::IngressClass {
            ingress: ingress(),
            class: None
        })
    );
}

#[tokio::test]
async fn failed_switch_restores_and_skips_body() {
    let cluster = cluster();
    // The config write succeeds, the ingress write fails.
    cluster.fail_writes_from(1);
    let mut window = window(&cluster);

    let mut ran = false;
    let result = within_maintenance(&mut window, &Report::root("test"), async {
        ran = true;
        Ok(())
    })
    .await;

    assert!(matches!(result, Err(DataManagerError::ToolError(_))));
    assert!(!ran);
    assert!(!window.is_active());
    // switch (2 writes) then restore attempts both values.
    assert_eq!(cluster.writes().len(), 4);
}

#[tokio::test]
async fn body_error_wins_over_exit_error() {
    let cluster = cluster();
    let mut window = window(&cluster);
    let report = Report::root("test");

    let failing = cluster.clone();
    let result: Result<()> = within_maintenance(&mut window, &report, async move {
        failing.fail_writes_from(0);
        Err(DataManagerError::ToolError("body".to_string()))
    })
    .await;

    assert!(matches!(result, Err(DataManagerError::ToolError(msg)) if msg == "body"));
    assert!(window.is_active());
}

#[tokio::test]
async fn exit_error_surfaces_when_body_succeeds() {
    let cluster = cluster();
    let mut window = window(&cluster);

    let failing = cluster.clone();
    let result = within_maintenance(&mut window, &Report::root("test"), async move {
        failing.fail_writes_from(0);
        Ok(42)
    })
    .await;

    assert!(matches!(result, Err(DataManagerError::ToolError(_))));
    assert!(window.is_active());
    assert_eq!(cluster.config_value(&mode_value()).as_deref(), Some("maintenance"));

    cluster.heal();
    window.exit(&Report::root("test")).await.unwrap();
    assert!(!window.is_active());
    assert_eq!(cluster.config_value(&mode_value()).as_deref(), Some("live"));
    assert_eq!(cluster.ingress_class(&ingress()).as_deref(), Some("nginx"));

    // Leaving twice is harmless once the window is closed.
    window.exit(&Report::root("test")).await.unwrap();
}

#[tokio::test]
async fn entering_twice_is_rejected() {
    let cluster = cluster();
    let mut window = window(&cluster);
    let report = Report::root("test");

    window.enter(&report).await.unwrap();
    assert!(window.is_active());
    assert!(window.enter(&report).await.is_err());
    window.exit(&report).await.unwrap();
    assert_eq!(cluster.config_value(&mode_value()).as_deref(), Some("live"));
}
