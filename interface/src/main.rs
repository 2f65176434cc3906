mod publisher;

use std::sync::Arc;
use std::time::Duration;

use kinematics::{Pose, RobotModel};
use kinematics_service::{
    GetPositionFkRequest, Header, KinematicsService, PoseStamped, PositionIkRequest,
    ServiceConfig,
};
use scene::{PlanningScene, PlanningSceneMonitor, Shape, WorldObject};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::publisher::StatePublisher;

const ROBOT_DESCRIPTION: &str = include_str!("../robots/demo_arm.toml");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServiceConfig::load(&path)?,
        None => ServiceConfig::default(),
    };
    log::info!("Initializing kinematics service...");

    let model = Arc::new(RobotModel::from_toml_str(ROBOT_DESCRIPTION)?);
    let mut scene = PlanningScene::new(Arc::clone(&model));
    scene
        .transforms_mut()
        .set_transform("table", Pose::translation(0.6, 0.0, 0.0));
    scene.world_mut().add_object(WorldObject {
        id: "table_top".into(),
        shape: Shape::Box {
            half_extents: [0.3, 0.4, 0.02],
        },
        pose: Pose::translation(0.6, 0.0, -0.02),
    });
    let monitor = Arc::new(PlanningSceneMonitor::new(scene));
    let service = Arc::new(KinematicsService::new(Arc::clone(&monitor), config));

    let names: Vec<String> = model
        .variable_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut publisher = StatePublisher::new();
    publisher.plan_motion(
        &names,
        &model.default_positions(),
        &[0.3, 0.4, 0.6, 0.0, 0.5, 0.0],
        50,
    );
    let publishing = tokio::spawn(async move {
        while publisher.publish_next(&monitor) {
            sleep(Duration::from_millis(10)).await;
        }
        log::info!("Motion complete.");
    });

    let clients = vec![
        spawn_client(&service, "reach table point", |service| {
            let request = PositionIkRequest {
                group_name: "arm".into(),
                pose_stamped: PoseStamped::new("table", Pose::translation(-0.2, 0.1, 0.3)),
                timeout: Duration::from_millis(500),
                ..PositionIkRequest::default()
            };
            reach(service, request)
        }),
        spawn_client(&service, "reach avoiding table", |service| {
            let request = PositionIkRequest {
                group_name: "arm".into(),
                pose_stamped: PoseStamped::new("base", Pose::translation(0.3, 0.0, 0.4)),
                avoid_collisions: true,
                timeout: Duration::from_millis(500),
                ..PositionIkRequest::default()
            };
            reach(service, request)
        }),
        spawn_client(&service, "reach out of workspace", |service| {
            let request = PositionIkRequest {
                group_name: "arm".into(),
                pose_stamped: PoseStamped::new("base", Pose::translation(2.0, 0.0, 0.5)),
                ..PositionIkRequest::default()
            };
            reach(service, request)
        }),
        spawn_client(&service, "locate links", |service| {
            let request = GetPositionFkRequest {
                header: Header::stamped("table"),
                fk_link_names: vec!["gripper".into(), "forearm".into(), "camera".into()],
                ..GetPositionFkRequest::default()
            };
            let response = service.compute_fk(&request);
            let poses: Vec<String> = response
                .fk_link_names
                .iter()
                .zip(&response.pose_stamped)
                .map(|(name, pose)| {
                    let at = pose.pose.translation;
                    format!("{name} at ({:.3}, {:.3}, {:.3})", at.x, at.y, at.z)
                })
                .collect();
            format!("{} [{}]", response.error_code, poses.join(", "))
        }),
    ];

    for client in clients {
        let outcome = client.await?;
        log::info!("{outcome}");
    }
    publishing.await?;
    Ok(())
}

/// Run one blocking query on the worker pool, tagging its summary with `label`.
fn spawn_client<F>(
    service: &Arc<KinematicsService>,
    label: &'static str,
    query: F,
) -> JoinHandle<String>
where
    F: FnOnce(&KinematicsService) -> String + Send + 'static,
{
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || format!("{label}: {}", query(&service)))
}

fn reach(service: &KinematicsService, request: PositionIkRequest) -> String {
    let response = service.compute_ik(&request);
    let positions: Vec<String> = response
        .solution
        .joint_state
        .position
        .iter()
        .map(|value| format!("{value:.3}"))
        .collect();
    format!("{} [{}]", response.error_code, positions.join(", "))
}
