//! The IK and FK query handlers.

use std::sync::Arc;
use std::time::Duration;

use kinematics::{IkGoal, JointGroup, RobotModel, RobotState};
use scene::{ConstraintSet, FrameTransforms, PlanningSceneMonitor, SceneSnapshot, same_frame};

use crate::access::{LockPolicy, SceneAccess};
use crate::config::ServiceConfig;
use crate::error_code::ErrorCode;
use crate::instrumentation::{Instrumentation, NoopInstrumentation, blocks, events};
use crate::msg::{
    GetPositionFkRequest, GetPositionFkResponse, GetPositionIkResponse, Header, PoseStamped,
    PositionIkRequest, RobotStateMsg,
};
use crate::transform::PoseTransformResolver;
use crate::validity::StateValidity;

/// A pose the solver must reach at `link`, still in the request's frame.
struct Target<'r> {
    link: usize,
    pose: &'r PoseStamped,
}

/// Answers IK and FK queries against the monitored scene.
///
/// Requests may be served from any number of threads at once; the only
/// shared state is the monitor.
pub struct KinematicsService {
    monitor: Arc<PlanningSceneMonitor>,
    config: ServiceConfig,
    instrumentation: Arc<dyn Instrumentation>,
}

impl KinematicsService {
    pub fn new(monitor: Arc<PlanningSceneMonitor>, config: ServiceConfig) -> Self {
        Self {
            monitor,
            config,
            instrumentation: Arc::new(NoopInstrumentation),
        }
    }

    pub fn with_instrumentation(mut self, instrumentation: Arc<dyn Instrumentation>) -> Self {
        self.instrumentation = instrumentation;
        self
    }

    pub fn monitor(&self) -> &Arc<PlanningSceneMonitor> {
        &self.monitor
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn compute_ik(&self, request: &PositionIkRequest) -> GetPositionIkResponse {
        let _block = self.instrumentation.scoped(blocks::COMPUTE_IK);
        match self.solve_ik(request) {
            Ok(state) => GetPositionIkResponse {
                solution: RobotStateMsg::from_state(&state),
                error_code: ErrorCode::Success,
            },
            Err(error_code) => {
                log::debug!("IK for group {} failed: {error_code}", request.group_name);
                GetPositionIkResponse {
                    solution: RobotStateMsg::default(),
                    error_code,
                }
            }
        }
    }

    pub fn compute_fk(&self, request: &GetPositionFkRequest) -> GetPositionFkResponse {
        let _block = self.instrumentation.scoped(blocks::COMPUTE_FK);
        let mut response = GetPositionFkResponse {
            pose_stamped: Vec::new(),
            fk_link_names: Vec::new(),
            error_code: ErrorCode::Success,
        };
        if request.fk_link_names.is_empty() {
            log::error!("No links specified for FK request");
            self.instrumentation.event(events::REJECTED_REQUEST);
            response.error_code = ErrorCode::InvalidLinkName;
            return response;
        }

        let model_frame = self.monitor.robot_model().model_frame();
        let output_frame = request.header.frame_id.as_str();
        let do_transform = !output_frame.is_empty() && !same_frame(output_frame, model_frame);

        let SceneSnapshot {
            mut state,
            transforms,
        } = self.access().snapshot();
        request.robot_state.apply_to(&mut state);
        let resolver = PoseTransformResolver::new(&transforms, &state);

        let mut transform_failed = false;
        for name in &request.fk_link_names {
            let Some(pose) = state.global_link_transform(name) else {
                log::debug!("FK request names unknown link {name}");
                continue;
            };
            let mut stamped = PoseStamped {
                header: Header::stamped(model_frame),
                pose,
            };
            if do_transform {
                match resolver.express_in(&pose, output_frame) {
                    Ok(pose) => {
                        stamped.header.frame_id = output_frame.to_string();
                        stamped.pose = pose;
                    }
                    Err(err) => {
                        log::warn!("cannot express {name} in {output_frame}: {err}");
                        transform_failed = true;
                    }
                }
            }
            response.pose_stamped.push(stamped);
            response.fk_link_names.push(name.clone());
        }

        response.error_code = if transform_failed {
            ErrorCode::FrameTransformFailure
        } else if response.fk_link_names.len() == request.fk_link_names.len() {
            ErrorCode::Success
        } else {
            ErrorCode::InvalidLinkName
        };
        response
    }

    fn access(&self) -> SceneAccess<'_> {
        SceneAccess::new(
            &self.monitor,
            self.instrumentation.as_ref(),
            self.config.lock_wait_warn(),
        )
    }

    fn timeout(&self, requested: Duration) -> Duration {
        if requested.is_zero() {
            self.config.default_timeout()
        } else {
            requested
        }
    }

    fn solve_ik(&self, request: &PositionIkRequest) -> Result<RobotState, ErrorCode> {
        let model = self.monitor.robot_model();
        let group = model.group(&request.group_name).ok_or_else(|| {
            log::warn!("unknown group {}", request.group_name);
            self.instrumentation.event(events::REJECTED_REQUEST);
            ErrorCode::InvalidGroupName
        })?;
        let targets = targets(model, group, request).inspect_err(|_| {
            self.instrumentation.event(events::REJECTED_REQUEST);
        })?;
        let timeout = self.timeout(request.timeout);
        let access = self.access();

        match LockPolicy::for_request(request) {
            LockPolicy::HeldThroughSolve => {
                self.instrumentation.event(events::HELD_LOCK_SOLVE);
                let scene = access.lock_read();
                let mut state = scene.current_state().clone();
                if !request.robot_state.is_empty() {
                    request.robot_state.apply_to(&mut state);
                }
                let mut constraints = ConstraintSet::new(Arc::clone(model));
                constraints.add(&request.constraints, scene.transforms(), &state);
                let validity = StateValidity::compose(
                    request.avoid_collisions.then_some(&*scene),
                    Some(&constraints),
                );
                let solved = self.solve(
                    &mut state,
                    group,
                    &targets,
                    scene.transforms(),
                    timeout,
                    validity.as_ref(),
                );
                drop(validity);
                scene.release();
                solved.map(|()| state)
            }
            LockPolicy::SnapshotAndRelease => {
                self.instrumentation.event(events::SNAPSHOT_SOLVE);
                let SceneSnapshot {
                    mut state,
                    transforms,
                } = access.snapshot();
                if !request.robot_state.is_empty() {
                    request.robot_state.apply_to(&mut state);
                }
                self.solve(&mut state, group, &targets, &transforms, timeout, None)
                    .map(|()| state)
            }
        }
    }

    fn solve(
        &self,
        state: &mut RobotState,
        group: &JointGroup,
        targets: &[Target<'_>],
        transforms: &FrameTransforms,
        timeout: Duration,
        validity: Option<&StateValidity<'_>>,
    ) -> Result<(), ErrorCode> {
        let resolver = PoseTransformResolver::new(transforms, state);
        let poses = resolver
            .all_to_model_frame(targets.iter().map(|target| target.pose))
            .map_err(|err| {
                log::warn!("cannot transform IK target: {err}");
                ErrorCode::FrameTransformFailure
            })?;
        let goals: Vec<IkGoal> = targets
            .iter()
            .zip(poses)
            .map(|(target, pose)| IkGoal {
                link: target.link,
                pose,
            })
            .collect();

        let _block = self.instrumentation.scoped(blocks::IK_SOLVE);
        let solved = match validity {
            Some(validity) => {
                state.set_from_ik_checked(group, &goals, timeout, |scratch, group, positions| {
                    validity.is_valid(scratch, group, positions)
                })
            }
            None => state.set_from_ik(group, &goals, timeout),
        };
        if solved {
            Ok(())
        } else {
            Err(ErrorCode::NoIkSolution)
        }
    }
}

/// Pair every requested pose with the link it is meant for.
///
/// Runs before any lock is taken: mismatched counts and names the model does
/// not know are rejected here. A request with both an unknown link and an
/// untransformable frame therefore reports `InvalidLinkName`.
fn targets<'r>(
    model: &RobotModel,
    group: &JointGroup,
    request: &'r PositionIkRequest,
) -> Result<Vec<Target<'r>>, ErrorCode> {
    let link = |name: &str| {
        if name.is_empty() {
            return Ok(group.tip_link());
        }
        model.link_index(name).ok_or_else(|| {
            log::warn!("unknown IK link {name}");
            ErrorCode::InvalidLinkName
        })
    };

    if request.pose_stamped_vector.len() <= 1 {
        let (pose, link_name) = match request.pose_stamped_vector.first() {
            Some(pose) => (
                pose,
                request.ik_link_names.first().map_or("", String::as_str),
            ),
            None => (&request.pose_stamped, request.ik_link_name.as_str()),
        };
        return Ok(vec![Target {
            link: link(link_name)?,
            pose,
        }]);
    }

    if request.pose_stamped_vector.len() != request.ik_link_names.len() {
        log::warn!(
            "{} IK poses given for {} links",
            request.pose_stamped_vector.len(),
            request.ik_link_names.len()
        );
        return Err(ErrorCode::InvalidLinkName);
    }
    request
        .pose_stamped_vector
        .iter()
        .zip(&request.ik_link_names)
        .map(|(pose, name)| {
            Ok(Target {
                link: link(name.as_str())?,
                pose,
            })
        })
        .collect()
}
