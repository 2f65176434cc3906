//! World geometry and link-sphere collision tests.

use kinematics::{Pose, RobotState};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Sphere { radius: f64 },
    /// Box centred on its pose, extending `half_extents` along each local axis.
    Box { half_extents: [f64; 3] },
}

impl Shape {
    /// Whether a sphere at `center` (in the shape frame) touches the shape.
    fn touches_sphere(&self, center: &Point3<f64>, radius: f64) -> bool {
        match self {
            Self::Sphere { radius: own } => center.coords.norm() <= own + radius,
            Self::Box { half_extents } => {
                let half = Vector3::from(*half_extents);
                let closest = center.coords.zip_map(&half, |c, h| c.clamp(-h, h));
                (center.coords - closest).norm() <= radius
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    pub id: String,
    pub shape: Shape,
    /// Pose in the model frame.
    pub pose: Pose,
}

#[derive(Debug, Clone, Default)]
pub struct CollisionWorld {
    objects: Vec<WorldObject>,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object, replacing any existing object with the same id.
    pub fn add_object(&mut self, object: WorldObject) {
        self.objects.retain(|o| o.id != object.id);
        self.objects.push(object);
    }

    pub fn remove_object(&mut self, id: &str) -> bool {
        let before = self.objects.len();
        self.objects.retain(|o| o.id != id);
        self.objects.len() != before
    }

    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// First object touching a sphere given in the model frame.
    pub fn sphere_contact(&self, center: &Vector3<f64>, radius: f64) -> Option<&WorldObject> {
        let point = Point3::from(*center);
        self.objects.iter().find(|object| {
            let local = object.pose.inverse_transform_point(&point);
            object.shape.touches_sphere(&local, radius)
        })
    }

    /// Whether any listed link's collision sphere touches the world.
    pub fn links_in_contact(&self, state: &RobotState, links: &[usize]) -> bool {
        let model = state.model();
        links.iter().any(|&link| {
            let Some(radius) = model.links()[link].collision_radius else {
                return false;
            };
            let center = state.link_transform(link).translation.vector;
            match self.sphere_contact(&center, radius) {
                Some(object) => {
                    log::trace!("link {} touches {}", model.links()[link].name, object.id);
                    true
                }
                None => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with(shape: Shape, pose: Pose) -> CollisionWorld {
        let mut world = CollisionWorld::new();
        world.add_object(WorldObject {
            id: "obstacle".into(),
            shape,
            pose,
        });
        world
    }

    #[test]
    fn sphere_against_sphere() {
        let world = world_with(Shape::Sphere { radius: 0.1 }, Pose::translation(1.0, 0.0, 0.0));
        assert!(world.sphere_contact(&Vector3::new(0.85, 0.0, 0.0), 0.06).is_some());
        assert!(world.sphere_contact(&Vector3::new(0.8, 0.0, 0.0), 0.05).is_none());
    }

    #[test]
    fn sphere_against_box_uses_closest_point() {
        let world = world_with(
            Shape::Box {
                half_extents: [0.5, 0.5, 0.1],
            },
            Pose::translation(0.0, 0.0, -0.1),
        );
        // Box top face sits at z = 0.
        assert!(world.sphere_contact(&Vector3::new(0.3, 0.3, 0.04), 0.05).is_some());
        assert!(world.sphere_contact(&Vector3::new(0.3, 0.3, 0.06), 0.05).is_none());
        // Beyond the corner the distance is diagonal.
        assert!(world.sphere_contact(&Vector3::new(0.54, 0.54, 0.0), 0.05).is_none());
    }

    #[test]
    fn adding_same_id_replaces_object() {
        let mut world = world_with(Shape::Sphere { radius: 0.1 }, Pose::identity());
        world.add_object(WorldObject {
            id: "obstacle".into(),
            shape: Shape::Sphere { radius: 0.2 },
            pose: Pose::identity(),
        });
        assert_eq!(world.objects().len(), 1);
        assert!(world.remove_object("obstacle"));
        assert!(world.is_empty());
        assert!(!world.remove_object("obstacle"));
    }
}
