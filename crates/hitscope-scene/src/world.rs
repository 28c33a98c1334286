//! rapier3d-backed collision scene.
//!
//! [`CollisionWorld`] holds static colliders only; nothing is simulated. It
//! exists to answer line traces through rapier's [`QueryPipeline`].
//!
//! # Channel filtering
//!
//! Every collider carries rapier interaction groups derived from its object
//! channel and channel responses:
//!
//! - memberships = the bit of its object channel,
//! - filter = the bits of every channel it blocks.
//!
//! rapier accepts a pair when each side's memberships intersect the other
//! side's filter, so:
//!
//! - a channel trace uses `(channel bit, ALL)` and hits colliders that block
//!   the channel;
//! - a profile trace uses `(profile object bit, profile block mask)` and hits
//!   colliders that block the profile's object channel *and* are blocked by
//!   the profile.
//!
//! # Simple vs. complex
//!
//! A collider is tagged with the [`Representation`] it stands for, stored in
//! rapier's `user_data`. A trace tests simple colliders unless it asks for
//! complex collision.

use rapier3d::na::{Point3, Vector3};
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelNames, ChannelResponses, CollisionChannel};
use crate::profile::{CollisionProfile, ProfileRegistry};
use crate::{QueryTarget, RayHit, SceneError, SceneQuery};

const SIMPLE_BIT: u128 = 0b01;
const COMPLEX_BIT: u128 = 0b10;

// ---------------------------------------------------------------------------
// Collider description
// ---------------------------------------------------------------------------

/// Which collision representation a collider belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Representation {
    /// Primitive collision (hit by non-complex traces).
    Simple,
    /// Per-polygon collision (hit by complex traces).
    Complex,
    /// Used for both kinds of trace.
    #[default]
    Both,
}

impl Representation {
    fn user_data(self) -> u128 {
        match self {
            Representation::Simple => SIMPLE_BIT,
            Representation::Complex => COMPLEX_BIT,
            Representation::Both => SIMPLE_BIT | COMPLEX_BIT,
        }
    }
}

/// Collider geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeDesc {
    /// Box with half-extents along x, y and z.
    Cuboid { half_extents: [f32; 3] },
    /// Sphere.
    Ball { radius: f32 },
    /// Capsule aligned with the z axis.
    Capsule { half_height: f32, radius: f32 },
}

impl ShapeDesc {
    fn to_shared_shape(&self) -> SharedShape {
        match *self {
            ShapeDesc::Cuboid { half_extents: [x, y, z] } => SharedShape::cuboid(x, y, z),
            ShapeDesc::Ball { radius } => SharedShape::ball(radius),
            ShapeDesc::Capsule {
                half_height,
                radius,
            } => SharedShape::capsule_z(half_height, radius),
        }
    }
}

/// Everything needed to place a collider in a [`CollisionWorld`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCollider {
    pub shape: ShapeDesc,
    /// World-space translation.
    pub translation: [f32; 3],
    /// World-space rotation as a scaled axis (axis * angle in radians).
    pub rotation: [f32; 3],
    pub object_channel: CollisionChannel,
    pub responses: ChannelResponses,
    pub representation: Representation,
}

impl SceneCollider {
    /// A collider at the origin on `WorldStatic` that blocks every channel.
    pub fn new(shape: ShapeDesc) -> Self {
        Self {
            shape,
            translation: [0.0; 3],
            rotation: [0.0; 3],
            object_channel: CollisionChannel::WorldStatic,
            responses: ChannelResponses::default(),
            representation: Representation::Both,
        }
    }

    pub fn cuboid(hx: f32, hy: f32, hz: f32) -> Self {
        Self::new(ShapeDesc::Cuboid {
            half_extents: [hx, hy, hz],
        })
    }

    pub fn ball(radius: f32) -> Self {
        Self::new(ShapeDesc::Ball { radius })
    }

    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Self::new(ShapeDesc::Capsule {
            half_height,
            radius,
        })
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.translation = [x, y, z];
        self
    }

    pub fn rotated(mut self, scaled_axis: [f32; 3]) -> Self {
        self.rotation = scaled_axis;
        self
    }

    pub fn channel(mut self, channel: CollisionChannel) -> Self {
        self.object_channel = channel;
        self
    }

    pub fn responses(mut self, responses: ChannelResponses) -> Self {
        self.responses = responses;
        self
    }

    pub fn representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    /// Take object channel and responses from a profile. A profile with
    /// collision disabled leaves the collider invisible to every trace.
    pub fn with_profile(mut self, profile: &CollisionProfile) -> Self {
        self.object_channel = profile.object_channel;
        self.responses = if profile.collision_enabled {
            profile.responses.clone()
        } else {
            ChannelResponses::all(crate::channel::Response::Ignore)
        };
        self
    }

    fn interaction_groups(&self) -> InteractionGroups {
        InteractionGroups::new(
            Group::from_bits_truncate(self.object_channel.bit()),
            Group::from_bits_truncate(self.responses.block_mask()),
        )
    }

    fn build(&self) -> Collider {
        let [tx, ty, tz] = self.translation;
        let [rx, ry, rz] = self.rotation;
        ColliderBuilder::new(self.shape.to_shared_shape())
            .translation(vector![tx, ty, tz])
            .rotation(vector![rx, ry, rz])
            .collision_groups(self.interaction_groups())
            .user_data(self.representation.user_data())
            .build()
    }
}

// ---------------------------------------------------------------------------
// CollisionWorld
// ---------------------------------------------------------------------------

/// A static scene answering channel and profile line traces.
pub struct CollisionWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    islands: IslandManager,
    query_pipeline: QueryPipeline,
    profiles: ProfileRegistry,
    channel_names: ChannelNames,
}

impl CollisionWorld {
    /// An empty world with the stock profiles and canonical channel names.
    pub fn new() -> Self {
        Self::with_profiles(ProfileRegistry::default())
    }

    /// An empty world with a custom profile registry.
    pub fn with_profiles(profiles: ProfileRegistry) -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            islands: IslandManager::new(),
            query_pipeline: QueryPipeline::new(),
            profiles,
            channel_names: ChannelNames::default(),
        }
    }

    /// Insert a collider and refresh the query acceleration structure.
    pub fn add_collider(&mut self, collider: SceneCollider) -> ColliderHandle {
        let handle = self.colliders.insert(collider.build());
        self.query_pipeline.update(&self.colliders);
        handle
    }

    /// Insert many colliders with a single query pipeline refresh.
    pub fn extend<I>(&mut self, colliders: I) -> Vec<ColliderHandle>
    where
        I: IntoIterator<Item = SceneCollider>,
    {
        let handles = colliders
            .into_iter()
            .map(|c| self.colliders.insert(c.build()))
            .collect();
        self.query_pipeline.update(&self.colliders);
        handles
    }

    /// Insert a collider configured from a registered profile.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownProfile`] if no profile has that name.
    pub fn add_collider_with_profile(
        &mut self,
        collider: SceneCollider,
        profile_name: &str,
    ) -> Result<ColliderHandle, SceneError> {
        let profile = self
            .profiles
            .get(profile_name)
            .ok_or_else(|| SceneError::UnknownProfile {
                name: profile_name.to_owned(),
            })?;
        let collider = collider.with_profile(profile);
        Ok(self.add_collider(collider))
    }

    /// Remove a collider. Returns `false` if the handle was stale.
    pub fn remove_collider(&mut self, handle: ColliderHandle) -> bool {
        let removed = self
            .colliders
            .remove(handle, &mut self.islands, &mut self.bodies, false)
            .is_some();
        if removed {
            self.query_pipeline.update(&self.colliders);
        }
        removed
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    pub fn profiles_mut(&mut self) -> &mut ProfileRegistry {
        &mut self.profiles
    }

    pub fn channel_names(&self) -> &ChannelNames {
        &self.channel_names
    }

    pub fn channel_names_mut(&mut self) -> &mut ChannelNames {
        &mut self.channel_names
    }

    fn query_groups(&self, target: &QueryTarget) -> Option<InteractionGroups> {
        match target {
            QueryTarget::Channel(channel) => Some(InteractionGroups::new(
                Group::from_bits_truncate(channel.bit()),
                Group::ALL,
            )),
            QueryTarget::Profile(name) => {
                let Some(profile) = self.profiles.get(name) else {
                    tracing::trace!(profile = %name, "profile trace against unknown profile");
                    return None;
                };
                if !profile.collision_enabled {
                    return None;
                }
                Some(InteractionGroups::new(
                    Group::from_bits_truncate(profile.object_channel.bit()),
                    Group::from_bits_truncate(profile.responses.block_mask()),
                ))
            }
        }
    }
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneQuery for CollisionWorld {
    fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        target: &QueryTarget,
        trace_complex: bool,
    ) -> Option<RayHit> {
        if !(max_distance > 0.0) {
            return None;
        }
        let dir = direction.try_normalize(f32::EPSILON)?;
        let groups = self.query_groups(target)?;

        let wanted = if trace_complex { COMPLEX_BIT } else { SIMPLE_BIT };
        let representation = |_: ColliderHandle, collider: &Collider| collider.user_data & wanted != 0;
        let filter = QueryFilter::new().groups(groups).predicate(&representation);

        let ray = Ray::new(origin, dir);
        let (_, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            max_distance,
            true,
            filter,
        )?;

        // A ray starting inside a solid has no usable normal (rapier leaves it
        // zero or NaN); it faces back along the ray instead.
        let normal = if hit.time_of_impact <= 0.0 || !hit.normal.iter().all(|c| c.is_finite()) {
            -dir
        } else {
            hit.normal.try_normalize(1.0e-6).unwrap_or(-dir)
        };
        Some(RayHit {
            normal,
            hit_fraction: (hit.time_of_impact / max_distance).clamp(0.0, 1.0),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Response;

    fn forward() -> Vector3<f32> {
        Vector3::new(1.0, 0.0, 0.0)
    }

    /// A wall facing -x, 10 units ahead of the origin.
    fn wall() -> SceneCollider {
        SceneCollider::cuboid(0.5, 50.0, 50.0).at(10.5, 0.0, 0.0)
    }

    #[test]
    fn channel_trace_hits_wall() {
        let mut world = CollisionWorld::new();
        world.add_collider(wall());

        let hit = world
            .raycast(
                Point3::origin(),
                forward(),
                100.0,
                &QueryTarget::Channel(CollisionChannel::Visibility),
                false,
            )
            .expect("wall should block visibility");

        assert!((hit.hit_fraction - 0.1).abs() < 1e-4, "fraction {}", hit.hit_fraction);
        assert!((hit.normal - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-4);
    }

    #[test]
    fn empty_world_misses() {
        let world = CollisionWorld::new();
        let hit = world.raycast(
            Point3::origin(),
            forward(),
            100.0,
            &QueryTarget::Channel(CollisionChannel::WorldStatic),
            false,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn ignored_channel_passes_through() {
        let mut world = CollisionWorld::new();
        world.add_collider(
            wall().responses(ChannelResponses::default().with(CollisionChannel::Camera, Response::Ignore)),
        );

        let camera = QueryTarget::Channel(CollisionChannel::Camera);
        let visibility = QueryTarget::Channel(CollisionChannel::Visibility);
        assert!(world.raycast(Point3::origin(), forward(), 100.0, &camera, false).is_none());
        assert!(world.raycast(Point3::origin(), forward(), 100.0, &visibility, false).is_some());
    }

    #[test]
    fn overlap_does_not_stop_trace() {
        let mut world = CollisionWorld::new();
        world.add_collider(
            wall().responses(ChannelResponses::default().with(CollisionChannel::Pawn, Response::Overlap)),
        );
        let pawn = QueryTarget::Channel(CollisionChannel::Pawn);
        assert!(world.raycast(Point3::origin(), forward(), 100.0, &pawn, false).is_none());
    }

    #[test]
    fn out_of_range_is_a_miss() {
        let mut world = CollisionWorld::new();
        world.add_collider(wall());
        let target = QueryTarget::Channel(CollisionChannel::WorldStatic);
        assert!(world.raycast(Point3::origin(), forward(), 5.0, &target, false).is_none());
    }

    #[test]
    fn complex_flag_selects_representation() {
        let mut world = CollisionWorld::new();
        world.add_collider(wall().representation(Representation::Complex));
        let target = QueryTarget::Channel(CollisionChannel::WorldStatic);

        assert!(world.raycast(Point3::origin(), forward(), 100.0, &target, false).is_none());
        assert!(world.raycast(Point3::origin(), forward(), 100.0, &target, true).is_some());
    }

    #[test]
    fn profile_trace_requires_mutual_block() {
        let mut world = CollisionWorld::new();
        // A pawn-channel object that blocks everything.
        world.add_collider(wall().channel(CollisionChannel::Pawn));

        // "Spectator" only blocks WorldStatic/WorldDynamic, so it passes the pawn.
        let spectator = QueryTarget::Profile("Spectator".to_owned());
        assert!(world.raycast(Point3::origin(), forward(), 100.0, &spectator, false).is_none());

        // "BlockAll" blocks pawns and the wall blocks WorldStatic.
        let block_all = QueryTarget::Profile("BlockAll".to_owned());
        assert!(world.raycast(Point3::origin(), forward(), 100.0, &block_all, false).is_some());
    }

    #[test]
    fn disabled_or_unknown_profile_never_hits() {
        let mut world = CollisionWorld::new();
        world.add_collider(wall());
        for name in ["NoCollision", "DoesNotExist"] {
            let target = QueryTarget::Profile(name.to_owned());
            assert!(
                world.raycast(Point3::origin(), forward(), 100.0, &target, false).is_none(),
                "{name} should miss"
            );
        }
    }

    #[test]
    fn collider_with_disabled_profile_is_invisible() {
        let mut world = CollisionWorld::new();
        world.add_collider_with_profile(wall(), "NoCollision").unwrap();
        let target = QueryTarget::Channel(CollisionChannel::WorldStatic);
        assert!(world.raycast(Point3::origin(), forward(), 100.0, &target, false).is_none());
    }

    #[test]
    fn unknown_profile_is_rejected_on_insert() {
        let mut world = CollisionWorld::new();
        let err = world.add_collider_with_profile(wall(), "Nope").unwrap_err();
        assert!(matches!(err, SceneError::UnknownProfile { .. }));
        assert_eq!(world.collider_count(), 0);
    }

    #[test]
    fn starting_inside_reports_reverse_direction() {
        let mut world = CollisionWorld::new();
        world.add_collider(SceneCollider::ball(5.0));
        let target = QueryTarget::Channel(CollisionChannel::WorldStatic);
        let hit = world
            .raycast(Point3::origin(), forward(), 100.0, &target, false)
            .unwrap();
        assert_eq!(hit.hit_fraction, 0.0);
        assert!(hit.normal.iter().all(|c| c.is_finite()));
        assert!((hit.normal.norm() - 1.0).abs() < 1e-4);
        assert!((hit.normal + forward()).norm() < 1e-4);
    }

    #[test]
    fn removed_collider_no_longer_hits() {
        let mut world = CollisionWorld::new();
        let handle = world.add_collider(wall());
        assert!(world.remove_collider(handle));
        assert!(!world.remove_collider(handle));
        let target = QueryTarget::Channel(CollisionChannel::WorldStatic);
        assert!(world.raycast(Point3::origin(), forward(), 100.0, &target, false).is_none());
    }

    #[test]
    fn zero_direction_is_a_miss() {
        let mut world = CollisionWorld::new();
        world.add_collider(SceneCollider::ball(5.0));
        let target = QueryTarget::Channel(CollisionChannel::WorldStatic);
        assert!(world
            .raycast(Point3::origin(), Vector3::zeros(), 100.0, &target, false)
            .is_none());
    }
}
