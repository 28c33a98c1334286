//! Integration tests for scene queries.
//!
//! These exercise [`CollisionWorld`] through the [`SceneQuery`] trait object,
//! the same way the tile renderer uses it.

use std::sync::{Arc, RwLock};

use hitscope_scene::prelude::*;
use proptest::prelude::*;

/// Six walls enclosing the origin in a 20x20x20 room.
fn closed_room() -> CollisionWorld {
    let mut world = CollisionWorld::new();
    world.extend([
        SceneCollider::cuboid(1.0, 11.0, 11.0).at(11.0, 0.0, 0.0),
        SceneCollider::cuboid(1.0, 11.0, 11.0).at(-11.0, 0.0, 0.0),
        SceneCollider::cuboid(11.0, 1.0, 11.0).at(0.0, 11.0, 0.0),
        SceneCollider::cuboid(11.0, 1.0, 11.0).at(0.0, -11.0, 0.0),
        SceneCollider::cuboid(11.0, 11.0, 1.0).at(0.0, 0.0, 11.0),
        SceneCollider::cuboid(11.0, 11.0, 1.0).at(0.0, 0.0, -11.0),
    ]);
    world
}

fn unit_component() -> impl Strategy<Value = f32> {
    (-1000i32..=1000i32).prop_map(|v| v as f32 / 1000.0)
}

proptest! {
    #[test]
    fn every_ray_inside_a_closed_room_hits_with_unit_normal(
        x in unit_component(),
        y in unit_component(),
        z in unit_component(),
    ) {
        let dir = Vector3::new(x, y, z);
        prop_assume!(dir.norm() > 1e-3);

        let world = closed_room();
        let target = QueryTarget::Channel(CollisionChannel::WorldStatic);
        let hit = world.raycast(Point3::origin(), dir, 1000.0, &target, false);

        let hit = hit.expect("a closed room cannot be escaped");
        prop_assert!((hit.normal.norm() - 1.0).abs() < 1e-3);
        prop_assert!((0.0..=1.0).contains(&hit.hit_fraction));
        // Walls are at least 10 and at most sqrt(3)*10 units away.
        prop_assert!(hit.hit_fraction >= 0.0099);
        prop_assert!(hit.hit_fraction <= 0.0175);
        // The normal faces back towards the ray origin.
        prop_assert!(hit.normal.dot(&dir) < 0.0);
    }
}

#[test]
fn works_through_a_trait_object() {
    let scene: Arc<dyn SceneQuery> = Arc::new(closed_room());
    let target = QueryTarget::Profile("BlockAll".to_owned());
    let hit = scene
        .raycast(Point3::origin(), Vector3::z(), 1000.0, &target, false)
        .unwrap();
    assert!((hit.normal - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-4);
}

#[test]
fn locked_scene_can_be_edited_between_queries() {
    let scene = Arc::new(RwLock::new(CollisionWorld::new()));
    let target = QueryTarget::Channel(CollisionChannel::Visibility);

    assert!(scene
        .raycast(Point3::origin(), Vector3::x(), 100.0, &target, false)
        .is_none());

    scene
        .write()
        .unwrap()
        .add_collider(SceneCollider::cuboid(1.0, 5.0, 5.0).at(50.0, 0.0, 0.0));

    let hit = scene
        .raycast(Point3::origin(), Vector3::x(), 100.0, &target, false)
        .unwrap();
    assert!((hit.hit_fraction - 0.49).abs() < 1e-4);
}

#[test]
fn custom_profile_drives_profile_traces() {
    let mut world = CollisionWorld::new();
    world
        .profiles_mut()
        .register(CollisionProfile::new(
            "Projectile",
            CollisionChannel::GameTraceChannel1,
            ChannelResponses::all(Response::Ignore).with(CollisionChannel::Pawn, Response::Block),
        ))
        .unwrap();
    world.channel_names_mut().rename(CollisionChannel::GameTraceChannel1, "Projectile");

    world.add_collider(
        SceneCollider::capsule(1.0, 0.5)
            .at(10.0, 0.0, 0.0)
            .channel(CollisionChannel::Pawn),
    );
    world.add_collider(SceneCollider::cuboid(1.0, 5.0, 5.0).at(5.0, 0.0, 0.0));

    // The static wall in front is ignored by the projectile profile.
    let target = QueryTarget::Profile("Projectile".to_owned());
    let hit = world
        .raycast(Point3::origin(), Vector3::x(), 100.0, &target, false)
        .unwrap();
    assert!((hit.hit_fraction - 0.095).abs() < 1e-4);

    let names = world.channel_names().to_vec();
    assert_eq!(names[CollisionChannel::GameTraceChannel1.index()], "Projectile");
}

#[test]
fn collider_description_deserializes_from_json() {
    let json = r#"{
        "shape": { "Ball": { "radius": 2.0 } },
        "translation": [5.0, 0.0, 0.0],
        "rotation": [0.0, 0.0, 0.0],
        "object_channel": "WorldDynamic",
        "responses": { "responses": [
            "Block","Block","Block","Block","Block","Block","Block","Block",
            "Block","Block","Block","Block","Block","Block","Block","Block",
            "Block","Block","Block","Block","Block","Block","Block","Block",
            "Block","Block","Block","Block","Block","Block","Block","Block"
        ] },
        "representation": "Simple"
    }"#;
    let collider: SceneCollider = serde_json::from_str(json).unwrap();
    assert_eq!(collider.object_channel, CollisionChannel::WorldDynamic);

    let mut world = CollisionWorld::new();
    world.add_collider(collider);
    let target = QueryTarget::Channel(CollisionChannel::Camera);
    let hit = world
        .raycast(Point3::origin(), Vector3::x(), 10.0, &target, false)
        .unwrap();
    assert!((hit.hit_fraction - 0.3).abs() < 1e-4);
}
