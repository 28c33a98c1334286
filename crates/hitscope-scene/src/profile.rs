//! Named collision profiles.
//!
//! A profile bundles an object channel with a response to every channel, so
//! that colliders (and profile traces) can be configured by name instead of
//! channel-by-channel. [`ProfileRegistry::default`] carries the stock
//! profiles every project starts with; the registry keeps insertion order,
//! which is the order hosts enumerate profiles in.

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelResponses, CollisionChannel, Response};
use crate::SceneError;

// ---------------------------------------------------------------------------
// CollisionProfile
// ---------------------------------------------------------------------------

/// A named collision preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionProfile {
    /// Unique profile name (e.g. `"BlockAll"`).
    pub name: String,
    /// The channel objects using this profile belong to.
    pub object_channel: CollisionChannel,
    /// When `false`, the profile never participates in queries.
    pub collision_enabled: bool,
    /// Response of this profile to every channel.
    pub responses: ChannelResponses,
}

impl CollisionProfile {
    /// A query-enabled profile.
    pub fn new(
        name: impl Into<String>,
        object_channel: CollisionChannel,
        responses: ChannelResponses,
    ) -> Self {
        Self {
            name: name.into(),
            object_channel,
            collision_enabled: true,
            responses,
        }
    }

    /// A profile with collision disabled.
    pub fn disabled(name: impl Into<String>, object_channel: CollisionChannel) -> Self {
        Self {
            name: name.into(),
            object_channel,
            collision_enabled: false,
            responses: ChannelResponses::all(Response::Ignore),
        }
    }

    /// Whether this profile blocks `channel` (and has collision enabled).
    pub fn blocks(&self, channel: CollisionChannel) -> bool {
        self.collision_enabled && self.responses.get(channel) == Response::Block
    }
}

// ---------------------------------------------------------------------------
// ProfileRegistry
// ---------------------------------------------------------------------------

/// Ordered set of profiles, unique by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRegistry {
    profiles: Vec<CollisionProfile>,
}

impl ProfileRegistry {
    /// A registry with no profiles.
    pub fn empty() -> Self {
        Self {
            profiles: Vec::new(),
        }
    }

    /// Add a profile.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::DuplicateProfile`] if a profile with the same
    /// name is already registered.
    pub fn register(&mut self, profile: CollisionProfile) -> Result<(), SceneError> {
        if self.get(&profile.name).is_some() {
            return Err(SceneError::DuplicateProfile { name: profile.name });
        }
        self.profiles.push(profile);
        Ok(())
    }

    /// Look up a profile by exact name.
    pub fn get(&self, name: &str) -> Option<&CollisionProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Profile names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollisionProfile> {
        self.profiles.iter()
    }
}

impl Default for ProfileRegistry {
    /// The stock profiles.
    fn default() -> Self {
        use CollisionChannel::*;
        use Response::*;

        let block_all = ChannelResponses::all(Block);
        let overlap_all = ChannelResponses::all(Overlap);
        let block_all_dynamic = ChannelResponses::all(Block).with(WorldStatic, Overlap);
        let overlap_all_dynamic = ChannelResponses::all(Overlap).with(WorldStatic, Ignore);
        let pawn = ChannelResponses::all(Block).with(Visibility, Ignore);
        let spectator = ChannelResponses::all(Ignore)
            .with(WorldStatic, Block)
            .with(WorldDynamic, Block);
        let character_mesh = ChannelResponses::all(Block)
            .with(Pawn, Ignore)
            .with(Vehicle, Ignore)
            .with(Camera, Ignore);
        let physics_actor = ChannelResponses::all(Block);
        let invisible_wall = ChannelResponses::all(Block).with(Visibility, Ignore);
        let trigger = ChannelResponses::all(Overlap).with(Visibility, Ignore);
        let ragdoll = ChannelResponses::all(Block).with(Pawn, Ignore).with(Visibility, Ignore);
        let ui = ChannelResponses::all(Overlap).with(Visibility, Block);

        let profiles = vec![
            CollisionProfile::disabled("NoCollision", WorldStatic),
            CollisionProfile::new("BlockAll", WorldStatic, block_all.clone()),
            CollisionProfile::new("OverlapAll", WorldStatic, overlap_all),
            CollisionProfile::new("BlockAllDynamic", WorldDynamic, block_all_dynamic),
            CollisionProfile::new("OverlapAllDynamic", WorldDynamic, overlap_all_dynamic),
            CollisionProfile::new(
                "IgnoreOnlyPawn",
                WorldDynamic,
                block_all.clone().with(Pawn, Ignore).with(Vehicle, Ignore),
            ),
            CollisionProfile::new(
                "OverlapOnlyPawn",
                WorldDynamic,
                block_all.clone().with(Pawn, Overlap).with(Camera, Ignore),
            ),
            CollisionProfile::new("Pawn", Pawn, pawn),
            CollisionProfile::new("Spectator", Pawn, spectator),
            CollisionProfile::new("CharacterMesh", Pawn, character_mesh),
            CollisionProfile::new("PhysicsActor", PhysicsBody, physics_actor),
            CollisionProfile::new("Destructible", Destructible, block_all.clone()),
            CollisionProfile::new("InvisibleWall", WorldStatic, invisible_wall.clone()),
            CollisionProfile::new("InvisibleWallDynamic", WorldDynamic, invisible_wall),
            CollisionProfile::new("Trigger", WorldDynamic, trigger),
            CollisionProfile::new("Ragdoll", PhysicsBody, ragdoll),
            CollisionProfile::new("Vehicle", Vehicle, block_all),
            CollisionProfile::new("UI", WorldDynamic, ui),
        ];
        Self { profiles }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
