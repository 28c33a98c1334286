//! Collision channels and per-channel responses.
//!
//! A scene has exactly 32 collision channels, which map one-to-one onto the
//! 32 bits of a rapier [`Group`](rapier3d::geometry::Group). The first eight
//! are the built-in object/trace types, followed by six engine trace channels
//! and eighteen game trace channels that a project may rename.
//!
//! The ordering here is load-bearing: hosts enumerate channel names in this
//! order, and a channel is recovered from its position in that list with
//! [`CollisionChannel::from_index`].

use serde::{Deserialize, Serialize};

use crate::SceneError;

/// Number of collision channels (one per group bit).
pub const CHANNEL_COUNT: usize = 32;

/// A collision channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionChannel {
    #[default]
    WorldStatic,
    WorldDynamic,
    Pawn,
    Visibility,
    Camera,
    PhysicsBody,
    Vehicle,
    Destructible,
    EngineTraceChannel1,
    EngineTraceChannel2,
    EngineTraceChannel3,
    EngineTraceChannel4,
    EngineTraceChannel5,
    EngineTraceChannel6,
    GameTraceChannel1,
    GameTraceChannel2,
    GameTraceChannel3,
    GameTraceChannel4,
    GameTraceChannel5,
    GameTraceChannel6,
    GameTraceChannel7,
    GameTraceChannel8,
    GameTraceChannel9,
    GameTraceChannel10,
    GameTraceChannel11,
    GameTraceChannel12,
    GameTraceChannel13,
    GameTraceChannel14,
    GameTraceChannel15,
    GameTraceChannel16,
    GameTraceChannel17,
    GameTraceChannel18,
}

impl CollisionChannel {
    /// Every channel, in index order.
    pub const ALL: [CollisionChannel; CHANNEL_COUNT] = [
        Self::WorldStatic,
        Self::WorldDynamic,
        Self::Pawn,
        Self::Visibility,
        Self::Camera,
        Self::PhysicsBody,
        Self::Vehicle,
        Self::Destructible,
        Self::EngineTraceChannel1,
        Self::EngineTraceChannel2,
        Self::EngineTraceChannel3,
        Self::EngineTraceChannel4,
        Self::EngineTraceChannel5,
        Self::EngineTraceChannel6,
        Self::GameTraceChannel1,
        Self::GameTraceChannel2,
        Self::GameTraceChannel3,
        Self::GameTraceChannel4,
        Self::GameTraceChannel5,
        Self::GameTraceChannel6,
        Self::GameTraceChannel7,
        Self::GameTraceChannel8,
        Self::GameTraceChannel9,
        Self::GameTraceChannel10,
        Self::GameTraceChannel11,
        Self::GameTraceChannel12,
        Self::GameTraceChannel13,
        Self::GameTraceChannel14,
        Self::GameTraceChannel15,
        Self::GameTraceChannel16,
        Self::GameTraceChannel17,
        Self::GameTraceChannel18,
    ];

    /// Position of this channel in [`ALL`](Self::ALL).
    pub fn index(self) -> usize {
        self as usize
    }

    /// The channel at position `index`, if there is one.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The single-bit mask used for rapier interaction groups.
    pub fn bit(self) -> u32 {
        1u32 << self.index()
    }

    /// Canonical display name. Game trace channels are usually renamed by
    /// the host; see [`ChannelNames`].
    pub fn name(self) -> &'static str {
        CANONICAL_NAMES[self.index()]
    }

    /// Look up a channel by its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        CANONICAL_NAMES
            .iter()
            .position(|n| *n == name)
            .and_then(Self::from_index)
    }
}

impl std::fmt::Display for CollisionChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const CANONICAL_NAMES: [&str; CHANNEL_COUNT] = [
    "WorldStatic",
    "WorldDynamic",
    "Pawn",
    "Visibility",
    "Camera",
    "PhysicsBody",
    "Vehicle",
    "Destructible",
    "EngineTraceChannel1",
    "EngineTraceChannel2",
    "EngineTraceChannel3",
    "EngineTraceChannel4",
    "EngineTraceChannel5",
    "EngineTraceChannel6",
    "GameTraceChannel1",
    "GameTraceChannel2",
    "GameTraceChannel3",
    "GameTraceChannel4",
    "GameTraceChannel5",
    "GameTraceChannel6",
    "GameTraceChannel7",
    "GameTraceChannel8",
    "GameTraceChannel9",
    "GameTraceChannel10",
    "GameTraceChannel11",
    "GameTraceChannel12",
    "GameTraceChannel13",
    "GameTraceChannel14",
    "GameTraceChannel15",
    "GameTraceChannel16",
    "GameTraceChannel17",
    "GameTraceChannel18",
];

// ---------------------------------------------------------------------------
// ChannelNames
// ---------------------------------------------------------------------------

/// Display names for all channels, allowing projects to rename trace
/// channels (e.g. `GameTraceChannel1` -> `"Projectile"`).
///
/// Always holds exactly [`CHANNEL_COUNT`] names; a list of any other length
/// fails to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChannelNames")]
pub struct ChannelNames {
    names: Vec<String>,
}

#[derive(Deserialize)]
struct RawChannelNames {
    names: Vec<String>,
}

impl TryFrom<RawChannelNames> for ChannelNames {
    type Error = SceneError;

    fn try_from(raw: RawChannelNames) -> Result<Self, Self::Error> {
        Self::from_names(raw.names)
    }
}

impl ChannelNames {
    /// Build from a full list of names in channel index order.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::ChannelCount`] unless `names` has exactly
    /// [`CHANNEL_COUNT`] entries.
    pub fn from_names(names: Vec<String>) -> Result<Self, SceneError> {
        if names.len() != CHANNEL_COUNT {
            return Err(SceneError::ChannelCount {
                expected: CHANNEL_COUNT,
                actual: names.len(),
            });
        }
        Ok(Self { names })
    }

    /// Rename a channel.
    pub fn rename(&mut self, channel: CollisionChannel, name: impl Into<String>) {
        self.names[channel.index()] = name.into();
    }

    /// Display name of a channel.
    pub fn get(&self, channel: CollisionChannel) -> &str {
        &self.names[channel.index()]
    }

    /// All names, in channel index order.
    pub fn to_vec(&self) -> Vec<String> {
        self.names.clone()
    }
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            names: CANONICAL_NAMES.iter().map(|n| (*n).to_owned()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// How an object reacts to a channel. Only [`Response::Block`] stops a
/// single-hit line trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Response {
    Ignore,
    Overlap,
    Block,
}

/// A response for each of the 32 channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelResponses {
    responses: [Response; CHANNEL_COUNT],
}

impl ChannelResponses {
    /// The same response on every channel.
    pub fn all(response: Response) -> Self {
        Self {
            responses: [response; CHANNEL_COUNT],
        }
    }

    /// Builder-style override of one channel.
    pub fn with(mut self, channel: CollisionChannel, response: Response) -> Self {
        self.set(channel, response);
        self
    }

    pub fn set(&mut self, channel: CollisionChannel, response: Response) {
        self.responses[channel.index()] = response;
    }

    pub fn get(&self, channel: CollisionChannel) -> Response {
        self.responses[channel.index()]
    }

    /// Bitmask of the channels this set blocks.
    pub fn block_mask(&self) -> u32 {
        CollisionChannel::ALL
            .iter()
            .filter(|c| self.get(**c) == Response::Block)
            .fold(0u32, |mask, c| mask | c.bit())
    }
}

impl Default for ChannelResponses {
    /// Blocks every channel.
    fn default() -> Self {
        Self::all(Response::Block)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
