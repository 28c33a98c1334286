//! Seams to the host application.
//!
//! The controller asks a [`HostEnvironment`] whether a run may proceed,
//! where the camera is, and which channel and profile names exist. Display
//! surfaces come from a [`SurfaceProvider`], which is given every surface
//! back once no job can still upload into it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use hitscope_scene::world::CollisionWorld;

use crate::pose::CameraPose;
use crate::surface::DisplaySurface;

// ---------------------------------------------------------------------------
// HostEnvironment
// ---------------------------------------------------------------------------

/// Read-only view of the host world.
pub trait HostEnvironment {
    /// Whether the host world is in a state where rendering makes sense.
    /// Launches are skipped while this is `false`.
    fn is_runnable(&self) -> bool;

    /// The pose of the active player camera, if there is one.
    fn active_camera_pose(&self) -> Option<CameraPose>;

    /// A pose to use when no active camera exists, such as an editor
    /// viewport.
    fn fallback_view_pose(&self) -> Option<CameraPose> {
        None
    }

    /// Channel display names, in channel index order.
    fn collision_channels(&self) -> Vec<String>;

    /// Profile names, in registry order.
    fn collision_profiles(&self) -> Vec<String>;
}

impl<H: HostEnvironment + ?Sized> HostEnvironment for Arc<H> {
    fn is_runnable(&self) -> bool {
        (**self).is_runnable()
    }

    fn active_camera_pose(&self) -> Option<CameraPose> {
        (**self).active_camera_pose()
    }

    fn fallback_view_pose(&self) -> Option<CameraPose> {
        (**self).fallback_view_pose()
    }

    fn collision_channels(&self) -> Vec<String> {
        (**self).collision_channels()
    }

    fn collision_profiles(&self) -> Vec<String> {
        (**self).collision_profiles()
    }
}

/// A host with fixed name lists and a camera that can be moved from any
/// thread holding a shared reference.
#[derive(Debug)]
pub struct StaticHost {
    runnable: AtomicBool,
    camera: Mutex<Option<CameraPose>>,
    fallback: Mutex<Option<CameraPose>>,
    channels: Vec<String>,
    profiles: Vec<String>,
}

impl StaticHost {
    pub fn new(channels: Vec<String>, profiles: Vec<String>, camera: Option<CameraPose>) -> Self {
        Self {
            runnable: AtomicBool::new(true),
            camera: Mutex::new(camera),
            fallback: Mutex::new(None),
            channels,
            profiles,
        }
    }

    /// Take the channel and profile names from a collision world.
    pub fn from_world(world: &CollisionWorld, camera: Option<CameraPose>) -> Self {
        Self::new(
            world.channel_names().to_vec(),
            world.profiles().names(),
            camera,
        )
    }

    pub fn set_runnable(&self, runnable: bool) {
        self.runnable.store(runnable, Ordering::SeqCst);
    }

    pub fn set_camera(&self, camera: Option<CameraPose>) {
        *self.camera.lock().unwrap_or_else(PoisonError::into_inner) = camera;
    }

    pub fn set_fallback_view(&self, pose: Option<CameraPose>) {
        *self.fallback.lock().unwrap_or_else(PoisonError::into_inner) = pose;
    }
}

impl HostEnvironment for StaticHost {
    fn is_runnable(&self) -> bool {
        self.runnable.load(Ordering::SeqCst)
    }

    fn active_camera_pose(&self) -> Option<CameraPose> {
        *self.camera.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fallback_view_pose(&self) -> Option<CameraPose> {
        *self.fallback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn collision_channels(&self) -> Vec<String> {
        self.channels.clone()
    }

    fn collision_profiles(&self) -> Vec<String> {
        self.profiles.clone()
    }
}

// ---------------------------------------------------------------------------
// SurfaceProvider
// ---------------------------------------------------------------------------

/// Source of display surfaces.
pub trait SurfaceProvider {
    /// Create or look up the surface for a new run. `None` leaves the
    /// controller idle for this tick.
    fn acquire_surface(&mut self) -> Option<Arc<dyn DisplaySurface>>;

    /// Called once the run using `surface` has fully stopped.
    fn release_surface(&mut self, _surface: Arc<dyn DisplaySurface>) {}
}

/// Hands out the same surface for every run and counts acquisitions and
/// releases.
pub struct StaticSurfaceProvider {
    surface: Option<Arc<dyn DisplaySurface>>,
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl StaticSurfaceProvider {
    pub fn new(surface: Arc<dyn DisplaySurface>) -> Self {
        Self {
            surface: Some(surface),
            acquired: Arc::default(),
            released: Arc::default(),
        }
    }

    /// A provider that never has a surface.
    pub fn unavailable() -> Self {
        Self {
            surface: None,
            acquired: Arc::default(),
            released: Arc::default(),
        }
    }

    /// Shared counters of `(acquired, released)` that stay readable after
    /// the provider is handed to a controller.
    pub fn counters(&self) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (self.acquired.clone(), self.released.clone())
    }
}

impl SurfaceProvider for StaticSurfaceProvider {
    fn acquire_surface(&mut self) -> Option<Arc<dyn DisplaySurface>> {
        let surface = self.surface.clone()?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Some(surface)
    }

    fn release_surface(&mut self, _surface: Arc<dyn DisplaySurface>) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
