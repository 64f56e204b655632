//! Simulation session: the black hole plus the registry of active cameras.
//!
//! The registry only records ids. It never owns a camera, and cameras hold
//! no reference back to it. `create_camera` registers the camera and wraps
//! it in a `RegisteredCamera` handle that unregisters it when dropped.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

use kerr_env::CameraId;
use tracing::debug;

use crate::camera::{Camera, CameraSpec};
use crate::error::Result;
use crate::metric::BlackHole;

/// Thread-safe set of active camera ids.
#[derive(Debug, Default)]
pub struct CameraRegistry {
    cameras: Mutex<HashSet<CameraId>>,
}

impl CameraRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a camera. Returns `false` if it was already registered.
    pub fn register(&self, id: CameraId) -> bool {
        let inserted = self.lock().insert(id);
        if inserted {
            debug!("registered camera {}", id);
        }
        inserted
    }

    /// Forget a camera. Returns `false` if it was not registered.
    pub fn unregister(&self, id: CameraId) -> bool {
        let removed = self.lock().remove(&id);
        if removed {
            debug!("unregistered camera {}", id);
        }
        removed
    }

    pub fn contains(&self, id: CameraId) -> bool {
        self.lock().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the registered ids.
    pub fn ids(&self) -> Vec<CameraId> {
        self.lock().iter().copied().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<CameraId>> {
        // A panic while holding the lock cannot leave a HashSet half-updated
        self.cameras.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One simulation session around a single black hole.
#[derive(Debug)]
pub struct Universe {
    black_hole: BlackHole,
    registry: CameraRegistry,
}

impl Universe {
    pub fn new(black_hole: BlackHole) -> Self {
        Self {
            black_hole,
            registry: CameraRegistry::new(),
        }
    }

    /// Session around a black hole of spin `a`.
    pub fn with_spin(spin: f64) -> Result<Self> {
        Ok(Self::new(BlackHole::new(spin)?))
    }

    pub fn black_hole(&self) -> &BlackHole {
        &self.black_hole
    }

    pub fn registry(&self) -> &CameraRegistry {
        &self.registry
    }

    /// Build a camera around this session's black hole and register it.
    ///
    /// The camera stays registered for as long as the returned handle
    /// lives.
    pub fn create_camera<E>(&self, spec: CameraSpec, engine: E) -> Result<RegisteredCamera<'_, E>> {
        let camera = Camera::new(self.black_hole, spec, engine)?;
        self.registry.register(camera.id());
        Ok(RegisteredCamera {
            camera,
            registry: &self.registry,
        })
    }

    pub fn active_cameras(&self) -> usize {
        self.registry.len()
    }
}

/// A camera listed in a session's registry.
///
/// Dereferences to the `Camera`. Dropping the handle drops the camera and
/// removes its id from the registry.
#[derive(Debug)]
pub struct RegisteredCamera<'u, E> {
    camera: Camera<E>,
    registry: &'u CameraRegistry,
}

impl<E> Deref for RegisteredCamera<'_, E> {
    type Target = Camera<E>;

    fn deref(&self) -> &Camera<E> {
        &self.camera
    }
}

impl<E> DerefMut for RegisteredCamera<'_, E> {
    fn deref_mut(&mut self) -> &mut Camera<E> {
        &mut self.camera
    }
}

impl<E> Drop for RegisteredCamera<'_, E> {
    fn drop(&mut self) {
        self.registry.unregister(self.camera.id());
    }
}
