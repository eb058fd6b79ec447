//! Height-exaggeration bookkeeping: the pending/in-flight rescale slot and the
//! debounce that delays physics mesh updates.

/// Tracks the applied height scale and coalesces requests while one is in flight.
#[derive(Clone, Debug, PartialEq)]
pub struct RescaleState {
    height_scale: f32,
    pending: Option<f32>,
    in_flight: bool,
}

impl Default for RescaleState {
    fn default() -> Self {
        Self {
            height_scale: 1.0,
            pending: None,
            in_flight: false,
        }
    }
}

impl RescaleState {
    /// Latest scale that was started. Meshes reach it once the in-flight rescale lands.
    pub fn height_scale(&self) -> f32 {
        self.height_scale
    }

    /// Scale waiting for the current rescale (or mesh generation) to finish.
    pub fn pending(&self) -> Option<f32> {
        self.pending
    }

    /// Whether a rescale is being computed.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Handle a rescale request.
    ///
    /// Returns the scale to start applying now, if any. NaN is ignored. When
    /// the mesh is not ready or a rescale is in flight the request replaces
    /// whatever was pending.
    pub fn request(&mut self, scale: f32, mesh_ready: bool) -> Option<f32> {
        if scale.is_nan() {
            return None;
        }
        if !mesh_ready || self.in_flight {
            self.pending = Some(scale);
            return None;
        }
        self.pending = None;
        if scale == self.height_scale {
            return None;
        }
        self.height_scale = scale;
        self.in_flight = true;
        Some(scale)
    }

    /// Mark the in-flight rescale as applied.
    pub fn complete(&mut self) {
        self.in_flight = false;
    }

    /// Forget everything in progress. The applied scale is kept.
    pub fn reset(&mut self) {
        self.pending = None;
        self.in_flight = false;
    }
}

/// Holds a value until `delay` seconds pass without a newer one arriving.
#[derive(Clone, Debug)]
pub struct Debounced<T> {
    delay: f32,
    timer: f32,
    value: Option<T>,
}

impl<T> Debounced<T> {
    /// Create an empty debouncer.
    pub fn new(delay: f32) -> Self {
        Self {
            delay: delay.max(0.0),
            timer: 0.0,
            value: None,
        }
    }

    /// Store `value`, replacing any held one, and restart the delay.
    pub fn schedule(&mut self, value: T) {
        self.value = Some(value);
        self.timer = self.delay;
    }

    /// Whether a value is waiting.
    pub fn is_pending(&self) -> bool {
        self.value.is_some()
    }

    /// Advance by `dt` seconds. Returns the held value once the delay has elapsed.
    pub fn tick(&mut self, dt: f32) -> Option<T> {
        self.value.as_ref()?;
        if self.timer <= 0.0 {
            return self.value.take();
        }
        self.timer -= dt;
        None
    }

    /// Drop any held value.
    pub fn clear(&mut self) {
        self.value = None;
    }
}
