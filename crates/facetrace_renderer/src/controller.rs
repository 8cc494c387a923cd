//! Progressive render loop on a background thread.
//!
//! The interactive side mutates camera and inputs through
//! [`RenderController::with_state`] and asks for a new image with
//! [`RenderController::request_render`]. The render thread polls for that
//! request, renders one pass under the state lock, and goes idle again.
//! [`RenderController::request_next_pass`] asks for another pass on top of
//! the current image, up to `max_passes`.
//!
//! Pass bookkeeping lives outside the lock in [`PassState`], so requests
//! never wait for a render in flight.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use facetrace_core::{Mesh, Texture};
use facetrace_math::Quat;
use parking_lot::Mutex;

use crate::buffer::RenderBuffer;
use crate::config::RenderConfig;
use crate::renderer::Renderer;
use crate::{BuildError, RenderError, RenderResult};

/// Sleep between refresh checks while idle.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const REFRESH_BIT: u64 = 1 << 63;
const GENERATION_SHIFT: u32 = 32;
const GENERATION_MASK: u64 = 0x7fff_ffff;
const PASS_MASK: u64 = 0xffff_ffff;

/// Snapshot of the packed pass state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSnapshot(u64);

impl PassSnapshot {
    fn pack(refresh: bool, generation: u32, pass: u32) -> Self {
        let refresh = if refresh { REFRESH_BIT } else { 0 };
        let generation = (generation as u64 & GENERATION_MASK) << GENERATION_SHIFT;
        Self(refresh | generation | pass as u64)
    }

    /// A pass has been requested and not yet rendered.
    pub fn refresh(self) -> bool {
        self.0 & REFRESH_BIT != 0
    }

    /// Passes completed since the last request.
    pub fn pass(self) -> u32 {
        (self.0 & PASS_MASK) as u32
    }

    /// Count of render requests, wrapping at 31 bits.
    pub fn generation(self) -> u32 {
        ((self.0 >> GENERATION_SHIFT) & GENERATION_MASK) as u32
    }
}

/// Pass counter, request generation and refresh flag in one atomic word.
///
/// Every transition is a single atomic update, so a request can never be
/// lost between the render thread reading the counter and committing a
/// finished pass.
#[derive(Debug, Default)]
pub struct PassState(AtomicU64);

impl PassState {
    pub fn load(&self) -> PassSnapshot {
        PassSnapshot(self.0.load(Ordering::Acquire))
    }

    /// Reset the pass counter and raise refresh.
    pub fn request(&self) -> PassSnapshot {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let old = PassSnapshot(current);
            let new = PassSnapshot::pack(true, old.generation().wrapping_add(1), 0);
            match self
                .0
                .compare_exchange_weak(current, new.0, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return new,
                Err(actual) => current = actual,
            }
        }
    }

    /// Raise refresh for one more pass without resetting the counter.
    pub fn raise(&self) -> PassSnapshot {
        PassSnapshot(self.0.fetch_or(REFRESH_BIT, Ordering::AcqRel) | REFRESH_BIT)
    }

    /// Record a finished pass rendered from `observed` and lower refresh.
    ///
    /// Returns `false` without touching the state if a request arrived
    /// since `observed` was taken.
    pub fn commit(&self, observed: PassSnapshot) -> bool {
        let next = observed.pass().saturating_add(1);
        let new = PassSnapshot::pack(false, observed.generation(), next);
        self.swap_from(observed, new)
    }

    /// Lower refresh without advancing the counter. Fails like [`Self::commit`].
    pub fn clear_refresh(&self, observed: PassSnapshot) -> bool {
        let new = PassSnapshot::pack(false, observed.generation(), observed.pass());
        self.swap_from(observed, new)
    }

    fn swap_from(&self, observed: PassSnapshot, new: PassSnapshot) -> bool {
        self.0
            .compare_exchange(observed.0, new.0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Everything guarded by the controller's lock.
pub struct RenderState {
    pub renderer: Renderer,
    pub config: RenderConfig,
    pub buffer: RenderBuffer,
    pub orientation: Quat,
}

/// What the render thread is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Rendering,
    Quitting,
}

struct Shared {
    state: Mutex<RenderState>,
    passes: PassState,
    quit: AtomicBool,
    rendering: AtomicBool,
}

/// Owns the render thread and the state it shares with the caller.
pub struct RenderController {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl RenderController {
    /// Start the render thread. Nothing renders until [`Self::request_render`].
    pub fn spawn(
        renderer: Renderer,
        config: RenderConfig,
        poll_interval: Duration,
    ) -> RenderResult<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            state: Mutex::new(RenderState {
                renderer,
                buffer: RenderBuffer::new(config.width, config.height),
                config,
                orientation: Quat::IDENTITY,
            }),
            passes: PassState::default(),
            quit: AtomicBool::new(false),
            rendering: AtomicBool::new(false),
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("facetrace-render".to_string())
            .spawn(move || render_loop(&worker, poll_interval))?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Restart progressive rendering from pass 0. Never blocks.
    pub fn request_render(&self) {
        let snapshot = self.shared.passes.request();
        log::trace!("Render requested (generation {})", snapshot.generation());
    }

    /// Render one more pass over the current image. Never blocks.
    ///
    /// The pass counter keeps counting, so once `max_passes` is reached the
    /// request is dropped by the render thread.
    pub fn request_next_pass(&self) {
        let snapshot = self.shared.passes.raise();
        log::trace!("Pass {} requested", snapshot.pass());
    }

    /// Request a render and keep asking for passes until `max_passes` are
    /// done, a pass fails or `timeout` runs out. Returns the passes done.
    pub fn refine(&self, timeout: Duration) -> u32 {
        let deadline = Instant::now() + timeout;
        let max_passes = self.with_state(|state| state.config.max_passes);

        self.request_render();
        let mut done = 0;
        while self.wait_idle(deadline) {
            let pass = self.pass();
            if pass >= max_passes || pass <= done {
                return pass;
            }
            done = pass;
            self.request_next_pass();
        }
        self.pass()
    }

    fn wait_idle(&self, deadline: Instant) -> bool {
        while self.refresh_pending() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Ask the render thread to exit after any pass in flight.
    pub fn request_quit(&self) {
        self.shared.quit.store(true, Ordering::Release);
    }

    /// Quit and wait for the render thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.request_quit();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Render thread panicked");
            }
        }
    }

    /// Run `f` with the state lock held.
    ///
    /// Blocks while a pass is rendering, so the buffer seen here is always
    /// a whole pass.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut RenderState) -> R) -> R {
        f(&mut self.shared.state.lock())
    }

    pub fn set_mesh(&self, mesh: Arc<Mesh>) {
        self.with_state(|state| state.renderer.set_mesh(mesh));
    }

    pub fn set_texture(&self, texture: Arc<Texture>) {
        self.with_state(|state| state.renderer.set_texture(texture));
    }

    pub fn build_accelerator(&self) -> Result<(), BuildError> {
        self.with_state(|state| state.renderer.build_accelerator())
    }

    /// Edit the config, resize the buffer to match and request a render.
    ///
    /// An edit that fails validation is discarded.
    pub fn update_config(&self, edit: impl FnOnce(&mut RenderConfig)) -> RenderResult<()> {
        self.with_state(|state| {
            let mut config = state.config.clone();
            edit(&mut config);
            config.validate()?;

            if state.buffer.dimensions() != (config.width, config.height) {
                state.buffer.resize(config.width, config.height);
            }
            state.config = config;
            Ok::<_, RenderError>(())
        })?;
        self.request_render();
        Ok(())
    }

    /// Replace the trackball orientation and request a render.
    pub fn set_orientation(&self, orientation: Quat) {
        self.with_state(|state| state.orientation = orientation);
        self.request_render();
    }

    /// Passes completed since the last request.
    pub fn pass(&self) -> u32 {
        self.shared.passes.load().pass()
    }

    /// True while a requested pass has not been rendered.
    pub fn refresh_pending(&self) -> bool {
        self.shared.passes.load().refresh()
    }

    /// Block until at least `passes` passes are done. False on timeout.
    pub fn wait_for_pass(&self, passes: u32, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pass() < passes {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    pub fn state(&self) -> ControllerState {
        if self.shared.quit.load(Ordering::Acquire) {
            ControllerState::Quitting
        } else if self.shared.rendering.load(Ordering::Acquire) {
            ControllerState::Rendering
        } else {
            ControllerState::Idle
        }
    }
}

impl Drop for RenderController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn render_loop(shared: &Shared, poll_interval: Duration) {
    log::debug!("Render thread started");

    while !shared.quit.load(Ordering::Acquire) {
        if !shared.passes.load().refresh() {
            thread::sleep(poll_interval);
            continue;
        }

        let mut state = shared.state.lock();

        // Taken under the lock so the config copy matches this request
        let observed = shared.passes.load();
        if !observed.refresh() {
            continue;
        }
        if observed.pass() >= state.config.max_passes {
            shared.passes.clear_refresh(observed);
            continue;
        }

        state.config.pass = observed.pass();
        let config = state.config.clone();

        shared.rendering.store(true, Ordering::Release);
        let RenderState {
            renderer,
            buffer,
            orientation,
            ..
        } = &mut *state;
        let result = renderer.render_one_pass(buffer, *orientation, &config);
        shared.rendering.store(false, Ordering::Release);
        drop(state);

        match result {
            Ok(_) => {
                if !shared.passes.commit(observed) {
                    log::debug!("Render requested during pass {}, restarting", config.pass);
                }
            }
            Err(err) => {
                log::warn!("Render pass {} failed: {err}", config.pass);
                shared.passes.clear_refresh(observed);
            }
        }
    }

    log::debug!("Render thread stopped");
}
