//! Flow control: the sandbox state and its command loop.
//!
//! The [`Sandbox`] is the single owner of all sandbox state. The host drives
//! it in two ways:
//!
//! - per frame: set the ray ([`Sandbox::aim`]) and call [`Sandbox::tick`]
//! - per user action: push a [`Command`] through [`Sandbox::commands`] or
//!   apply it right away with [`Sandbox::dispatch`]
//!
//! Asynchronous work (session negotiation) is returned as an [`Out`] value.
//! The [`App`] resolves those futures on the platform's executor and feeds
//! the resulting commands back into the queue.
//!
//! # Lifecycle Flow
//!
//! 1. Host input handlers queue commands (place, delete, picker changes, vr events)
//! 2. `tick` drains the queue in order
//! 3. `tick` refreshes the raycaster and arbitrates block vs. surface hits
//! 4. The host drains the scene change journal and renders

use std::{pin::Pin, rc::Rc};

use cgmath::Vector3;
use futures::channel::mpsc;

use crate::{
    context::Context,
    data_structures::{
        block::{BlockId, Rgb},
        scene_graph::SceneGraph,
    },
    manager::{AppearanceSelection, BlockManager},
    pick::Ray,
    placement::{PlacementController, Tick},
    session::ArSession,
    xr::{HitTestSource, ReferenceSpace, XrFrame, XrSession},
};

/// Discrete user and host actions.
#[derive(Debug)]
pub enum Command {
    /// Place a block at the cursor.
    Place,
    /// Delete the current delete candidate, if any.
    Delete,
    SelectTexture(String),
    SelectColor(Rgb),
    /// The host entered an immersive session; `ar_mode` tells AR from VR.
    EnterVr { ar_mode: bool },
    ExitVr,
    SessionEnded,
    /// Negotiation for the session of `epoch` finished.
    SessionReady {
        epoch: u64,
        viewer_space: ReferenceSpace,
        hit_test_source: HitTestSource,
    },
}

/// Future that yields a command once resolved, or nothing.
pub type CommandFuture = Pin<Box<dyn Future<Output = Option<Command>>>>;

///
/// Output of every operation that may need the platform's help.
///
/// `Out::FutCommand` holds futures that resolve into commands. The caller is
/// responsible for awaiting them and feeding the commands back.
///
/// `Out::Configure` modifies the [`Context`], e.g. to change the grid size.
///
/// `Empty` is the default output used when nothing needs to be handled.
///
pub enum Out {
    FutCommand(Vec<CommandFuture>),
    Configure(Box<dyn FnOnce(&mut Context)>),
    Empty,
}

impl Default for Out {
    fn default() -> Self {
        Self::Empty
    }
}

impl std::fmt::Debug for Out {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FutCommand(futures) => write!(f, "FutCommand({} futures)", futures.len()),
            Self::Configure(_) => f.write_str("Configure(|&mut Context| -> {...})"),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

/// Sender half of the sandbox's command queue.
pub type CommandSender = mpsc::UnboundedSender<Command>;

#[derive(Debug)]
pub struct Sandbox {
    ctx: Context,
    scene: SceneGraph,
    placement: PlacementController,
    manager: BlockManager,
    session: ArSession,
    sender: CommandSender,
    receiver: mpsc::UnboundedReceiver<Command>,
}

impl Sandbox {
    pub fn new(ctx: Context) -> Self {
        let (sender, receiver) = mpsc::unbounded();
        let selection = AppearanceSelection::new(ctx.color_block_texture.clone(), Rgb::WHITE);
        Self {
            ctx,
            scene: SceneGraph::new(),
            placement: PlacementController::new(),
            manager: BlockManager::new(selection),
            session: ArSession::new(),
            sender,
            receiver,
        }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn placement(&self) -> &PlacementController {
        &self.placement
    }

    pub fn session(&self) -> &ArSession {
        &self.session
    }

    pub fn selection(&self) -> &AppearanceSelection {
        self.manager.selection()
    }

    /// A sender for host input handlers. Queued commands run on the next tick.
    pub fn commands(&self) -> CommandSender {
        self.sender.clone()
    }

    /// Points the raycaster for the coming frames.
    pub fn aim(&mut self, ray: Ray) {
        self.placement.raycaster_mut().set_ray(ray);
    }

    /// Overrides the cursor rotation (Euler degrees) used for new blocks.
    pub fn set_cursor_rotation(&mut self, rotation: Vector3<f32>) {
        self.placement.cursor_mut().rotation = rotation;
    }

    pub fn configure(&mut self, f: impl FnOnce(&mut Context)) {
        f(&mut self.ctx);
    }

    /// Starts negotiating an AR session with the host.
    ///
    /// Commands queued before the call are applied first, so a queued
    /// `SessionEnded` never overtakes the new negotiation.
    pub fn start_session(&mut self, session: Rc<dyn XrSession>) -> Out {
        self.drain_commands();
        let negotiation = self.session.begin(session);
        Out::FutCommand(vec![Box::pin(negotiation)])
    }

    /// Applies a command immediately.
    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::Place => {
                let cursor = self.placement.cursor().clone();
                self.manager.put_block(
                    &self.ctx,
                    &mut self.scene,
                    cursor.position,
                    cursor.rotation,
                );
            }
            Command::Delete => {
                let target = self.placement.delete_target();
                if let Some(block) = self.manager.delete_block(&mut self.scene, target) {
                    self.placement.forget_delete_target(block.id);
                }
            }
            Command::SelectTexture(texture) => {
                self.manager.selection_mut().select_texture(texture);
            }
            Command::SelectColor(color) => {
                self.manager.selection_mut().select_color(&self.ctx, color);
            }
            Command::EnterVr { ar_mode } => self.scene.enter_vr(ar_mode),
            Command::ExitVr => self.scene.exit_vr(),
            Command::SessionEnded => self.session.end(),
            Command::SessionReady {
                epoch,
                viewer_space,
                hit_test_source,
            } => {
                self.session.activate(epoch, viewer_space, hit_test_source);
            }
        }
    }

    /// Runs one frame: drains queued commands, then updates the cursor.
    ///
    /// `frame` is `None` while the host has no render frame, in which case
    /// only the queue is processed.
    pub fn tick(&mut self, frame: Option<&dyn XrFrame>) -> Tick {
        self.drain_commands();
        self.placement
            .tick(&self.ctx, &mut self.scene, &self.session, frame)
    }

    fn drain_commands(&mut self) {
        while let Ok(Some(command)) = self.receiver.try_next() {
            self.dispatch(command);
        }
    }

    /// Removes a specific block, bypassing the delete candidate.
    pub fn remove_block(&mut self, id: BlockId) -> bool {
        let removed = self.manager.delete_block(&mut self.scene, Some(id));
        if removed.is_some() {
            self.placement.forget_delete_target(id);
        }
        removed.is_some()
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(Context::default())
    }
}

/// Drives a [`Sandbox`] and resolves its asynchronous outputs.
///
/// Futures from [`Out::FutCommand`] run next to the frame loop, never inside
/// it: on native they are spawned on a [`tokio::task::LocalSet`] that every
/// [`App::tick`] advances without blocking, on wasm they go to the browser's
/// microtask queue. Their commands reach the sandbox through the queue.
pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg(not(target_arch = "wasm32"))]
    local_tasks: tokio::task::LocalSet,
    sandbox: Sandbox,
}

impl App {
    pub fn new(ctx: Context) -> anyhow::Result<Self> {
        init_logger();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            #[cfg(not(target_arch = "wasm32"))]
            local_tasks: tokio::task::LocalSet::new(),
            sandbox: Sandbox::new(ctx),
        })
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn sandbox_mut(&mut self) -> &mut Sandbox {
        &mut self.sandbox
    }

    /// Starts the session negotiation and returns right away.
    pub fn start_session(&mut self, session: Rc<dyn XrSession>) {
        let out = self.sandbox.start_session(session);
        self.handle_out(out);
    }

    pub fn dispatch(&mut self, command: Command) {
        self.sandbox.dispatch(command);
    }

    /// Advances pending negotiations by one step, then runs the sandbox frame.
    pub fn tick(&mut self, frame: Option<&dyn XrFrame>) -> Tick {
        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime
            .block_on(self.local_tasks.run_until(tokio::task::yield_now()));
        self.sandbox.tick(frame)
    }

    pub fn handle_out(&mut self, out: Out) {
        match out {
            Out::FutCommand(futures) => {
                let forward = forward_commands(futures, self.sandbox.commands());
                #[cfg(not(target_arch = "wasm32"))]
                self.local_tasks.spawn_local(forward);

                #[cfg(target_arch = "wasm32")]
                wasm_bindgen_futures::spawn_local(forward);
            }
            Out::Configure(f) => self.sandbox.configure(f),
            Out::Empty => (),
        }
    }
}

/// Awaits `futures` and queues the commands they resolve into.
async fn forward_commands(futures: Vec<CommandFuture>, sender: CommandSender) {
    let resolved = futures::future::join_all(futures).await;
    for command in resolved.into_iter().flatten() {
        if let Err(err) = sender.unbounded_send(command) {
            log::error!("Command queue closed: {}", err);
        }
    }
}

/// Installs the platform logger. Safe to call more than once.
pub fn init_logger() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            log::debug!("Logger already initialized: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            log::debug!("Logger already initialized: {}", e);
        }
    }
}
