use std::cell::{Cell, RefCell};

use flow_ar::{
    Quaternion, Vector3,
    data_structures::{
        block::{Appearance, Block, BlockId, Rgb},
        instance::Instance,
        scene_graph::SceneGraph,
    },
    flow::{Out, Sandbox},
    pick::Ray,
    xr::{
        HitTestSource, Pose, ReferenceSpace, ReferenceSpaceKind, XrFrame, XrFuture,
        XrHitTestResult, XrSession,
    },
};
use futures_intrusive::channel::shared::{OneshotReceiver, OneshotSender, oneshot_channel};

pub(crate) const EPS: f32 = 1e-4;

pub(crate) fn assert_vec_eq(actual: Vector3<f32>, expected: (f32, f32, f32)) {
    let expected = Vector3::new(expected.0, expected.1, expected.2);
    let diff = actual - expected;
    assert!(
        diff.x.abs() < EPS && diff.y.abs() < EPS && diff.z.abs() < EPS,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

pub(crate) fn local_floor() -> ReferenceSpace {
    ReferenceSpace {
        kind: ReferenceSpaceKind::LocalFloor,
        handle: 1,
    }
}

/// Inserts a white block of the default size at `(x, y, z)`.
pub(crate) fn add_block(scene: &mut SceneGraph, x: f32, y: f32, z: f32) -> BlockId {
    let instance = Instance::from(Vector3::new(x, y, z)).with_uniform_scale(0.101);
    scene.insert(Block::new(instance, Appearance::Color(Rgb::WHITE)))
}

/// Straight down onto the block column at `(x, z)`.
pub(crate) fn ray_down(x: f32, z: f32) -> Ray {
    Ray::new(Vector3::new(x, 10.0, z), Vector3::new(0.0, -1.0, 0.0))
}

/// A ray that hits nothing near the origin.
pub(crate) fn ray_to_sky() -> Ray {
    Ray::new(Vector3::new(0.0, 10.0, 0.0), Vector3::new(0.0, 1.0, 0.0))
}

pub(crate) fn highlighted(scene: &SceneGraph) -> Vec<BlockId> {
    scene
        .blocks()
        .filter(|block| block.opacity < 1.0)
        .map(|block| block.id)
        .collect()
}

pub(crate) struct MockHit(pub Option<Vector3<f32>>);

impl XrHitTestResult for MockHit {
    fn pose(&self, space: &ReferenceSpace) -> Option<Pose> {
        assert_eq!(space.kind, ReferenceSpaceKind::LocalFloor);
        self.0.map(|position| Pose {
            position,
            orientation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        })
    }
}

/// Frame with a fixed list of surface hits. Counts hit-test queries.
pub(crate) struct MockFrame {
    base_space: ReferenceSpace,
    hits: Vec<Option<Vector3<f32>>>,
    queries: Cell<u32>,
}

impl MockFrame {
    pub fn new(hits: Vec<(f32, f32, f32)>) -> Self {
        Self::with_poses(
            hits.into_iter()
                .map(|(x, y, z)| Some(Vector3::new(x, y, z)))
                .collect(),
        )
    }

    pub fn with_poses(hits: Vec<Option<Vector3<f32>>>) -> Self {
        Self {
            base_space: local_floor(),
            hits,
            queries: Cell::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn queries(&self) -> u32 {
        self.queries.get()
    }
}

impl XrFrame for MockFrame {
    fn base_space(&self) -> &ReferenceSpace {
        &self.base_space
    }

    fn hit_test_results(&self, source: &HitTestSource) -> Vec<Box<dyn XrHitTestResult + '_>> {
        assert_eq!(source.space.kind, ReferenceSpaceKind::Viewer);
        self.queries.set(self.queries.get() + 1);
        self.hits
            .iter()
            .map(|&hit| Box::new(MockHit(hit)) as Box<dyn XrHitTestResult>)
            .collect()
    }
}

/// Session that answers every request right away.
#[derive(Default)]
pub(crate) struct MockSession {
    pub reject_hit_test: bool,
    pub requests: RefCell<Vec<String>>,
}

impl XrSession for MockSession {
    fn request_reference_space(&self, kind: ReferenceSpaceKind) -> XrFuture<ReferenceSpace> {
        self.requests
            .borrow_mut()
            .push(format!("space:{}", kind.as_str()));
        Box::pin(async move { Ok(ReferenceSpace { kind, handle: 7 }) })
    }

    fn request_hit_test_source(&self, space: &ReferenceSpace) -> XrFuture<HitTestSource> {
        self.requests
            .borrow_mut()
            .push(format!("hit-test:{}", space.kind.as_str()));
        let space = space.clone();
        let reject = self.reject_hit_test;
        Box::pin(async move {
            if reject {
                anyhow::bail!("hit-test is not supported on this device");
            }
            Ok(HitTestSource { space, handle: 8 })
        })
    }
}

/// Session whose reference space only resolves once the test sends it.
pub(crate) struct DeferredSession {
    space: RefCell<Option<OneshotReceiver<ReferenceSpace>>>,
}

impl DeferredSession {
    pub fn new() -> (Self, OneshotSender<ReferenceSpace>) {
        let (tx, rx) = oneshot_channel();
        let session = Self {
            space: RefCell::new(Some(rx)),
        };
        (session, tx)
    }
}

impl XrSession for DeferredSession {
    fn request_reference_space(&self, _kind: ReferenceSpaceKind) -> XrFuture<ReferenceSpace> {
        let rx = self.space.borrow_mut().take();
        Box::pin(async move {
            let rx = rx.ok_or_else(|| anyhow::anyhow!("reference space requested twice"))?;
            rx.receive()
                .await
                .ok_or_else(|| anyhow::anyhow!("session closed before the space was ready"))
        })
    }

    fn request_hit_test_source(&self, space: &ReferenceSpace) -> XrFuture<HitTestSource> {
        let space = space.clone();
        Box::pin(async move { Ok(HitTestSource { space, handle: 3 }) })
    }
}

/// Negotiates an AR session on `sandbox` with a [`MockSession`] and applies the result.
pub(crate) fn activate_session(sandbox: &mut Sandbox) {
    let out = sandbox.start_session(std::rc::Rc::new(MockSession::default()));
    let pending = match out {
        Out::FutCommand(pending) => pending,
        other => panic!("session start must yield a negotiation future, got {:?}", other),
    };
    for fut in pending {
        let command = futures::executor::block_on(fut).expect("negotiation failed");
        sandbox.dispatch(command);
    }
    assert!(sandbox.session().is_active());
}
