//! Interface to the host's immersive session.
//!
//! The host (a WebXR page, a native AR runtime or a test) implements these
//! traits. Reference spaces and hit-test sources are opaque handles: the
//! sandbox only stores them and hands them back to the host.

use std::pin::Pin;

use cgmath::{Quaternion, Vector3};
use serde::Serialize;

/// Future returned by session negotiation requests.
pub type XrFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>>>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceSpaceKind {
    Viewer,
    LocalFloor,
}

impl ReferenceSpaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceSpaceKind::Viewer => "viewer",
            ReferenceSpaceKind::LocalFloor => "local-floor",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceSpace {
    pub kind: ReferenceSpaceKind,
    /// Host-side handle.
    pub handle: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HitTestSource {
    /// Space the hit-test rays are cast from.
    pub space: ReferenceSpace,
    /// Host-side handle.
    pub handle: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub orientation: Quaternion<f32>,
}

/// A running immersive session.
pub trait XrSession {
    fn request_reference_space(&self, kind: ReferenceSpaceKind) -> XrFuture<ReferenceSpace>;

    fn request_hit_test_source(&self, space: &ReferenceSpace) -> XrFuture<HitTestSource>;
}

/// One hit of a hit-test source against the real world.
pub trait XrHitTestResult {
    /// Pose of the hit relative to `space`, `None` if the host can't relate them.
    fn pose(&self, space: &ReferenceSpace) -> Option<Pose>;
}

/// The frame currently being rendered.
pub trait XrFrame {
    /// Reference space the scene is rendered in.
    fn base_space(&self) -> &ReferenceSpace;

    /// Hit-test results for this frame, highest priority first.
    fn hit_test_results(&self, source: &HitTestSource) -> Vec<Box<dyn XrHitTestResult + '_>>;
}
