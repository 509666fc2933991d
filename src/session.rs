//! AR session lifecycle.
//!
//! Two states: `Inactive` and `ArActive`. Entering `ArActive` requires an
//! asynchronous negotiation with the host (a `viewer` reference space, then a
//! hit-test source bound to it). Until that resolves the session stays
//! `Inactive` and surface hit-testing is simply unavailable.
//!
//! Every call to [`ArSession::begin`] or [`ArSession::end`] bumps an epoch.
//! Negotiation results carry the epoch they were started with and are dropped
//! if the session ended (or restarted) in the meantime.

use std::{fmt, rc::Rc};

use crate::{
    flow::Command,
    xr::{HitTestSource, ReferenceSpace, ReferenceSpaceKind, XrSession},
};

/// Page-wide mode flag. The host reflects it as a class on the document body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UiMode {
    #[default]
    Normal,
    Ar,
}

impl UiMode {
    pub fn css_class(&self) -> &'static str {
        match self {
            UiMode::Normal => "normal-session",
            UiMode::Ar => "ar-session",
        }
    }

    /// Classes the host clears when switching to this mode. `vr-session` is
    /// never set by the sandbox but always cleared.
    pub fn stale_css_classes(&self) -> [&'static str; 2] {
        match self {
            UiMode::Normal => ["vr-session", "ar-session"],
            UiMode::Ar => ["normal-session", "vr-session"],
        }
    }
}

impl fmt::Display for UiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_class())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Inactive,
    ArActive {
        viewer_space: ReferenceSpace,
        hit_test_source: HitTestSource,
    },
}

#[derive(Debug, Default)]
pub struct ArSession {
    state: SessionState,
    epoch: u64,
    ui_mode: UiMode,
}

impl ArSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::ArActive { .. })
    }

    pub fn ui_mode(&self) -> UiMode {
        self.ui_mode
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn hit_test_source(&self) -> Option<&HitTestSource> {
        match &self.state {
            SessionState::ArActive {
                hit_test_source, ..
            } => Some(hit_test_source),
            SessionState::Inactive => None,
        }
    }

    /// Starts negotiating with `session`.
    ///
    /// The returned future resolves into the command that activates the
    /// session, or `None` if the host rejected one of the requests.
    pub fn begin(
        &mut self,
        session: Rc<dyn XrSession>,
    ) -> impl Future<Output = Option<Command>> + use<> {
        self.epoch += 1;
        let epoch = self.epoch;
        log::info!("AR session started, negotiating (epoch {})", epoch);
        async move {
            let negotiated = async {
                let viewer_space = session
                    .request_reference_space(ReferenceSpaceKind::Viewer)
                    .await?;
                let hit_test_source = session.request_hit_test_source(&viewer_space).await?;
                anyhow::Ok((viewer_space, hit_test_source))
            };
            match negotiated.await {
                Ok((viewer_space, hit_test_source)) => Some(Command::SessionReady {
                    epoch,
                    viewer_space,
                    hit_test_source,
                }),
                Err(e) => {
                    log::error!("AR session negotiation failed (epoch {}): {:#}", epoch, e);
                    None
                }
            }
        }
    }

    /// Enters `ArActive` with the negotiated handles.
    ///
    /// Returns `false` when the result belongs to an outdated attempt.
    pub fn activate(
        &mut self,
        epoch: u64,
        viewer_space: ReferenceSpace,
        hit_test_source: HitTestSource,
    ) -> bool {
        if epoch != self.epoch {
            log::warn!(
                "Dropping hit-test source of epoch {}, the current session epoch is {}",
                epoch,
                self.epoch
            );
            return false;
        }
        log::info!("AR session active, hit-testing enabled");
        self.state = SessionState::ArActive {
            viewer_space,
            hit_test_source,
        };
        self.ui_mode = UiMode::Ar;
        true
    }

    pub fn end(&mut self) {
        self.epoch += 1;
        if self.is_active() {
            log::info!("AR session ended");
        }
        self.state = SessionState::Inactive;
        self.ui_mode = UiMode::Normal;
    }
}
