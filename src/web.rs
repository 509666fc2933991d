//! Browser bindings.
//!
//! The page keeps the renderer and hands the WebXR objects over as they
//! appear: the `XRSession` on `sessionstart`, the renderer's reference space
//! once, and the `XRFrame` every animation frame. Negotiation and hit-testing
//! go through those objects from here, so the page never calls
//! `requestHitTestSource` or `getHitTestResults` itself.
//!
//! JS objects never cross into the sandbox. They live in a [`JsHandles`]
//! table and the sandbox only sees their indices.

use std::{cell::RefCell, rc::Rc};

use anyhow::anyhow;
use cgmath::{Quaternion, Vector3};
use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::{JsCast, prelude::*};
use wasm_bindgen_futures::JsFuture;

use crate::{
    context::Context,
    data_structures::{block::Rgb, scene_graph::ArVisibility},
    flow::{App, Command},
    pick::Ray,
    xr::{
        HitTestSource, Pose, ReferenceSpace, ReferenceSpaceKind, XrFrame, XrFuture,
        XrHitTestResult, XrSession,
    },
};

fn to_js(e: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", e))
}

fn js_err(e: JsValue) -> anyhow::Error {
    anyhow!("{:?}", e)
}

fn get(target: &JsValue, key: &str) -> anyhow::Result<JsValue> {
    Reflect::get(target, &JsValue::from_str(key)).map_err(js_err)
}

fn get_f32(target: &JsValue, key: &str) -> anyhow::Result<f32> {
    get(target, key)?
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| anyhow!("{} is not a number", key))
}

/// Calls `target[name](...args)`.
fn call_method(target: &JsValue, name: &str, args: &[JsValue]) -> anyhow::Result<JsValue> {
    let method: Function = get(target, name)?
        .dyn_into()
        .map_err(|_| anyhow!("{} is not a function", name))?;
    let args: Array = args.iter().collect();
    method.apply(target, &args).map_err(js_err)
}

/// JS objects the sandbox refers to by handle.
#[derive(Default)]
struct JsHandles {
    values: Vec<JsValue>,
}

impl JsHandles {
    fn insert(&mut self, value: JsValue) -> u32 {
        self.values.push(value);
        (self.values.len() - 1) as u32
    }

    fn get(&self, handle: u32) -> anyhow::Result<JsValue> {
        self.values
            .get(handle as usize)
            .cloned()
            .ok_or_else(|| anyhow!("unknown JS handle {}", handle))
    }
}

type SharedHandles = Rc<RefCell<JsHandles>>;

/// An `XRSession`.
struct JsSession {
    session: JsValue,
    handles: SharedHandles,
}

impl JsSession {
    /// Calls a promise-returning session method, awaits it and stores the result.
    fn request(&self, method: &'static str, arg: anyhow::Result<JsValue>) -> XrFuture<u32> {
        let promise = arg.and_then(|arg| {
            call_method(&self.session, method, &[arg])?
                .dyn_into::<Promise>()
                .map_err(|_| anyhow!("{} did not return a promise", method))
        });
        let handles = self.handles.clone();
        Box::pin(async move {
            let value = JsFuture::from(promise?)
                .await
                .map_err(|e| anyhow!("{} was rejected: {:?}", method, e))?;
            Ok(handles.borrow_mut().insert(value))
        })
    }
}

impl XrSession for JsSession {
    fn request_reference_space(&self, kind: ReferenceSpaceKind) -> XrFuture<ReferenceSpace> {
        let handle = self.request(
            "requestReferenceSpace",
            Ok(JsValue::from_str(kind.as_str())),
        );
        Box::pin(async move {
            Ok(ReferenceSpace {
                kind,
                handle: handle.await?,
            })
        })
    }

    fn request_hit_test_source(&self, space: &ReferenceSpace) -> XrFuture<HitTestSource> {
        let options = self.handles.borrow().get(space.handle).and_then(|js_space| {
            let options = Object::new();
            Reflect::set(&options, &JsValue::from_str("space"), &js_space).map_err(js_err)?;
            Ok(JsValue::from(options))
        });
        let handle = self.request("requestHitTestSource", options);
        let space = space.clone();
        Box::pin(async move {
            Ok(HitTestSource {
                space,
                handle: handle.await?,
            })
        })
    }
}

/// An `XRHitTestResult`.
struct JsHitResult<'a> {
    result: JsValue,
    handles: &'a JsHandles,
}

impl JsHitResult<'_> {
    fn try_pose(&self, space: &ReferenceSpace) -> anyhow::Result<Option<Pose>> {
        let js_space = self.handles.get(space.handle)?;
        let pose = call_method(&self.result, "getPose", &[js_space])?;
        if pose.is_null() || pose.is_undefined() {
            return Ok(None);
        }
        let transform = get(&pose, "transform")?;
        let p = get(&transform, "position")?;
        let o = get(&transform, "orientation")?;
        Ok(Some(Pose {
            position: Vector3::new(get_f32(&p, "x")?, get_f32(&p, "y")?, get_f32(&p, "z")?),
            orientation: Quaternion::new(
                get_f32(&o, "w")?,
                get_f32(&o, "x")?,
                get_f32(&o, "y")?,
                get_f32(&o, "z")?,
            ),
        }))
    }
}

impl XrHitTestResult for JsHitResult<'_> {
    fn pose(&self, space: &ReferenceSpace) -> Option<Pose> {
        self.try_pose(space).unwrap_or_else(|e| {
            log::error!("Cannot read hit-test pose: {:#}", e);
            None
        })
    }
}

/// An `XRFrame`. Hit-test results are only requested when the sandbox asks.
struct JsFrame<'a> {
    frame: JsValue,
    base_space: ReferenceSpace,
    handles: &'a JsHandles,
}

impl JsFrame<'_> {
    fn try_hit_test_results(&self, source: &HitTestSource) -> anyhow::Result<Vec<JsValue>> {
        let js_source = self.handles.get(source.handle)?;
        let results: Array = call_method(&self.frame, "getHitTestResults", &[js_source])?
            .dyn_into()
            .map_err(|_| anyhow!("getHitTestResults did not return an array"))?;
        Ok(results.iter().collect())
    }
}

impl XrFrame for JsFrame<'_> {
    fn base_space(&self) -> &ReferenceSpace {
        &self.base_space
    }

    fn hit_test_results(&self, source: &HitTestSource) -> Vec<Box<dyn XrHitTestResult + '_>> {
        match self.try_hit_test_results(source) {
            Ok(results) => results
                .into_iter()
                .map(|result| {
                    Box::new(JsHitResult {
                        result,
                        handles: self.handles,
                    }) as Box<dyn XrHitTestResult + '_>
                })
                .collect(),
            Err(e) => {
                log::error!("Hit-test failed: {:#}", e);
                Vec::new()
            }
        }
    }
}

#[wasm_bindgen]
pub struct WebSandbox {
    app: App,
    handles: SharedHandles,
    base_space: Option<ReferenceSpace>,
}

impl WebSandbox {
    fn queue(&self, command: Command) {
        if let Err(err) = self.app.sandbox().commands().unbounded_send(command) {
            log::error!("Command queue closed: {}", err);
        }
    }
}

#[wasm_bindgen]
impl WebSandbox {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WebSandbox, JsValue> {
        let app = App::new(Context::default()).map_err(to_js)?;
        Ok(Self {
            app,
            handles: SharedHandles::default(),
            base_space: None,
        })
    }

    pub fn place_request(&self) {
        self.queue(Command::Place);
    }

    pub fn delete_request(&self) {
        self.queue(Command::Delete);
    }

    pub fn select_texture(&self, texture: String) {
        self.queue(Command::SelectTexture(texture));
    }

    pub fn select_color(&self, hex: &str) -> Result<(), JsValue> {
        let color = Rgb::from_hex(hex).map_err(to_js)?;
        self.queue(Command::SelectColor(color));
        Ok(())
    }

    /// Current background of the texture picker, e.g. `url(./images/brick.png)`.
    pub fn picker_background(&self) -> String {
        let sandbox = self.app.sandbox();
        sandbox.selection().picker_background(sandbox.ctx())
    }

    pub fn add_ui_node(&mut self, name: String, show_in_ar: bool) {
        let tag = if show_in_ar {
            ArVisibility::ShowInArMode
        } else {
            ArVisibility::HideInArMode
        };
        self.app.sandbox_mut().scene_mut().add_node(name, tag);
    }

    pub fn enter_vr(&self, ar_mode: bool) {
        self.queue(Command::EnterVr { ar_mode });
    }

    pub fn exit_vr(&self) {
        self.queue(Command::ExitVr);
    }

    /// The renderer's `local-floor` reference space. Hit poses are read in it.
    pub fn set_base_space(&mut self, space: JsValue) {
        let handle = self.handles.borrow_mut().insert(space);
        self.base_space = Some(ReferenceSpace {
            kind: ReferenceSpaceKind::LocalFloor,
            handle,
        });
    }

    /// Starts negotiating with an `XRSession`. Returns before it resolves.
    pub fn session_start(&mut self, session: JsValue) {
        self.app.start_session(Rc::new(JsSession {
            session,
            handles: self.handles.clone(),
        }));
    }

    pub fn session_end(&mut self) {
        self.app.dispatch(Command::SessionEnded);
    }

    pub fn aim(&mut self, ox: f32, oy: f32, oz: f32, dx: f32, dy: f32, dz: f32) {
        let ray = Ray::new(Vector3::new(ox, oy, oz), Vector3::new(dx, dy, dz));
        self.app.sandbox_mut().aim(ray);
    }

    /// Runs one frame. `frame` is the current `XRFrame`, or `null` outside XR.
    pub fn tick(&mut self, frame: JsValue) {
        let handles = self.handles.clone();
        let handles = handles.borrow();
        let frame = match &self.base_space {
            Some(base_space) if !frame.is_null() && !frame.is_undefined() => Some(JsFrame {
                frame,
                base_space: base_space.clone(),
                handles: &handles,
            }),
            _ => None,
        };
        self.app.tick(frame.as_ref().map(|f| f as &dyn XrFrame));
    }

    pub fn cursor_position(&self) -> Vec<f32> {
        let p = self.app.sandbox().placement().cursor().position;
        vec![p.x, p.y, p.z]
    }

    pub fn ui_mode_class(&self) -> String {
        self.app.sandbox().session().ui_mode().css_class().to_string()
    }

    /// Body classes to remove when applying [`WebSandbox::ui_mode_class`].
    pub fn ui_mode_stale_classes(&self) -> Vec<String> {
        self.app
            .sandbox()
            .session()
            .ui_mode()
            .stale_css_classes()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    /// Scene changes since the last call, as a JSON array.
    pub fn drain_changes(&mut self) -> Result<String, JsValue> {
        let changes = self.app.sandbox_mut().scene_mut().drain_changes();
        serde_json::to_string(&changes).map_err(|e| to_js(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    fn js_object(body: &str) -> JsValue {
        Function::new_no_args(&format!("return {};", body))
            .call0(&JsValue::NULL)
            .unwrap()
    }

    fn fake_session() -> JsValue {
        js_object(
            "{
                kinds: [],
                requestReferenceSpace(kind) {
                    this.kinds.push(kind);
                    return Promise.resolve({ name: kind });
                },
                requestHitTestSource(options) {
                    this.hitSpace = options.space.name;
                    return Promise.resolve({ source: true });
                },
            }",
        )
    }

    fn fake_frame() -> JsValue {
        js_object(
            "{
                calls: 0,
                getHitTestResults(source) {
                    this.calls += 1;
                    return [{
                        getPose(space) {
                            return {
                                transform: {
                                    position: { x: 0.26, y: 0.12, z: 1.04 },
                                    orientation: { x: 0, y: 0, z: 0, w: 1 },
                                },
                            };
                        },
                    }];
                },
            }",
        )
    }

    async fn settle() {
        for _ in 0..16 {
            JsFuture::from(Promise::resolve(&JsValue::NULL)).await.unwrap();
        }
    }

    #[wasm_bindgen_test]
    async fn hit_test_runs_through_the_session_objects() {
        let mut sandbox = WebSandbox::new().unwrap();
        sandbox.set_base_space(js_object("{ name: 'local-floor' }"));
        let session = fake_session();
        sandbox.session_start(session.clone());
        settle().await;

        let frame = fake_frame();
        sandbox.tick(frame.clone());

        assert_eq!(sandbox.ui_mode_class(), "ar-session");
        let kinds: Vec<_> = Array::from(&get(&session, "kinds").unwrap()).iter().collect();
        assert_eq!(kinds, vec![JsValue::from_str("viewer")]);
        assert_eq!(get(&session, "hitSpace").unwrap(), "viewer");
        assert_eq!(get_f32(&frame, "calls").unwrap(), 1.0);
        let cursor = sandbox.cursor_position();
        assert!((cursor[0] - 0.3).abs() < 1e-4);
        assert!((cursor[1] - 0.2).abs() < 1e-4);
        assert!((cursor[2] - 1.0).abs() < 1e-4);
    }

    #[wasm_bindgen_test]
    async fn frames_with_a_block_hit_skip_the_hit_test() {
        let mut sandbox = WebSandbox::new().unwrap();
        sandbox.set_base_space(js_object("{ name: 'local-floor' }"));
        sandbox.session_start(fake_session());
        settle().await;
        let frame = fake_frame();
        sandbox.tick(frame.clone());

        sandbox.place_request();
        sandbox.aim(0.3, 10.0, 1.0, 0.0, -1.0, 0.0);
        sandbox.tick(frame.clone());
        sandbox.tick(frame.clone());

        assert_eq!(get_f32(&frame, "calls").unwrap(), 1.0);
    }

    #[wasm_bindgen_test]
    fn null_frame_is_no_frame() {
        let mut sandbox = WebSandbox::new().unwrap();
        sandbox.set_base_space(js_object("{}"));
        sandbox.tick(JsValue::NULL);
        assert_eq!(sandbox.cursor_position(), vec![0.0, 0.0, 0.0]);
    }
}
