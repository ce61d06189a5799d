//! Tactical board editor core for planning rounds on Ballistic maps.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! interactive canvas: translating raw DOM input events into board mutations,
//! keeping the undo history, hit-testing elements, persisting strategies to
//! local storage and repainting the scene. The host JavaScript layer wires
//! DOM events to the [`engine::Engine`] and reacts to the returned
//! [`engine::Action`]s. Everything except the browser bindings also builds
//! natively, which is how the tests and the `board-cli` tool use it.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] gesture controller |
//! | [`store`] | Board state store: elements, selection, view, strategies |
//! | [`doc`] | Element model and sparse patches |
//! | [`catalog`] | Built-in maps, callouts and gadgets |
//! | [`history`] | Snapshot undo/redo history |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`geom`] | Points, rectangles and geometry helpers |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`hit`] | Hit-testing against elements, handles and callouts |
//! | [`render`] | Scene rendering through the [`render::Surface`] trait |
//! | [`images`] | Asynchronous image cache for map and gadget art |
//! | [`persist`] | Key-value persistence (local storage, in-memory) |
//! | [`config`] | Board configuration and validation |
//! | [`consts`] | Shared numeric constants (hit radii, minimum sizes, etc.) |

pub mod camera;
pub mod catalog;
pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod geom;
pub mod history;
pub mod hit;
pub mod images;
pub mod input;
pub mod persist;
pub mod render;
pub mod store;
