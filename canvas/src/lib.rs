//! Canvas engine for the collaborative whiteboard.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! editor side of a room: translating DOM input into shape edits, keeping a
//! local mirror of the room's shared object map, hit-testing, the live overlay
//! (cursors, chat, reactions), and rendering. The host JavaScript layer wires
//! DOM events to the engine and forwards the resulting [`engine::Action`]s and
//! [`live::LiveAction`]s to the server as frames.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`shape`] | Shape schema, factories, and the local shape store |
//! | [`geom`] | Points and bounding boxes |
//! | [`input`] | Tools, toolbar entries, keys, and the gesture state machine |
//! | [`hit`] | Hit-testing against shapes and their scale handles |
//! | [`live`] | Cursor chat, reactions, and peer cursors |
//! | [`panels`] | Layer list, attribute editor, and active-user strip |
//! | [`render`] | Scene rendering |
//! | [`consts`] | Shared constants (defaults, hit slop, timers) |

pub mod consts;
pub mod engine;
pub mod geom;
pub mod hit;
pub mod input;
pub mod live;
pub mod panels;
pub mod render;
pub mod shape;
