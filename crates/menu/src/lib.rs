//! Conversational settings menu for operators.
//!
//! A fixed tree of menu screens navigated with inline buttons. All state is
//! in-memory and per-operator: current node, a back-stack, and a pending-edit
//! buffer. The only transition with a side effect is confirming a staged
//! change, which writes through [`firstmate_settings::SettingsStore`];
//! everything else is pure navigation plus re-render.

pub mod action;
pub mod machine;
pub mod node;
pub mod session;
pub mod view;

pub use {
    action::ButtonAction,
    machine::{MenuResponse, MenuStateMachine, SESSION_IDLE_TIMEOUT},
    node::MenuNode,
    session::{OperatorSession, PendingChange},
    view::{MenuButton, MenuReply},
};
