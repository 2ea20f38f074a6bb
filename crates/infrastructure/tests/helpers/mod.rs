#![allow(dead_code)]
pub mod dns_server_mock;
pub mod manual_engine;
pub mod packets;
pub mod scripted_sockets;

pub use dns_server_mock::MockDnsServer;
pub use manual_engine::ManualEngine;
pub use packets::*;
pub use scripted_sockets::{ScriptedSockets, SharedSocket, SocketOp};

use rdns_domain::Reply;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared sink for completion callbacks.
#[derive(Clone, Default)]
pub struct Replies(Rc<RefCell<Vec<Reply>>>);

impl Replies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> impl FnOnce(Reply) + 'static {
        let sink = Rc::clone(&self.0);
        move |reply| sink.borrow_mut().push(reply)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Reply {
        self.0.borrow()[index].clone()
    }

    pub fn last(&self) -> Option<Reply> {
        self.0.borrow().last().cloned()
    }
}
