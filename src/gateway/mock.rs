use super::Gateway;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A scripted gateway reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Body(Value),
    Upstream { status: u16, message: String },
}

impl MockReply {
    fn into_result(self) -> Result<Value> {
        match self {
            MockReply::Body(body) => Ok(body),
            MockReply::Upstream { status, message } => Err(Error::Upstream {
                status,
                code: None,
                message: Some(message),
            }),
        }
    }
}

/// A forwarded call as seen by the mock.
#[derive(Debug, Clone)]
pub struct ForwardedCall {
    pub api_url: String,
    pub payload: Value,
    pub is_async: bool,
}

/// In-memory gateway. Replies are consumed in order; the last reply of each
/// queue keeps repeating once the queue is drained.
#[derive(Clone)]
pub struct MockGateway {
    forward_replies: Arc<Mutex<VecDeque<MockReply>>>,
    lookup_replies: Arc<Mutex<VecDeque<MockReply>>>,
    forwarded: Arc<Mutex<Vec<ForwardedCall>>>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            forward_replies: Arc::new(Mutex::new(VecDeque::new())),
            lookup_replies: Arc::new(Mutex::new(VecDeque::new())),
            forwarded: Arc::new(Mutex::new(Vec::new())),
            lookups: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_forward_response(self, body: Value) -> Self {
        self.forward_replies
            .lock()
            .unwrap()
            .push_back(MockReply::Body(body));
        self
    }

    pub fn with_lookup_response(self, body: Value) -> Self {
        self.lookup_replies
            .lock()
            .unwrap()
            .push_back(MockReply::Body(body));
        self
    }

    pub fn with_lookup_reply(self, reply: MockReply) -> Self {
        self.lookup_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn with_forward_reply(self, reply: MockReply) -> Self {
        self.forward_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn forwarded_calls(&self) -> Vec<ForwardedCall> {
        self.forwarded.lock().unwrap().clone()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().unwrap().len()
    }

    pub fn looked_up_ids(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    fn next_reply(queue: &Mutex<VecDeque<MockReply>>, kind: &str) -> Result<Value> {
        let mut queue = queue.lock().unwrap();
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        reply
            .ok_or_else(|| Error::InvalidInput(format!("no scripted {} reply", kind)))?
            .into_result()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn forward(&self, api_url: &str, payload: &Value, is_async: bool) -> Result<Value> {
        self.forwarded.lock().unwrap().push(ForwardedCall {
            api_url: api_url.to_string(),
            payload: payload.clone(),
            is_async,
        });
        Self::next_reply(&self.forward_replies, "forward")
    }

    async fn lookup(&self, task_id: &str) -> Result<Value> {
        self.lookups.lock().unwrap().push(task_id.to_string());
        Self::next_reply(&self.lookup_replies, "lookup")
    }
}
