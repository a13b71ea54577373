//! Recording stub for [`EthRpc`], shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::{EthRpc, RpcError};

#[derive(Default)]
pub(crate) struct TestRpc {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    results: Mutex<VecDeque<Result<Value, String>>>,
}

impl TestRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue results to return in order; once drained, calls return null.
    pub fn with_results(results: Vec<Result<Value, &str>>) -> Self {
        let rpc = Self::new();
        *rpc.results.lock().unwrap() =
            results.into_iter().map(|r| r.map_err(|e| e.to_owned())).collect();
        rpc
    }

    pub fn captured(&self, i: usize) -> (String, Vec<Value>) {
        self.calls.lock().unwrap()[i].clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl EthRpc for TestRpc {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push((method.to_owned(), params));
        match self.results.lock().unwrap().pop_front() {
            Some(Ok(v)) => Ok(v),
            Some(Err(message)) => Err(RpcError::Server { code: -32000, message }),
            None => Ok(Value::Null),
        }
    }
}
