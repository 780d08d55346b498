//! In-memory gateway, blob store and sleeper shared by the integration suites.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::io::Read;
use std::rc::Rc;
use std::time::Duration;

use serde_json::{json, Value};

use exodus_core::{
    ContentKey, EnvName, FlushRecord, ItemRecord, Links, Publish, PublishId, Task, TaskId,
    TaskState,
};
use exodus_sync::{BlobStore, Gateway, Orchestrator, Sleeper, SyncError, TaskPoller};

/// Everything the fakes observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload { env: String, key: String },
    Exists { key: String },
    CreatePublish { env: String },
    AddItem { link: String, item: ItemRecord },
    Commit { link: String, deadline: Option<String> },
    GetTask { link: String },
    Flush { env: String, paths: Vec<String> },
}

pub type Log = Rc<RefCell<Vec<Call>>>;

pub fn links(pairs: &[(&str, &str)]) -> Links {
    Links(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    )
}

pub fn task(id: &str, state: TaskState) -> Task {
    Task {
        id: TaskId::from(id),
        state,
        links: links(&[("self", format!("/task/{id}").as_str())]),
        updated: state.is_terminal().then(|| "2024-05-01T12:00:00".to_string()),
        publish_id: None,
        deadline: None,
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

pub struct FakeGateway {
    pub log: Log,
    /// States handed out by commit/flush (first) and then by each `get_task`.
    pub states: RefCell<VecDeque<TaskState>>,
    /// Zero-based index of the add-item call that should be rejected.
    pub fail_add_at: Option<usize>,
    /// Links the server assigns to created publishes.
    pub publish_links: Links,
    adds: RefCell<usize>,
}

impl FakeGateway {
    pub fn new(log: Log, states: impl IntoIterator<Item = TaskState>) -> Self {
        Self {
            log,
            states: RefCell::new(states.into_iter().collect()),
            fail_add_at: None,
            publish_links: links(&[
                ("self", "/live/publish/p-1"),
                ("commit", "/live/publish/p-1/commit"),
            ]),
            adds: RefCell::new(0),
        }
    }

    fn next_task(&self) -> Task {
        let state = self
            .states
            .borrow_mut()
            .pop_front()
            .expect("task state requested beyond the script");
        task("t-1", state)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }
}

impl Gateway for FakeGateway {
    fn create_publish(&self, env: &EnvName) -> Result<Publish, SyncError> {
        self.log.borrow_mut().push(Call::CreatePublish {
            env: env.to_string(),
        });
        Ok(Publish {
            id: PublishId::from("p-1"),
            links: self.publish_links.clone(),
            env: Some(env.to_string()),
            state: Some("PENDING".to_string()),
        })
    }

    fn add_item(&self, publish: &Publish, item: &ItemRecord) -> Result<(), SyncError> {
        let index = {
            let mut adds = self.adds.borrow_mut();
            *adds += 1;
            *adds - 1
        };
        if self.fail_add_at == Some(index) {
            return Err(SyncError::Status {
                url: "http://gw/live/publish/p-1".to_string(),
                status: 400,
                detail: Some("Invalid object key".to_string()),
            });
        }
        self.log.borrow_mut().push(Call::AddItem {
            link: publish.links.get("self").unwrap_or_default().to_string(),
            item: item.clone(),
        });
        Ok(())
    }

    fn commit_publish(
        &self,
        publish: &Publish,
        deadline: Option<&str>,
    ) -> Result<Task, SyncError> {
        self.log.borrow_mut().push(Call::Commit {
            link: publish.links.get("commit").unwrap_or_default().to_string(),
            deadline: deadline.map(str::to_string),
        });
        Ok(self.next_task())
    }

    fn get_task(&self, link: &str) -> Result<Task, SyncError> {
        self.log.borrow_mut().push(Call::GetTask {
            link: link.to_string(),
        });
        Ok(self.next_task())
    }

    fn flush_cache(&self, env: &EnvName, paths: &[FlushRecord]) -> Result<Task, SyncError> {
        self.log.borrow_mut().push(Call::Flush {
            env: env.to_string(),
            paths: paths.iter().map(|p| p.web_uri.clone()).collect(),
        });
        Ok(self.next_task())
    }

    fn whoami(&self) -> Result<Value, SyncError> {
        Ok(json!({"client": {"authenticated": true, "roles": ["live-publisher"]}}))
    }
}

// ---------------------------------------------------------------------------
// Blob store
// ---------------------------------------------------------------------------

pub struct FakeBlobStore {
    pub log: Log,
    pub blobs: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl FakeBlobStore {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            blobs: RefCell::new(BTreeMap::new()),
        }
    }
}

impl BlobStore for FakeBlobStore {
    fn exists(&self, env: &EnvName, key: &ContentKey) -> Result<bool, SyncError> {
        self.log.borrow_mut().push(Call::Exists {
            key: key.to_string(),
        });
        Ok(self.blobs.borrow().contains_key(&format!("{env}/{key}")))
    }

    fn put(
        &self,
        env: &EnvName,
        key: &ContentKey,
        reader: &mut dyn Read,
        _len: u64,
    ) -> Result<(), SyncError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).expect("read blob");
        self.log.borrow_mut().push(Call::Upload {
            env: env.to_string(),
            key: key.to_string(),
        });
        self.blobs.borrow_mut().insert(format!("{env}/{key}"), bytes);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct CountingSleeper {
    pub sleeps: usize,
}

impl Sleeper for CountingSleeper {
    fn sleep(&mut self, _interval: Duration) {
        self.sleeps += 1;
    }
}

pub type FakeOrchestrator = Orchestrator<FakeGateway, FakeBlobStore, CountingSleeper>;

/// Orchestrator over fresh fakes, scripted with `states`.
pub fn orchestrator(states: impl IntoIterator<Item = TaskState>) -> (FakeOrchestrator, Log) {
    orchestrator_with(FakeGateway::new(Rc::default(), states))
}

pub fn orchestrator_with(gateway: FakeGateway) -> (FakeOrchestrator, Log) {
    let log = gateway.log.clone();
    let blobs = FakeBlobStore::new(log.clone());
    let poller = TaskPoller::with_sleeper(Duration::from_secs(1), 0, CountingSleeper::default());
    (
        Orchestrator::new(gateway, blobs, poller, EnvName::from("live")),
        log,
    )
}
