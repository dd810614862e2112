//! Command interception
//!
//! [`HookedClient`] wraps any [`RedisClient`] and runs a [`CommandHook`]
//! before each command is dispatched. Because every typed operation goes
//! through [`RedisClient::process`], the hook sees each command exactly once,
//! whether or not it later succeeds.

use crate::client::RedisClient;
use crate::commands::RawCommand;
use crate::output::{OutputMessage, OutputSink};
use async_trait::async_trait;
use redview_core::{config::Topology, error::RedisResult, value::RespValue};
use tracing::{debug, trace};

/// Observer called before a command is sent
pub trait CommandHook: Send + Sync {
    /// Called with the fully built command, before execution
    fn before_command(&self, command: &RawCommand);
}

impl<F> CommandHook for F
where
    F: Fn(&RawCommand) + Send + Sync,
{
    fn before_command(&self, command: &RawCommand) {
        self(command)
    }
}

/// Reports each command to the user as a warning-level `redis: <CMD args>` line
#[derive(Debug, Clone)]
pub struct DebugHook {
    sink: OutputSink,
}

impl DebugHook {
    /// Create a hook writing to `sink`
    pub fn new(sink: OutputSink) -> Self {
        Self { sink }
    }

    /// The line reported for `command`
    pub fn render(command: &RawCommand) -> String {
        format!("redis: <{}>", command)
    }
}

impl CommandHook for DebugHook {
    fn before_command(&self, command: &RawCommand) {
        let line = Self::render(command);
        debug!("{}", line);
        if self.sink.send(OutputMessage::warning(line)).is_err() {
            trace!("Output sink closed, dropping command trace");
        }
    }
}

/// A client whose commands pass through a hook first
pub struct HookedClient<C, H> {
    inner: C,
    hook: H,
}

impl<C, H> HookedClient<C, H>
where
    C: RedisClient,
    H: CommandHook,
{
    /// Wrap `inner` so that `hook` sees every command
    pub fn new(inner: C, hook: H) -> Self {
        Self { inner, hook }
    }

    /// The wrapped client
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Unwrap, discarding the hook
    pub fn into_inner(self) -> C {
        self.inner
    }
}

#[async_trait]
impl<C, H> RedisClient for HookedClient<C, H>
where
    C: RedisClient,
    H: CommandHook,
{
    async fn process(&self, command: RawCommand) -> RedisResult<RespValue> {
        self.hook.before_command(&command);
        self.inner.process(command).await
    }

    fn topology(&self) -> Topology {
        self.inner.topology()
    }
}
