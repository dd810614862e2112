//! Free-form command execution

use crate::client::RedisClient;
use redview_core::{error::RedisResult, value::RespValue};
use tracing::debug;

/// Run a command typed by the user.
///
/// The line is split on single spaces only: there is no quoting, and two
/// consecutive spaces produce an empty argument. The reply or error is
/// returned as the server produced it.
pub async fn execute_command_line<C>(client: &C, line: &str) -> RedisResult<RespValue>
where
    C: RedisClient + ?Sized,
{
    let tokens: Vec<String> = line.split(' ').map(str::to_string).collect();
    debug!("Executing command line with {} tokens", tokens.len());
    client.do_command(tokens).await
}
